//! JSON-RPC Dispatcher / MCP Handler (C7, spec §4.8).
//!
//! Method-routing shape inspired by `mcp/tool_call.rs`'s dispatch
//! structure, re-expressed over the custom envelope in `rpc.rs` instead of
//! `rmcp`'s typed model.

use serde_json::{Value, json};

use crate::error::DispatchError;
use crate::registry::{RequestContext, ResourceRegistry, ToolRegistry};
use crate::rpc::{RpcId, RpcOutcome, RpcResponse, extract_request};

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// `-32600`, the one JSON-RPC error this module constructs outside of
/// [`DispatchError`]: it covers a malformed envelope, which never reaches
/// method dispatch and so has no `DispatchError` variant of its own.
const INVALID_REQUEST: i64 = -32600;

/// Single entry point: `handle(ctx, request) -> response` (spec §4.8).
/// `body` is `None` when the HTTP layer could not parse the request body
/// as JSON at all; that is itself a nil request.
pub async fn handle(
    ctx: &RequestContext,
    body: Option<&Value>,
    tools: &ToolRegistry,
    resources: &ResourceRegistry,
) -> RpcResponse {
    let Some(body) = body else {
        return RpcResponse::error(None, INVALID_REQUEST, "invalid request");
    };
    let Some(request) = extract_request(body) else {
        return RpcResponse::error(None, INVALID_REQUEST, "invalid request");
    };

    let id = request.id.clone();
    let outcome = dispatch_method(ctx, &request.method, request.params.as_ref(), tools, resources).await;
    RpcResponse { id, outcome }
}

async fn dispatch_method(
    ctx: &RequestContext,
    method: &str,
    params: Option<&Value>,
    tools: &ToolRegistry,
    resources: &ResourceRegistry,
) -> RpcOutcome {
    let result = match method {
        "initialize" => initialize(params),
        "tools/list" => Ok(list_tools(tools)),
        "tools/call" => call_tool(ctx, params, tools).await,
        "resources/list" => Ok(list_resources(resources)),
        "resources/read" => read_resource(ctx, params, resources).await,
        // Method names match case-sensitively and exactly; anything else,
        // including the empty string, is MethodNotFound (spec §4.8).
        _ => Err(DispatchError::MethodNotFound),
    };
    match result {
        Ok(value) => RpcOutcome::Result(value),
        Err(e) => RpcOutcome::Error {
            code: e.code(),
            message: e.to_string(),
            data: None,
        },
    }
}

fn initialize(params: Option<&Value>) -> Result<Value, DispatchError> {
    if let Some(params) = params {
        if !params.is_object() {
            return Err(DispatchError::InvalidParams("params must be an object".into()));
        }
    }
    Ok(json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": { "tools": {}, "resources": {} },
        "serverInfo": { "name": "mcp-gateway", "version": env!("CARGO_PKG_VERSION") },
    }))
}

fn list_tools(tools: &ToolRegistry) -> Value {
    let list: Vec<Value> = tools
        .list()
        .into_iter()
        .map(|t| {
            json!({
                "name": t.name(),
                "description": t.description(),
                "inputSchema": t.input_schema(),
            })
        })
        .collect();
    json!({ "tools": list })
}

async fn call_tool(ctx: &RequestContext, params: Option<&Value>, tools: &ToolRegistry) -> Result<Value, DispatchError> {
    let params = params
        .and_then(Value::as_object)
        .ok_or_else(|| DispatchError::InvalidParams("missing params".into()))?;
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DispatchError::InvalidParams("missing or empty name".into()))?;
    let arguments = params
        .get("arguments")
        .cloned()
        .ok_or_else(|| DispatchError::InvalidParams("missing arguments".into()))?;

    let tool = tools
        .get(name)
        .ok_or_else(|| DispatchError::ToolNotFound(name.to_string()))?;

    tool.execute(ctx, arguments).await
}

fn list_resources(resources: &ResourceRegistry) -> Value {
    let list: Vec<Value> = resources
        .list()
        .into_iter()
        .map(|r| {
            json!({
                "uri": r.uri(),
                "name": r.name(),
                "description": r.description(),
                "mimeType": r.mime_type(),
            })
        })
        .collect();
    json!({ "resources": list })
}

async fn read_resource(ctx: &RequestContext, params: Option<&Value>, resources: &ResourceRegistry) -> Result<Value, DispatchError> {
    let params = params
        .and_then(Value::as_object)
        .ok_or_else(|| DispatchError::InvalidParams("missing params".into()))?;
    let uri = params
        .get("uri")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| DispatchError::InvalidParams("missing or empty uri".into()))?;

    let resource = resources
        .get(uri)
        .ok_or_else(|| DispatchError::ResourceNotFound(uri.to_string()))?;

    resource.read(ctx).await
}
