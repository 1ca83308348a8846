//! Tool / Resource capability contracts and registries (spec §3, §A.5).
//!
//! Registry shape grounded on `catalog.rs`'s `SharedCatalog` (named things
//! behind a lock, `list` returning a materialized snapshot per spec §9's
//! "registry snapshots" design note); the trait split itself is enriched
//! from `guyernest-rust-mcp-sdk`'s `ToolHandler`/`ResourceHandler` usage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::claims::TokenClaims;
use crate::error::DispatchError;

/// Propagated to every tool/resource invocation unchanged; the dispatcher
/// creates no derived timeout of its own (spec §4.8).
#[derive(Clone)]
pub struct RequestContext {
    pub claims: Option<TokenClaims>,
    pub cancellation: CancellationToken,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, ctx: &RequestContext, arguments: Value) -> Result<Value, DispatchError>;
}

#[async_trait]
pub trait Resource: Send + Sync {
    fn uri(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn mime_type(&self) -> &str;
    async fn read(&self, ctx: &RequestContext) -> Result<Value, DispatchError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        self.tools.write().insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// A freshly materialized snapshot; callers may iterate without
    /// holding any lock, so iteration never races with concurrent
    /// registration (spec §5, §9).
    pub fn list(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.read().values().cloned().collect()
    }
}

#[derive(Default)]
pub struct ResourceRegistry {
    resources: RwLock<HashMap<String, Arc<dyn Resource>>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, resource: Arc<dyn Resource>) {
        self.resources
            .write()
            .insert(resource.uri().to_string(), resource);
    }

    pub fn get(&self, uri: &str) -> Option<Arc<dyn Resource>> {
        self.resources.read().get(uri).cloned()
    }

    pub fn list(&self) -> Vec<Arc<dyn Resource>> {
        self.resources.read().values().cloned().collect()
    }
}

/// Illustrative sample tool (§A.5): echoes its input back. Wired into the
/// binary at startup so the JSON-RPC handler is exercisable end to end.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the provided arguments back as the result"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
        })
    }

    async fn execute(&self, _ctx: &RequestContext, arguments: Value) -> Result<Value, DispatchError> {
        Ok(arguments)
    }
}

/// Illustrative sample resource (§A.5): a static in-memory text document.
pub struct StaticTextResource {
    uri: String,
    text: String,
}

impl StaticTextResource {
    pub fn new(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl Resource for StaticTextResource {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn name(&self) -> &str {
        "welcome"
    }

    fn description(&self) -> &str {
        "A static welcome document"
    }

    fn mime_type(&self) -> &str {
        "text/plain"
    }

    async fn read(&self, _ctx: &RequestContext) -> Result<Value, DispatchError> {
        Ok(Value::String(self.text.clone()))
    }
}
