//! JSON-RPC 2.0 envelope (spec §3, §4.8).
//!
//! Replaces the teacher's `rmcp`-based envelope: the spec's bit-exact
//! `id`-mirroring invariant (integer/string/zero/null/absent, all
//! distinct) is most directly expressed over `serde_json::Value` rather
//! than through an SDK type whose `RequestId` internals aren't available
//! in this pack. See DESIGN.md for the full rationale.

use serde_json::{Map, Value, json};

/// The three wire forms an `id` can take, plus the fourth state — entirely
/// absent — represented by wrapping this in `Option`.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcId {
    Number(i64),
    String(String),
    Null,
}

impl RpcId {
    fn to_value(&self) -> Value {
        match self {
            RpcId::Number(n) => json!(n),
            RpcId::String(s) => json!(s),
            RpcId::Null => Value::Null,
        }
    }
}

pub struct RpcRequest {
    pub id: Option<RpcId>,
    pub method: String,
    pub params: Option<Value>,
}

pub enum RpcOutcome {
    Result(Value),
    Error {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

pub struct RpcResponse {
    pub id: Option<RpcId>,
    pub outcome: RpcOutcome,
}

impl RpcResponse {
    pub fn error(id: Option<RpcId>, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            outcome: RpcOutcome::Error {
                code,
                message: message.into(),
                data: None,
            },
        }
    }

    pub fn result(id: Option<RpcId>, value: Value) -> Self {
        Self {
            id,
            outcome: RpcOutcome::Result(value),
        }
    }

    /// Serializes to the wire shape. `jsonrpc` is always literally `"2.0"`;
    /// `id` is omitted entirely (not `null`) when absent; exactly one of
    /// `result`/`error` is ever present, by construction of `RpcOutcome`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("jsonrpc".to_string(), json!("2.0"));
        if let Some(id) = &self.id {
            map.insert("id".to_string(), id.to_value());
        }
        match &self.outcome {
            RpcOutcome::Result(v) => {
                map.insert("result".to_string(), v.clone());
            }
            RpcOutcome::Error { code, message, data } => {
                let mut err = Map::new();
                err.insert("code".to_string(), json!(code));
                err.insert("message".to_string(), json!(message));
                if let Some(data) = data {
                    err.insert("data".to_string(), data.clone());
                }
                map.insert("error".to_string(), Value::Object(err));
            }
        }
        Value::Object(map)
    }
}

/// Extracts a request from a raw JSON value. Returns `None` when the value
/// is not a well-formed 2.0 envelope (wrong `jsonrpc`, missing/non-string
/// `method`, or an `id` of a type other than number/string/null) — the
/// caller treats that as the "nil request" case (spec §4.8, §9 open
/// question (a)).
pub fn extract_request(value: &Value) -> Option<RpcRequest> {
    let obj = value.as_object()?;
    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return None;
    }
    let method = obj.get("method")?.as_str()?.to_string();
    let id = match obj.get("id") {
        None => None,
        Some(Value::Null) => Some(RpcId::Null),
        Some(Value::String(s)) => Some(RpcId::String(s.clone())),
        Some(Value::Number(n)) => Some(RpcId::Number(n.as_i64()?)),
        Some(_) => return None,
    };
    let params = obj.get("params").cloned();
    Some(RpcRequest { id, method, params })
}
