//! Protected-Resource Metadata Service (C4, spec §4.6), RFC 9728.
//!
//! Field naming grounded on `other_examples/.../apollo-mcp-server/auth.rs`'s
//! `ProtectedResource` struct, trimmed to the fields spec §3 names.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_methods_supported: Option<Vec<String>>,
}

impl ProtectedResourceMetadata {
    /// Built once at startup from configuration; served read-only
    /// thereafter (spec §3 lifecycle).
    pub fn from_config(base_url: &str, authorization_servers: Vec<String>, scopes_supported: Vec<String>) -> Self {
        Self {
            resource: base_url.to_string(),
            authorization_servers,
            scopes_supported,
            bearer_methods_supported: Some(vec!["header".to_string()]),
        }
    }
}

/// `GET <base>/.well-known/oauth-protected-resource` handler. Any other
/// method on this route is rejected with 405 automatically by axum's
/// router (C8), since the route is registered for `GET` only.
pub async fn serve_metadata(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.metadata.clone()))
}

pub const METADATA_PATH: &str = "/.well-known/oauth-protected-resource";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_bearer_methods_when_none() {
        let mut meta = ProtectedResourceMetadata::from_config(
            "https://gw.example",
            vec!["https://issuer.example".into()],
            vec!["mcp:read".into()],
        );
        meta.bearer_methods_supported = None;
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("bearer_methods_supported").is_none());
    }

    #[test]
    fn serializes_expected_fields() {
        let meta = ProtectedResourceMetadata::from_config(
            "https://gw.example",
            vec!["https://issuer.example".into()],
            vec!["mcp:read".into()],
        );
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["resource"], "https://gw.example");
        assert_eq!(json["authorization_servers"][0], "https://issuer.example");
        assert_eq!(json["scopes_supported"][0], "mcp:read");
    }
}
