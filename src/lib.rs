//! OAuth 2.1 protected-resource gateway in front of an MCP JSON-RPC server.
//!
//! See DESIGN.md for the grounding ledger and SPEC_FULL.md for the full
//! requirements this crate implements.

pub mod claims;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod jwks;
pub mod logging;
pub mod metadata;
pub mod middleware;
pub mod registry;
pub mod responder;
pub mod router;
pub mod rpc;
pub mod scopes;
pub mod state;
pub mod validator;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::metadata::ProtectedResourceMetadata;
use crate::registry::{EchoTool, ResourceRegistry, StaticTextResource, ToolRegistry};
use crate::state::{AppState, AppStateInner};
use crate::validator::Validator;

/// Builds the fully wired application state from configuration: JWKS
/// cache, validator, protected-resource metadata, and the sample
/// tool/resource registry (§A.5).
pub fn build_state(config: &AppConfig) -> AppState {
    let http = reqwest::Client::new();
    let jwks = jwks::JwksCache::new(http, config.oauth.jwks_cache_ttl);
    let validator = Validator::new(
        jwks,
        config.oauth.authorization_servers.clone(),
        config.oauth.audience.clone(),
        config.oauth.clock_skew,
    );

    let tools = ToolRegistry::new();
    tools.register(Arc::new(EchoTool));

    let resources = ResourceRegistry::new();
    resources.register(Arc::new(StaticTextResource::new(
        "welcome://readme",
        "Welcome to the MCP gateway sample resource.",
    )));

    let resource_metadata_url = format!("{}{}", config.server.base_url, metadata::METADATA_PATH);
    let metadata = ProtectedResourceMetadata::from_config(
        &config.server.base_url,
        config.oauth.authorization_servers.clone(),
        config.oauth.scopes_supported.clone(),
    );

    AppState::new(AppStateInner {
        validator,
        tools,
        resources,
        metadata,
        resource_metadata_url,
        default_scope: config.oauth.scopes_supported.first().cloned(),
    })
}
