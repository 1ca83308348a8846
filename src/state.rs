//! Shared application state threaded through axum extractors.
//!
//! Shape grounded on `mcp/auth.rs`'s `McpState` (a single `Arc`-wrapped
//! struct passed by `State`, rather than several independent `Extension`s).

use std::ops::Deref;
use std::sync::Arc;

use crate::metadata::ProtectedResourceMetadata;
use crate::registry::{ResourceRegistry, ToolRegistry};
use crate::validator::Validator;

pub struct AppStateInner {
    pub validator: Validator,
    pub tools: ToolRegistry,
    pub resources: ResourceRegistry,
    pub metadata: ProtectedResourceMetadata,
    pub resource_metadata_url: String,
    /// Echoed into every 401 challenge regardless of the route's own
    /// requirement (spec §4.4).
    pub default_scope: Option<String>,
}

#[derive(Clone)]
pub struct AppState(Arc<AppStateInner>);

impl AppState {
    pub fn new(inner: AppStateInner) -> Self {
        Self(Arc::new(inner))
    }
}

impl Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
