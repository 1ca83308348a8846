//! Typed error taxonomy. One enum per concern, matching the kinds named in
//! the error handling design rather than inventing new ones.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("environment variable {0} could not be parsed: {1}")]
    InvalidVar(&'static str, String),
    #[error("oauth.authorization_servers must be non-empty")]
    EmptyAuthorizationServers,
    #[error("oauth.audience must be non-empty")]
    EmptyAudience,
}

/// Token errors, per the error handling design's token-error kinds.
#[derive(Debug, Error, Clone)]
pub enum TokenError {
    #[error("bearer token is missing")]
    MissingToken,
    #[error("token is malformed")]
    InvalidToken,
    #[error("unsupported jwt algorithm")]
    UnsupportedAlgorithm,
    #[error("no signing key found for kid")]
    KeyNotFound,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("token is expired")]
    TokenExpired,
    #[error("audience does not match")]
    InvalidAudience,
    #[error("missing required claim: {0}")]
    MissingClaim(&'static str),
}

/// Authorization errors: insufficient scope, carrying the required set for
/// downstream challenge construction (spec §4.3).
#[derive(Debug, Error, Clone)]
#[error("insufficient scope: requires {required:?}")]
pub struct InsufficientScope {
    pub required: Vec<String>,
}

/// Dispatch errors used internally by the JSON-RPC dispatcher to build
/// error objects; these never become an HTTP status on their own.
#[derive(Debug, Error, Clone)]
pub enum DispatchError {
    #[error("method not found")]
    MethodNotFound,
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    #[error("execution error: {0}")]
    ExecutionError(String),
}

impl DispatchError {
    /// Wire-value JSON-RPC error code (§4.8).
    pub fn code(&self) -> i64 {
        match self {
            DispatchError::MethodNotFound => -32601,
            DispatchError::InvalidParams(_) => -32602,
            DispatchError::ToolNotFound(_) => -32003,
            DispatchError::ResourceNotFound(_) => -32002,
            DispatchError::ExecutionError(_) => -32603,
        }
    }
}

/// Top-level transport error. Converted to a `Response` by the error
/// responder (C5), which has the deployment's resource-metadata URL in
/// scope; the underlying message is logged but never placed verbatim into
/// a `WWW-Authenticate` header.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Scope(#[from] InsufficientScope),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}
