//! Error Responder (C5, spec §4.5): bit-exact `WWW-Authenticate` challenges
//! and JSON error bodies.
//!
//! Grounded on `mcp/auth.rs::unauthorized` for the "typed-response-from-an-
//! error-kind" shape; the header grammar itself comes straight from
//! spec §6 ("`Bearer` SP param *( "," SP param )`").

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::GatewayError;

/// Builds the `WWW-Authenticate` header value for a 401. Always carries
/// `resource_metadata`; carries `scope` only when one is supplied (spec's
/// table distinguishes the two cases explicitly).
fn bearer_challenge_401(resource_metadata_url: &str, scope: Option<&str>) -> HeaderValue {
    let value = match scope {
        Some(scope) => format!(
            r#"Bearer resource_metadata="{resource_metadata_url}", scope="{scope}""#
        ),
        None => format!(r#"Bearer resource_metadata="{resource_metadata_url}""#),
    };
    HeaderValue::from_str(&value).expect("challenge value is valid header ascii")
}

/// Builds the `WWW-Authenticate` header value for a 403
/// (`insufficient_scope`). Required scopes are joined with single spaces
/// inside one quoted value (spec §6).
fn bearer_challenge_403(resource_metadata_url: &str, required_scopes: &[String]) -> HeaderValue {
    let scopes = required_scopes.join(" ");
    let value = format!(
        r#"Bearer error="insufficient_scope", scope="{scopes}", resource_metadata="{resource_metadata_url}""#
    );
    HeaderValue::from_str(&value).expect("challenge value is valid header ascii")
}

fn json_error_body(message: &str) -> serde_json::Value {
    json!({ "error": message })
}

/// Unauthenticated / invalid bearer token. `default_scope`, when present,
/// is the deployment's baseline scope, echoed regardless of which route
/// triggered the 401 (spec §4.4: "default scopes are echoed... regardless
/// of the route's own requirement").
pub fn missing_or_invalid_token(resource_metadata_url: &str, default_scope: Option<&str>) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        axum::Json(json_error_body("unauthorized")),
    )
        .into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        bearer_challenge_401(resource_metadata_url, default_scope),
    );
    response
}

/// Authenticated but missing a required scope.
pub fn insufficient_scope(resource_metadata_url: &str, required: &[String]) -> Response {
    let mut response = (
        StatusCode::FORBIDDEN,
        axum::Json(json_error_body("insufficient_scope")),
    )
        .into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        bearer_challenge_403(resource_metadata_url, required),
    );
    response
}

pub fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, axum::Json(json_error_body(message))).into_response()
}

pub fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json_error_body(message)),
    )
        .into_response()
}

/// Converts a `GatewayError` to its wire response, logging the underlying
/// cause at a severity matching its class (warn for 4xx, error for 5xx)
/// without leaking it into the challenge header (spec §7 propagation
/// policy).
pub fn respond(err: &GatewayError, resource_metadata_url: &str, default_scope: Option<&str>) -> Response {
    match err {
        GatewayError::Token(e) => {
            tracing::warn!(error = %e, "token validation failed");
            missing_or_invalid_token(resource_metadata_url, default_scope)
        }
        GatewayError::Scope(e) => {
            tracing::warn!(required = ?e.required, "insufficient scope");
            insufficient_scope(resource_metadata_url, &e.required)
        }
        GatewayError::BadRequest(msg) => {
            tracing::warn!(%msg, "bad request");
            bad_request(msg)
        }
        GatewayError::Internal(msg) => {
            tracing::error!(%msg, "internal error");
            internal_error(msg)
        }
    }
}
