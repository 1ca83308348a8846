//! Auth Middleware (C6, spec §4.4).
//!
//! `authenticate` is grounded on `other_examples/.../apollo-mcp-server
//! /auth.rs::oauth_validate` (`middleware::from_fn_with_state`, a typed
//! request-extension carrying the verified principal). `require_scopes`
//! takes its required-scope set from a per-route `Extension` layer, the
//! standard axum idiom for parameterizing a shared middleware function per
//! route without writing one closure type per route.

use axum::Extension;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::claims::TokenClaims;
use crate::error::{GatewayError, TokenError};
use crate::responder;
use crate::scopes;
use crate::state::AppState;

/// Per-route required-scope set, installed with `.layer(Extension(...))`
/// ahead of the `require_scopes` middleware layer.
#[derive(Clone)]
pub struct RequiredScopes(pub Vec<&'static str>);

fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Result<String, TokenError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(TokenError::MissingToken)?
        .to_str()
        .map_err(|_| TokenError::InvalidToken)?;

    let mut parts = value.splitn(2, ' ');
    let scheme = parts.next().ok_or(TokenError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(TokenError::InvalidToken);
    }
    let token = parts.next().ok_or(TokenError::InvalidToken)?.trim();
    if token.is_empty() {
        return Err(TokenError::InvalidToken);
    }
    Ok(token.to_string())
}

/// Extracts the Bearer token, validates it via C2, and on success attaches
/// the resulting `TokenClaims` to the request's extensions before calling
/// the next handler. On failure, short-circuits with a 401 challenge.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let result = match extract_bearer_token(request.headers()) {
        Ok(token) => state.validator.validate(&token).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => responder::respond(
            &GatewayError::Token(e),
            &state.resource_metadata_url,
            state.default_scope.as_deref(),
        ),
    }
}

/// Reads the claims attached by `authenticate` and enforces that every
/// scope in the route's `RequiredScopes` is present. Absence of claims
/// (authentication did not run, or failed silently upstream) is itself a
/// 401, not a 403 — the authentication precondition was never met.
pub async fn require_scopes(
    State(state): State<AppState>,
    Extension(required): Extension<RequiredScopes>,
    request: Request,
    next: Next,
) -> Response {
    let claims = request.extensions().get::<TokenClaims>();
    if claims.is_none() {
        return responder::respond(
            &GatewayError::Token(TokenError::MissingToken),
            &state.resource_metadata_url,
            state.default_scope.as_deref(),
        );
    }

    match scopes::require_all(claims, &required.0) {
        Ok(()) => next.run(request).await,
        Err(e) => responder::respond(
            &GatewayError::Scope(e),
            &state.resource_metadata_url,
            state.default_scope.as_deref(),
        ),
    }
}
