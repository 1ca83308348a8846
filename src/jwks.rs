//! JWKS Cache (C1, spec §4.1).
//!
//! Grounded on `oidc.rs`'s `JwksCache`/`refresh_jwks_if_needed`/
//! `discover_jwks_uri`/`fetch_jwks`, generalized from RSA-only manual
//! component parsing to `jsonwebtoken::jwk::JwkSet` so both RSA and EC keys
//! (the validator's full algorithm whitelist) are handled uniformly.
//!
//! The teacher's refresh discipline is a minimum-interval throttle, not true
//! single-flight coalescing. Spec §4.1/§9 require the stronger guarantee
//! ("at most one refresh in flight per issuer... concurrent lookups await
//! the in-flight result"), realized here with `futures::future::Shared`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{FutureExt, Shared};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::TokenError;

type RefreshFuture = Shared<Pin<Box<dyn Future<Output = Result<(), JwksError>> + Send>>>;

/// A cached key plus the algorithm the authorization server itself declared
/// for it, when present. Used by the validator to re-compare the JWK's own
/// `alg` against the token header as extra defense against algorithm
/// confusion beyond the whitelist-before-fetch check.
#[derive(Clone)]
pub struct CachedKey {
    pub key: DecodingKey,
    pub declared_alg: Option<Algorithm>,
}

#[derive(Debug, Clone, Error)]
pub enum JwksError {
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("invalid jwks or discovery document: {0}")]
    Parse(String),
    #[error("discovery document at {0} is missing jwks_uri")]
    MissingJwksUri(String),
}

#[derive(Default)]
struct IssuerState {
    keys: HashMap<String, CachedKey>,
    fetched_at: Option<Instant>,
    inflight: Option<RefreshFuture>,
}

struct Inner {
    http: reqwest::Client,
    ttl: Duration,
    state: RwLock<HashMap<String, IssuerState>>,
}

/// Per-authorization-server signing key cache. Cheap to clone; all clones
/// share the same underlying state.
#[derive(Clone)]
pub struct JwksCache {
    inner: Arc<Inner>,
}

impl JwksCache {
    pub fn new(http: reqwest::Client, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                ttl,
                state: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// `get_key(ctx, kid) -> (key | error)` (spec §4.1).
    ///
    /// Checks the live map first; on miss or TTL expiry triggers a refresh
    /// and retries the lookup once. Still missing after a successful
    /// refresh fails with `KeyNotFound`.
    pub async fn get_key(&self, issuer: &str, kid: &str) -> Result<CachedKey, TokenError> {
        if let Some(key) = self.cached(issuer, kid).await {
            return Ok(key);
        }
        if let Err(e) = self.refresh(issuer).await {
            tracing::warn!(issuer, error = %e, "jwks refresh failed");
            // A refresh failure does not evict the previous good key set;
            // fall through and try the (possibly still-present) cache once
            // more before giving up, per §4.1 "Failure semantics".
        }
        self.cached(issuer, kid).await.ok_or(TokenError::KeyNotFound)
    }

    async fn cached(&self, issuer: &str, kid: &str) -> Option<CachedKey> {
        let state = self.inner.state.read().await;
        let entry = state.get(issuer)?;
        let fresh = entry
            .fetched_at
            .map(|t| t.elapsed() < self.inner.ttl)
            .unwrap_or(false);
        if !fresh {
            return None;
        }
        entry.keys.get(kid).cloned()
    }

    /// Forces a refresh, bypassing TTL. At most one fetch is ever in
    /// flight per issuer: concurrent callers clone and await the same
    /// `Shared` future rather than issuing redundant requests.
    pub async fn refresh(&self, issuer: &str) -> Result<(), JwksError> {
        let fut = {
            let mut state = self.inner.state.write().await;
            let entry = state.entry(issuer.to_string()).or_default();
            if let Some(f) = &entry.inflight {
                f.clone()
            } else {
                let inner = self.inner.clone();
                let issuer_owned = issuer.to_string();
                let f: RefreshFuture =
                    (Box::pin(async move { do_fetch(&inner, &issuer_owned).await })
                        as Pin<Box<dyn Future<Output = Result<(), JwksError>> + Send>>)
                        .shared();
                entry.inflight = Some(f.clone());
                f
            }
        };

        let result = fut.await;

        let mut state = self.inner.state.write().await;
        if let Some(entry) = state.get_mut(issuer) {
            entry.inflight = None;
        }
        result
    }
}

async fn do_fetch(inner: &Inner, issuer: &str) -> Result<(), JwksError> {
    let jwks_uri = discover_jwks_uri(&inner.http, issuer).await?;
    let keys = fetch_jwks(&inner.http, &jwks_uri).await?;

    // Swap in the new key set atomically with the write guard held
    // exclusively (§5 "Shared mutable state"). Readers never observe a
    // partial update.
    let mut state = inner.state.write().await;
    let entry = state.entry(issuer.to_string()).or_default();
    entry.keys = keys;
    entry.fetched_at = Some(Instant::now());
    Ok(())
}

#[derive(serde::Deserialize)]
struct OidcDiscovery {
    jwks_uri: String,
}

async fn discover_jwks_uri(http: &reqwest::Client, issuer: &str) -> Result<String, JwksError> {
    let url = format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    );
    let resp = http
        .get(&url)
        .send()
        .await
        .map_err(|e| JwksError::Transport(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(JwksError::Status(resp.status().as_u16()));
    }
    let doc: OidcDiscovery = resp
        .json()
        .await
        .map_err(|e| JwksError::Parse(e.to_string()))?;
    if doc.jwks_uri.is_empty() {
        return Err(JwksError::MissingJwksUri(url));
    }
    Ok(doc.jwks_uri)
}

async fn fetch_jwks(
    http: &reqwest::Client,
    jwks_uri: &str,
) -> Result<HashMap<String, CachedKey>, JwksError> {
    let resp = http
        .get(jwks_uri)
        .send()
        .await
        .map_err(|e| JwksError::Transport(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(JwksError::Status(resp.status().as_u16()));
    }
    let body = resp
        .text()
        .await
        .map_err(|e| JwksError::Parse(e.to_string()))?;
    let jwk_set: JwkSet =
        serde_json::from_str(&body).map_err(|e| JwksError::Parse(e.to_string()))?;

    let mut out = HashMap::new();
    for jwk in jwk_set.keys {
        let Some(kid) = jwk.common.key_id.clone() else {
            continue;
        };
        let declared_alg = jwk.common.key_algorithm.and_then(key_algorithm_to_algorithm);
        match DecodingKey::from_jwk(&jwk) {
            Ok(key) => {
                out.insert(kid, CachedKey { key, declared_alg });
            }
            Err(e) => {
                tracing::warn!(kid, error = %e, "skipping unusable jwk");
            }
        }
    }
    Ok(out)
}

/// Maps a JWK's self-declared `alg` to the `jsonwebtoken` enum, covering
/// only the families relevant to the validator's whitelist; everything
/// else (HMAC, `EdDSA`, RSA-OAEP key-wrapping algorithms) maps to `None`
/// rather than ever being treated as an accepted signing algorithm.
fn key_algorithm_to_algorithm(alg: jsonwebtoken::jwk::KeyAlgorithm) -> Option<Algorithm> {
    use jsonwebtoken::jwk::KeyAlgorithm as Ka;
    match alg {
        Ka::RS256 => Some(Algorithm::RS256),
        Ka::RS384 => Some(Algorithm::RS384),
        Ka::RS512 => Some(Algorithm::RS512),
        Ka::ES256 => Some(Algorithm::ES256),
        Ka::ES384 => Some(Algorithm::ES384),
        Ka::ES512 => Some(Algorithm::ES512),
        _ => None,
    }
}
