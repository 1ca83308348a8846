//! `TokenClaims` (spec §3), carried through the per-request context as the
//! extension's own type rather than a bare string key, so it cannot
//! collide with other middleware's extensions (design note: context-
//! carried claims).

use std::collections::HashSet;

/// The authorized principal for one request. Immutable once constructed by
/// the validator (C2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub scopes: HashSet<String>,
    pub expires_at: u64,
    pub issued_at: Option<u64>,
    pub jti: Option<String>,
}

impl TokenClaims {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

/// Parses the space-separated `scope` claim into a set, discarding empty
/// tokens (spec §4.2 step 7). The inverse of [`join_scopes`].
pub fn parse_scopes(raw: &str) -> HashSet<String> {
    raw.split(' ')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Re-serializes a scope set by joining with single spaces. Order of the
/// input set is irrelevant to the round-trip law (spec §8): re-parsing the
/// output always yields the same set.
pub fn join_scopes<'a>(scopes: impl IntoIterator<Item = &'a String>) -> String {
    scopes.into_iter().cloned().collect::<Vec<_>>().join(" ")
}
