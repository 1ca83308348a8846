//! Scope Checker (C3, spec §4.3): pure predicates over a claims record.

use crate::claims::TokenClaims;
use crate::error::InsufficientScope;

/// Succeeds iff every required scope is present. A nil claims value always
/// fails (the caller passes `None` when authentication did not run).
pub fn require_all(
    claims: Option<&TokenClaims>,
    required: &[&str],
) -> Result<(), InsufficientScope> {
    let Some(claims) = claims else {
        return Err(InsufficientScope {
            required: required.iter().map(|s| s.to_string()).collect(),
        });
    };
    let missing: Vec<String> = required
        .iter()
        .filter(|s| !claims.has_scope(s))
        .map(|s| s.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InsufficientScope { required: missing })
    }
}

/// Succeeds iff at least one required scope is present. An empty
/// required-set always fails.
pub fn require_any(
    claims: Option<&TokenClaims>,
    required: &[&str],
) -> Result<(), InsufficientScope> {
    if required.is_empty() {
        return Err(InsufficientScope {
            required: Vec::new(),
        });
    }
    let Some(claims) = claims else {
        return Err(InsufficientScope {
            required: required.iter().map(|s| s.to_string()).collect(),
        });
    };
    if required.iter().any(|s| claims.has_scope(s)) {
        Ok(())
    } else {
        Err(InsufficientScope {
            required: required.iter().map(|s| s.to_string()).collect(),
        })
    }
}
