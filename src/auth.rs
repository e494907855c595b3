//! Admin authentication
//!
//! The back office is guarded by a single bearer token from the config.
//! Admin routes are closed entirely while no token is configured.

use hyper::header::{HeaderMap, AUTHORIZATION};

use crate::error::CmsError;

/// Validates `Authorization: Bearer <token>` against the configured token
#[derive(Debug, Clone)]
pub struct AdminAuth {
    token: Option<String>,
}

impl AdminAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// Check the request headers, returning an auth error when access is denied
    pub fn check(&self, headers: &HeaderMap) -> Result<(), CmsError> {
        let Some(expected) = self.token.as_deref() else {
            return Err(CmsError::Auth("admin access is not configured".into()));
        };

        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer)
            .ok_or_else(|| CmsError::Auth("missing bearer token".into()))?;

        if constant_time_compare(presented, expected) {
            Ok(())
        } else {
            Err(CmsError::Auth("invalid bearer token".into()))
        }
    }
}

fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
