//! Bearer-token check against a shared secret.

use crate::error::{EmlError, Result};

/// Validates `Authorization: Bearer <token>` header values.
#[derive(Clone)]
pub struct BearerAuth {
    secret: Option<String>,
}

impl BearerAuth {
    /// With `None`, every check fails.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Check an `Authorization` header value.
    pub fn check(&self, authorization: Option<&str>) -> Result<()> {
        let secret = self.secret.as_deref().ok_or(EmlError::Unauthorized)?;
        let token = authorization
            .map(str::trim)
            .and_then(|value| {
                let (scheme, token) = value.split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .ok_or(EmlError::Unauthorized)?;

        if constant_time_eq(token.as_bytes(), secret.as_bytes()) {
            Ok(())
        } else {
            Err(EmlError::Unauthorized)
        }
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
