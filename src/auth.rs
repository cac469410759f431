//! Bearer token gate for the http api.
//!
//! Two capabilities: `Edit` (import, validate) and `Admin` (cache
//! clearing). The admin token also grants `Edit`.

use crate::config::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Edit,
    Admin,
}

/// Configured tokens. With none configured the gate is open.
#[derive(Clone, Debug, Default)]
pub struct AccessTokens {
    pub edit: Option<String>,
    pub admin: Option<String>,
}

impl AccessTokens {
    pub fn from_config(config: &Config) -> Self {
        Self {
            edit: config.edit_token.clone(),
            admin: config.admin_token.clone(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.edit.is_none() && self.admin.is_none()
    }

    /// Check an `Authorization` header value against `capability`.
    pub fn authorize(&self, header: Option<&str>, capability: Capability) -> bool {
        if self.is_open() {
            return true;
        }

        let Some(provided) = header.and_then(extract_bearer_token) else {
            return false;
        };

        let admin_ok = self
            .admin
            .as_deref()
            .map(|expected| validate_token(provided, expected))
            .unwrap_or(false);

        match capability {
            Capability::Admin => admin_ok,
            Capability::Edit => {
                let edit_ok = self
                    .edit
                    .as_deref()
                    .map(|expected| validate_token(provided, expected))
                    .unwrap_or(false);
                edit_ok || admin_ok
            }
        }
    }
}

/// Validates a provided token against the expected token using constant-time comparison.
///
/// The loop touches every byte of the shorter input, so timing does not
/// reveal where the tokens first differ.
///
/// Returns `false` if either token is empty.
pub fn validate_token(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    // an unset token must never match an empty header
    if provided.is_empty() || expected.is_empty() {
        return false;
    }

    // length is checked after the byte loop, not before it
    let len_match = provided.len() == expected.len();

    // XOR accumulator: if any byte differs, result will be non-zero
    let mut diff: u8 = 0;
    for (a, b) in provided.iter().zip(expected.iter()) {
        diff |= a ^ b;
    }

    len_match && diff == 0
}

/// Extracts the bearer token from an Authorization header value.
///
/// Expected format: "Bearer <token>"
/// Returns `None` if the header doesn't match the expected format.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();

    // scheme is case-insensitive (RFC 6750)
    if header.len() < 7 || !header.is_char_boundary(7) {
        return None;
    }

    let (prefix, token) = header.split_at(7);
    if prefix.eq_ignore_ascii_case("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    } else {
        None
    }
}
