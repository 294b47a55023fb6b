//! Proxy authorization against a preloaded credential set.
//!
//! # Responsibilities
//! - Validate `proxy-authorization` headers (basic scheme)
//! - Membership-test decoded credentials against the valid set
//! - Keep the rejection signal identical for missing and wrong credentials
//!
//! # Design Decisions
//! - The scheme field of the header is not validated; only the encoded
//!   token matters (permissive, transport-independent)
//! - Error kinds are internal detail for logging; clients always see the
//!   same 407 challenge, so failures leak nothing about why

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hyper::header::HeaderMap;
use thiserror::Error;

/// Why an authorization check failed. Never exposed to the client; both
/// variants produce the identical 407 challenge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no proxy-authorization header present")]
    MissingCredentials,
    #[error("credentials not in the valid set")]
    InvalidCredentials,
}

/// Holds the set of valid `user:password` strings.
///
/// An empty store means authorization is disabled and every request passes.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashSet<String>,
}

impl CredentialStore {
    /// Build a store from an already-extracted credential set.
    pub fn new(users: HashSet<String>) -> Self {
        Self { users }
    }

    /// A store that authorizes everything (auth disabled).
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether authorization is enforced.
    pub fn enabled(&self) -> bool {
        !self.users.is_empty()
    }

    /// Number of loaded credentials.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// True when no credentials are loaded.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check a request's `proxy-authorization` header against the store.
    ///
    /// Disabled stores authorize unconditionally. The header is expected as
    /// `<scheme> <base64-token>`; the scheme is ignored and the decoded
    /// token is membership-tested.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        if !self.enabled() {
            return Ok(());
        }

        let authorization = headers
            .get("proxy-authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = authorization
            .split_whitespace()
            .nth(1)
            .ok_or(AuthError::InvalidCredentials)?;

        let decoded = BASE64
            .decode(token)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(AuthError::InvalidCredentials)?;

        if self.users.contains(&decoded) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
