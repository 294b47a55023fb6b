//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (proxy-authorization check against the credential set)
//!     → Pass to the dispatcher's method branch
//! ```
//!
//! # Design Decisions
//! - Fail closed: any auth check failure rejects the request
//! - Missing and invalid credentials are indistinguishable to the client

pub mod auth;

pub use auth::{AuthError, CredentialStore};
