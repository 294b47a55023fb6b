//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all connection tasks
//!
//! users file (line-structured text)
//!     → loader.rs (extract user:password tokens)
//!     → credential set for the authorizer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no runtime reload
//! - All fields have defaults so the proxy runs with no config file at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_credentials};
pub use schema::ListenerConfig;
pub use schema::ProxyConfig;
pub use schema::TlsConfig;
