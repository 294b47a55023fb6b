//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → tls.rs (optional TLS handshake)
//!     → connection.rs (id allocation, active-count tracking)
//!     → Hand off to the proxy dispatcher
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked so shutdown can drain in-flight work
//! - TLS is optional and handled transparently

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{ConnectionId, ConnectionTracker};
pub use listener::Listener;
