//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGINT/ctrl-c → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
