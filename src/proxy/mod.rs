//! Proxy request-handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (accept loop, HTTP/1.1 with upgrade support)
//!     → handler.rs (dispatcher: loop check → auth → method branch)
//!     → tunnel.rs (CONNECT: raw byte relay to destination)
//!     → forward.rs (other methods: sanitize headers, relay to origin)
//!     → Response streamed back to the client
//! ```

pub mod forward;
pub mod forwarded;
pub mod handler;
pub mod server;
pub mod tunnel;

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};

pub use handler::ProxyService;
pub use server::ProxyServer;

/// Response body type used throughout the proxy: either a streamed origin
/// body or a locally-built one.
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// An empty response body.
pub(crate) fn empty() -> ProxyBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

/// A response body with fixed contents.
pub(crate) fn full<T: Into<Bytes>>(chunk: T) -> ProxyBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}
