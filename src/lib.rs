//! Forward HTTP/HTTPS Proxy Library

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod security;

pub use config::ProxyConfig;
pub use lifecycle::Shutdown;
pub use proxy::ProxyServer;
pub use security::CredentialStore;
