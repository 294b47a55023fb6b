//! Proxy server: accept loop and per-connection HTTP serving.
//!
//! # Responsibilities
//! - Accept connections through the bounded listener
//! - Perform the optional TLS handshake
//! - Drive each connection with HTTP/1.1 + upgrade support (CONNECT)
//! - Keep per-connection failures contained to their own task
//! - Drain in-flight connections on shutdown

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_rustls::TlsAcceptor;

use crate::config::ProxyConfig;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::Listener;
use crate::net::tls;
use crate::proxy::handler::ProxyService;
use crate::security::CredentialStore;

/// How long shutdown waits for in-flight connections before giving up.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The forward proxy server.
pub struct ProxyServer {
    config: ProxyConfig,
    service: Arc<ProxyService>,
    tls: Option<TlsAcceptor>,
    auth_enabled: bool,
    tracker: ConnectionTracker,
}

impl ProxyServer {
    /// Create a new server from validated configuration and the loaded
    /// credential set. Loads TLS material eagerly so a bad certificate
    /// fails startup, not the first connection.
    pub fn new(config: ProxyConfig, credentials: CredentialStore) -> Result<Self, std::io::Error> {
        let tls = match &config.listener.tls {
            Some(tls_config) => Some(tls::load_tls_acceptor(
                Path::new(&tls_config.cert_path),
                Path::new(&tls_config.key_path),
            )?),
            None => None,
        };

        let auth_enabled = credentials.enabled();
        let service = Arc::new(ProxyService::new(&config, credentials));

        Ok(Self {
            config,
            service,
            tls,
            auth_enabled,
            tracker: ConnectionTracker::new(),
        })
    }

    /// Run the server on an already-bound listener until shutdown fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let listener = Listener::from_tcp(listener, self.config.listener.max_connections);
        let addr = listener.local_addr()?;

        tracing::info!(
            address = %addr,
            tls = self.tls.is_some(),
            auth = self.auth_enabled,
            "Proxy server starting"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => {
                    let (stream, peer_addr, permit) = match accepted {
                        Ok(accepted) => accepted,
                        Err(error) => {
                            tracing::warn!(%error, "Accept failed");
                            continue;
                        }
                    };

                    let service = Arc::clone(&self.service);
                    let tls = self.tls.clone();
                    let guard = self.tracker.track();

                    tokio::spawn(async move {
                        // Permit and guard live for the whole connection.
                        let _permit = permit;
                        let connection_id = guard.id();
                        if let Err(error) =
                            handle_connection(stream, peer_addr, tls, service).await
                        {
                            tracing::debug!(
                                connection_id = %connection_id,
                                %error,
                                "Connection ended with error"
                            );
                        }
                    });
                }
            }
        }

        tracing::info!(
            in_flight = self.tracker.active_count(),
            "Shutdown signal received, draining connections"
        );
        let _ = tokio::time::timeout(DRAIN_TIMEOUT, self.tracker.wait_until_idle()).await;
        tracing::info!("Proxy server stopped");
        Ok(())
    }
}

/// Serve one accepted connection, with the optional TLS handshake first.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    tls: Option<TlsAcceptor>,
    service: Arc<ProxyService>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let local_addr = stream.local_addr()?;
    match tls {
        Some(acceptor) => {
            let tls_stream = acceptor.accept(stream).await?;
            serve_stream(tls_stream, local_addr, peer_addr, service).await
        }
        None => serve_stream(stream, local_addr, peer_addr, service).await,
    }
}

/// Drive HTTP/1.1 over one connection, dispatching each request.
///
/// `preserve_header_case` keeps the proxy transparent; `with_upgrades` is
/// required for CONNECT tunnels to work at all.
async fn serve_stream<I>(
    io: I,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    service: Arc<ProxyService>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let handler = service_fn(move |request| {
        let service = Arc::clone(&service);
        async move {
            Ok::<_, Infallible>(service.handle(request, local_addr, peer_addr).await)
        }
    });

    http1::Builder::new()
        .preserve_header_case(true)
        .serve_connection(TokioIo::new(io), handler)
        .with_upgrades()
        .await?;
    Ok(())
}
