//! Request dispatcher.
//!
//! # Responsibilities
//! - Run the per-request pipeline: loop check → auth check → method branch
//! - Answer self-requests with the fixed liveness response
//! - Challenge unauthorized requests with 407
//! - Delegate CONNECT to the tunnel relay, everything else to forwarding
//!
//! # Design Decisions
//! - Loop detection runs first; a self-request never reaches auth or any
//!   outbound I/O
//! - Missing and invalid credentials produce the identical 407 challenge
//! - Every terminal failure maps to exactly one response; nothing retries
//! - The only cross-request state is the immutable configuration and the
//!   pooled outbound client

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use http_body_util::BodyExt;
use uuid::Uuid;

use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::proxy::forward::{self, OutboundClient};
use crate::proxy::forwarded::{address_token, chain_token, is_self_request};
use crate::proxy::tunnel;
use crate::proxy::{empty, full, ProxyBody};
use crate::security::CredentialStore;

/// Fixed body returned to a request that already traversed this proxy.
const LIVENESS_BODY: &str = "It work!";

/// Per-request dispatcher. One instance serves all connections; it holds
/// only immutable configuration-derived state.
pub struct ProxyService {
    client: OutboundClient,
    credentials: CredentialStore,
    tls_terminated: bool,
    connect_timeout: Duration,
}

impl ProxyService {
    /// Build the dispatcher from validated configuration and the loaded
    /// credential set.
    pub fn new(config: &ProxyConfig, credentials: CredentialStore) -> Self {
        let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            credentials,
            tls_terminated: config.tls_terminated(),
            connect_timeout,
        }
    }

    /// Handle one inbound request.
    ///
    /// `local_addr` and `remote_addr` are the endpoints of the accepted
    /// connection; the local one identifies this hop in chain metadata.
    pub async fn handle(
        &self,
        request: Request<Incoming>,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
    ) -> Response<ProxyBody> {
        let start = Instant::now();
        let request_id = Uuid::new_v4();
        let method = request.method().clone();

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            uri = %request.uri(),
            peer = %remote_addr,
            "Dispatching request"
        );

        let self_token = address_token(&local_addr);

        let response = if is_self_request(request.headers(), &self_token) {
            tracing::debug!(request_id = %request_id, "Self-request detected, answering liveness");
            liveness_response()
        } else if let Err(reason) = self.credentials.authorize(request.headers()) {
            tracing::debug!(request_id = %request_id, %reason, "Rejecting request");
            challenge_response()
        } else if method == Method::CONNECT {
            self.handle_connect(request, request_id).await
        } else {
            self.handle_forward(request, request_id, &self_token, &remote_addr)
                .await
        };

        metrics::record_request(method.as_str(), response.status().as_u16(), start);
        response
    }

    /// Establish a CONNECT tunnel: connect to the destination first, then
    /// answer 200 and hand the upgraded connection to the relay.
    async fn handle_connect(
        &self,
        request: Request<Incoming>,
        request_id: Uuid,
    ) -> Response<ProxyBody> {
        let (host, port) = match tunnel::connect_target(request.uri()) {
            Ok(target) => target,
            Err(error) => {
                tracing::warn!(request_id = %request_id, %error, uri = %request.uri(), "Bad CONNECT target");
                return status_response(
                    StatusCode::BAD_REQUEST,
                    "CONNECT target must be host:port",
                );
            }
        };

        match tunnel::open_tunnel(&host, port, self.connect_timeout).await {
            Ok(destination) => {
                tracing::debug!(request_id = %request_id, host = %host, port, "Tunnel destination connected");
                metrics::record_tunnel_opened();

                // The 200 must go out before the client connection can
                // upgrade, so the relay waits in its own task.
                tokio::spawn(async move {
                    match hyper::upgrade::on(request).await {
                        Ok(upgraded) => tunnel::relay(upgraded, destination).await,
                        Err(error) => {
                            tracing::debug!(request_id = %request_id, %error, "Client connection upgrade failed");
                        }
                    }
                });

                connection_established_response()
            }
            Err(error) => {
                tracing::warn!(request_id = %request_id, %error, "Tunnel destination unreachable");
                status_response(StatusCode::BAD_GATEWAY, "Destination connect failed")
            }
        }
    }

    /// Forward a non-CONNECT request to its origin and stream the response
    /// back verbatim.
    async fn handle_forward(
        &self,
        request: Request<Incoming>,
        request_id: Uuid,
        self_token: &str,
        remote_addr: &SocketAddr,
    ) -> Response<ProxyBody> {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_owned();
        let proto = if self.tls_terminated { "https" } else { "http" };
        let token = chain_token(self_token, &address_token(remote_addr), &host, proto);

        match forward::forward(&self.client, request, &token).await {
            Ok(response) => response.map(|body| body.boxed()),
            Err(error) => {
                tracing::warn!(request_id = %request_id, %error, "Forwarding to origin failed");
                status_response(StatusCode::BAD_GATEWAY, "Upstream request failed")
            }
        }
    }
}

/// Fixed 200 acknowledgment for detected self-requests.
fn liveness_response() -> Response<ProxyBody> {
    Response::new(full(LIVENESS_BODY))
}

/// 407 challenge; identical for every authorization failure.
fn challenge_response() -> Response<ProxyBody> {
    let mut response = Response::new(empty());
    *response.status_mut() = StatusCode::PROXY_AUTHENTICATION_REQUIRED;
    response.headers_mut().insert(
        header::PROXY_AUTHENTICATE,
        HeaderValue::from_static("basic realm=\"proxy\""),
    );
    response
}

/// Empty 200 sent when the tunnel destination is connected.
fn connection_established_response() -> Response<ProxyBody> {
    Response::new(empty())
}

fn status_response(status: StatusCode, message: &'static str) -> Response<ProxyBody> {
    let mut response = Response::new(full(message));
    *response.status_mut() = status;
    response
}
