//! Forwarding request builder for non-CONNECT requests.
//!
//! # Responsibilities
//! - Append this hop's chain token to the `forwarded` header
//! - Strip hop-by-hop headers before the request leaves this hop
//! - Honor the `connection` header's list of per-hop extension headers
//! - Rewrite the target URI to plaintext HTTP and send the request upstream
//!
//! # Design Decisions
//! - The origin always speaks plaintext HTTP from here; TLS-to-origin is
//!   out of scope, so the scheme is forced to `http` unconditionally
//! - The inbound body is passed through as a stream, never buffered
//! - A `connection: close` value is left alone; any other value names
//!   headers to strip and is then removed itself

use hyper::body::Incoming;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::http::uri::{PathAndQuery, Scheme};
use hyper::{Request, Response, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use thiserror::Error;

/// Shared outbound HTTP/1.1 client (pooled, plaintext).
pub type OutboundClient = Client<HttpConnector, Incoming>;

/// Error forwarding a request to the origin.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("cannot determine request target")]
    MissingTarget,
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Headers that are meaningful only for the immediate connection and must
/// not travel to the next hop.
const HOP_BY_HOP: [&str; 7] = [
    "keep-alive",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "proxy-authorization",
    "proxy-authenticate",
];

/// Forward a request to its origin, returning the streamed response.
///
/// `chain_token` is this hop's pre-built `by=..;for=..;host=..;proto=..`
/// value; it is appended (multimap semantics) so earlier hops survive.
pub async fn forward(
    client: &OutboundClient,
    request: Request<Incoming>,
    chain_token: &str,
) -> Result<Response<Incoming>, ForwardError> {
    let (mut parts, body) = request.into_parts();

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    parts.uri = origin_uri(&parts.uri, host.as_deref())?;

    match HeaderValue::from_str(chain_token) {
        Ok(value) => {
            parts.headers.append(header::FORWARDED, value);
        }
        Err(_) => {
            tracing::debug!(chain_token, "Chain token not a valid header value, skipping");
        }
    }
    sanitize_headers(&mut parts.headers);

    let outbound = Request::from_parts(parts, body);
    let response = client.request(outbound).await?;
    Ok(response)
}

/// Rewrite a request URI into the absolute plaintext-HTTP form expected by
/// the outbound client.
///
/// Absolute-form proxy requests keep their authority; origin-form requests
/// reconstruct it from the `host` header. The scheme is always `http`.
pub fn origin_uri(uri: &Uri, host_header: Option<&str>) -> Result<Uri, ForwardError> {
    let mut parts = uri.clone().into_parts();
    parts.scheme = Some(Scheme::HTTP);
    if parts.authority.is_none() {
        let host = host_header.ok_or(ForwardError::MissingTarget)?;
        parts.authority = Some(host.parse().map_err(|_| ForwardError::MissingTarget)?);
    }
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    Uri::from_parts(parts).map_err(|_| ForwardError::MissingTarget)
}

/// Strip hop-by-hop headers, plus whatever the `connection` header names.
///
/// A literal `close` value keeps the `connection` header in place so the
/// origin still sees the close intent; any other value is treated as a
/// comma-separated list of additional per-hop headers to remove, and the
/// `connection` header goes with them.
pub fn sanitize_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }

    let connection = headers
        .get(header::CONNECTION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    if let Some(value) = connection {
        if value != "close" {
            for name in value.split(',') {
                let name = name.trim();
                if !name.is_empty() {
                    headers.remove(name);
                }
            }
            headers.remove(header::CONNECTION);
        }
    }
}
