//! CONNECT tunnel relay.
//!
//! # Responsibilities
//! - Resolve the CONNECT target (host:port, port defaulting to 443)
//! - Open the destination socket (single attempt, bounded by timeout)
//! - Relay raw bytes between client and destination, both directions
//!
//! # Design Decisions
//! - Each direction is an independent copy loop; an error in one degrades
//!   the tunnel to half-close instead of tearing both sides down
//! - The relay has no knowledge of the bytes it moves (TLS stays opaque)
//! - No retry on connect failure; the dispatcher answers 502 immediately

use std::time::Duration;

use hyper::upgrade::Upgraded;
use hyper::Uri;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Error establishing a tunnel destination.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("CONNECT target is not host:port")]
    MissingAuthority,
    #[error("connect to {authority} failed: {source}")]
    Connect {
        authority: String,
        source: std::io::Error,
    },
    #[error("connect to {authority} timed out")]
    ConnectTimeout { authority: String },
}

/// Extract the destination of a CONNECT request.
///
/// CONNECT URIs are authority-form (`host:port`); a missing port defaults
/// to 443.
pub fn connect_target(uri: &Uri) -> Result<(String, u16), TunnelError> {
    let authority = uri.authority().ok_or(TunnelError::MissingAuthority)?;
    Ok((
        authority.host().to_string(),
        authority.port_u16().unwrap_or(443),
    ))
}

/// Open the destination socket for a tunnel.
///
/// Single TCP connect attempt bounded by `connect_timeout`; the caller maps
/// failure to a gateway-error response. Never retries.
pub async fn open_tunnel(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<TcpStream, TunnelError> {
    match tokio::time::timeout(connect_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(TunnelError::Connect {
            authority: format!("{}:{}", host, port),
            source,
        }),
        Err(_) => Err(TunnelError::ConnectTimeout {
            authority: format!("{}:{}", host, port),
        }),
    }
}

/// Relay bytes between the upgraded client connection and the destination.
///
/// Runs two unidirectional copy loops concurrently. Each loop ends when its
/// source closes or errors; the peer direction keeps running, so a one-sided
/// failure becomes a half-close. Errors are logged and swallowed: the 200
/// response is already on the wire by the time streaming starts.
pub async fn relay(upgraded: Upgraded, destination: TcpStream) {
    let (mut client_read, mut client_write) = tokio::io::split(TokioIo::new(upgraded));
    let (mut dest_read, mut dest_write) = destination.into_split();

    let client_to_dest = async {
        match tokio::io::copy(&mut client_read, &mut dest_write).await {
            Ok(bytes) => tracing::debug!(bytes, "client-to-destination stream closed"),
            Err(error) => tracing::debug!(%error, "client-to-destination stream errored"),
        }
        let _ = dest_write.shutdown().await;
    };

    let dest_to_client = async {
        match tokio::io::copy(&mut dest_read, &mut client_write).await {
            Ok(bytes) => tracing::debug!(bytes, "destination-to-client stream closed"),
            Err(error) => tracing::debug!(%error, "destination-to-client stream errored"),
        }
        let _ = client_write.shutdown().await;
    };

    tokio::join!(client_to_dest, dest_to_client);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_with_port() {
        let uri: Uri = "example.com:8443".parse().unwrap();
        assert_eq!(
            connect_target(&uri).unwrap(),
            ("example.com".to_string(), 8443)
        );
    }

    #[test]
    fn target_defaults_to_443() {
        let uri: Uri = "example.com".parse().unwrap();
        assert_eq!(
            connect_target(&uri).unwrap(),
            ("example.com".to_string(), 443)
        );
    }

    #[test]
    fn path_form_uri_has_no_target() {
        let uri: Uri = "/index.html".parse().unwrap();
        assert!(matches!(
            connect_target(&uri),
            Err(TunnelError::MissingAuthority)
        ));
    }

    #[tokio::test]
    async fn refused_connect_fails_fast() {
        // Port 1 on localhost is practically never listening.
        let result = open_tunnel("127.0.0.1", 1, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(TunnelError::Connect { .. })));
    }
}
