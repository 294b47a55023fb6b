//! Shared utilities for integration testing.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use forward_proxy::{CredentialStore, ProxyConfig, ProxyServer, Shutdown};

/// Start a proxy on an ephemeral port. Returns its address and the shutdown
/// handle to trigger at the end of the test.
pub async fn start_proxy(config: ProxyConfig, credentials: CredentialStore) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = ProxyServer::new(config, credentials).unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Start a mock origin that captures each request's raw header section and
/// answers with a fixed 200 response, body `origin`.
#[allow(dead_code)]
pub async fn start_capture_origin() -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut chunk = [0u8; 1024];
                        loop {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    head.extend_from_slice(&chunk[..n]);
                                    if head.windows(4).any(|w| w == b"\r\n\r\n") {
                                        break;
                                    }
                                }
                            }
                        }
                        let _ = tx.send(String::from_utf8_lossy(&head).to_string());
                        let _ = socket
                            .write_all(
                                b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\norigin",
                            )
                            .await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

/// Start a TCP echo server for tunnel tests.
#[allow(dead_code)]
pub async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    if socket.write_all(&buf[..n]).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read from a raw socket until the end of the response header section and
/// return everything read so far as a string.
#[allow(dead_code)]
pub async fn read_response_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                head.extend_from_slice(&chunk[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&head).to_string()
}
