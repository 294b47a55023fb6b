//! TLS configuration and certificate loading for the listener.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::rustls::pki_types::CertificateDer;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

/// Load a TLS acceptor from PEM certificate and key files.
pub fn load_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, std::io::Error> {
    let config = load_server_config(cert_path, key_path)?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Load a rustls server configuration from certificate and key files.
pub fn load_server_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<ServerConfig, std::io::Error> {
    let mut cert_reader = BufReader::new(File::open(cert_path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open certificate file {:?}: {}", cert_path, e),
        )
    })?);
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut cert_reader).collect::<Result<_, _>>()?;
    if certs.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("No certificate found in {:?}", cert_path),
        ));
    }

    let mut key_reader = BufReader::new(File::open(key_path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open private key file {:?}: {}", key_path, e),
        )
    })?);
    let key = rustls_pemfile::private_key(&mut key_reader)?.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("No private key found in {:?}", key_path),
        )
    })?;

    ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
