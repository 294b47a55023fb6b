//! Forward HTTP/HTTPS Proxy
//!
//! A forward proxy built with Tokio and Hyper. Relays plain HTTP requests
//! to their origin and tunnels CONNECT requests as opaque byte streams,
//! recording each hop in the `forwarded` header.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                FORWARD PROXY                  │
//!                         │                                               │
//!     Client Request      │  ┌─────────┐   ┌─────────┐   ┌────────────┐  │
//!     ────────────────────┼─▶│   net   │──▶│  proxy  │──▶│ dispatcher │  │
//!                         │  │listener │   │ server  │   │loop → auth │  │
//!                         │  └─────────┘   └─────────┘   └─────┬──────┘  │
//!                         │                                     │         │
//!                         │                     CONNECT ───────┼──────┐  │
//!                         │                                     ▼      ▼  │
//!     Client Response     │                              ┌─────────┐ ┌──────┐
//!     ◀───────────────────┼──────────────────────────────│ forward │ │tunnel│──▶ Origin /
//!                         │                              │ builder │ │relay │    Destination
//!                         │                              └─────────┘ └──────┘
//!                         │                                               │
//!                         │  ┌─────────────────────────────────────────┐  │
//!                         │  │          Cross-Cutting Concerns          │  │
//!                         │  │  config · security · observability ·     │  │
//!                         │  │  lifecycle                               │  │
//!                         │  └─────────────────────────────────────────┘  │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;

use forward_proxy::config::schema::TlsConfig;
use forward_proxy::config::{self, ProxyConfig};
use forward_proxy::lifecycle::{signals, Shutdown};
use forward_proxy::observability::{logging, metrics};
use forward_proxy::{CredentialStore, ProxyServer};

#[derive(Parser)]
#[command(name = "forward-proxy")]
#[command(about = "Forward HTTP/HTTPS proxy with CONNECT tunneling", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(short, long)]
    listen: Option<String>,

    /// TLS certificate file (PEM); enables HTTPS listening with --key-file.
    #[arg(long)]
    cert_file: Option<String>,

    /// TLS private key file (PEM); enables HTTPS listening with --cert-file.
    #[arg(long)]
    key_file: Option<String>,

    /// Users file enabling basic proxy authorization.
    #[arg(long)]
    auth_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ProxyConfig::default(),
    };
    apply_overrides(&mut config, &args);

    logging::init(&config.observability.log_level);

    // Overrides can introduce problems the file load never saw.
    if let Err(errors) = config::validation::validate_config(&config) {
        for error in &errors {
            tracing::error!(%error, "Invalid configuration");
        }
        return Err("configuration validation failed".into());
    }

    tracing::info!("forward-proxy v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        tls = config.tls_terminated(),
        auth = config.auth.enabled(),
        "Configuration loaded"
    );

    let credentials = match &config.auth.users_file {
        Some(path) => {
            let users = config::load_credentials(Path::new(path))?;
            tracing::info!(count = users.len(), "Loaded valid users");
            CredentialStore::new(users)
        }
        None => CredentialStore::disabled(),
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_on_ctrl_c(&shutdown).await;
    });

    let server = ProxyServer::new(config, credentials)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Apply command-line overrides on top of the file-loaded configuration.
fn apply_overrides(config: &mut ProxyConfig, args: &Args) {
    if let Some(listen) = &args.listen {
        config.listener.bind_address = listen.clone();
    }
    if let (Some(cert_path), Some(key_path)) = (&args.cert_file, &args.key_file) {
        config.listener.tls = Some(TlsConfig {
            cert_path: cert_path.clone(),
            key_path: key_path.clone(),
        });
    }
    if let Some(auth_file) = &args.auth_file {
        config.auth.users_file = Some(auth_file.clone());
    }
}
