//! STT parameter-override proxy.
//!
//! Sits in front of a Whisper-compatible transcription server, force-sets
//! configured form fields on every transcription upload and passes all
//! other traffic through untouched.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                    STT PROXY                      │
//!                     │                                                   │
//!   Client Request    │  ┌─────────┐    ┌────────────┐                    │
//!   ──────────────────┼─▶│  http   │───▶│  routing   │                    │
//!                     │  │ server  │    │ classifier │                    │
//!                     │  └────┬────┘    └─────┬──────┘                    │
//!                     │       │               │ stt          passthrough  │
//!                     │  /health, /stats      ▼                  │        │
//!                     │  (admin)        ┌────────────┐           │        │
//!                     │                 │ form parse │           │        │
//!                     │                 │  rewrite   │           │        │
//!                     │                 │  encode    │           │        │
//!                     │                 └─────┬──────┘           │        │
//!                     │                       ▼                  ▼        │
//!   Client Response   │                 ┌────────────────────────────┐    │
//!   ◀─────────────────┼─────────────────│  upstream forwarder + pool │◀───┼──── Upstream
//!                     │                 └────────────────────────────┘    │     STT server
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;

use stt_proxy::config::OverrideRules;
use stt_proxy::http::HttpServer;
use stt_proxy::lifecycle::{signals, startup, Shutdown};
use stt_proxy::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "stt-proxy")]
#[command(about = "Parameter-override proxy for Whisper-compatible STT servers", long_about = None)]
struct Args {
    /// Optional TOML file with the full proxy configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind the proxy to.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the proxy to.
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream STT server host.
    #[arg(long)]
    target_host: Option<String>,

    /// Upstream STT server port.
    #[arg(long)]
    target_port: Option<u16>,

    /// JSON document with the fields to force on transcription requests.
    #[arg(short, long, env = "STT_CONFIG_PATH")]
    rules: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let overrides = startup::Overrides {
        config_path: args.config,
        host: args.host,
        port: args.port,
        target_host: args.target_host,
        target_port: args.target_port,
        rules_path: args.rules,
    };

    let config = startup::resolve_config(&overrides)?;
    logging::init_logging(&config.observability);

    tracing::info!("stt-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let rules: OverrideRules = match stt_proxy::config::load_rules(Path::new(&config.rules.path)) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!(path = %config.rules.path, error = %e, "Cannot load override rules");
            return Err(e.into());
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        rules_path = %config.rules.path,
        connect_timeout_secs = config.timeouts.connect_secs,
        read_timeout_secs = config.timeouts.read_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config.clone(), rules)?;
    let listener = startup::bind(&config).await?;

    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
