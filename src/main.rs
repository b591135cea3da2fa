//! camille: HTTP/1.1 server front end
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                   camille                     │
//!                        │                                               │
//!     Client ────────────┼─▶ Acceptor (context 0)                        │
//!                        │       │ round-robin                           │
//!                        │       ▼                                       │
//!                        │  ┌──────────┐ ┌──────────┐     ┌──────────┐   │
//!                        │  │ worker 0 │ │ worker 1 │ ... │ worker N │   │
//!                        │  │ sessions │ │ sessions │     │ sessions │   │
//!                        │  └────┬─────┘ └────┬─────┘     └────┬─────┘   │
//!                        │       ▼            ▼                ▼         │
//!                        │    RequestParser → Handler → response bytes   │
//!                        └──────────────────────────────────────────────┘
//! ```
//!
//! Serves the built-in echo handler on the configured address until SIGINT
//! or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use camille::config::{load_config, validate_config, ConfigError, ServerConfig};
use camille::http::{Echo, HttpServer};
use camille::lifecycle::signals;
use camille::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "camille")]
#[command(version, about = "HTTP/1.1 server front end", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CAMILLE_CONFIG")]
    config: Option<PathBuf>,

    /// Host or IP address to bind
    #[arg(long, env = "CAMILLE_HOST")]
    host: Option<String>,

    /// TCP port to bind
    #[arg(short, long, env = "CAMILLE_PORT")]
    port: Option<u16>,

    /// Worker threads (0 = one per hardware thread)
    #[arg(short, long, env = "CAMILLE_WORKERS")]
    workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CAMILLE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.listener.host = host;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(workers) = self.workers {
            config.pool.workers = workers;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!("camille v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(error) = metrics::init_metrics(addr) {
                    tracing::error!(%error, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = Arc::new(HttpServer::bind(config, Echo)?);
    server.run()?;
    tracing::info!(address = %server.local_addr(), "Listening for connections");

    let signal_runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let watcher = Arc::clone(&server);
    std::thread::Builder::new()
        .name("camille-signals".into())
        .spawn(move || {
            signal_runtime.block_on(signals::wait_for_shutdown());
            watcher.stop();
        })?;

    server.wait();
    tracing::info!("Shutdown complete");
    Ok(())
}
