mod config;
mod html;
mod present;
mod server;

use clap::{Parser, Subcommand};
use config::Config;
use server::run_server;
use slidepost_core::{ContentStore, ExpirySweeper};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "slidepost")]
#[command(about = "Upload slide decks and share them for a limited time")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Server {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Run a single expiry sweep and exit
    Sweep {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Create the storage layout
    Init {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slidepost=info,slidepost_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server { config } => {
            tracing::info!("Starting Slidepost server with config: {}", config);
            let cfg = load_config(&config);

            if let Err(e) = run_server(cfg, shutdown_token()).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Sweep { config } => {
            let cfg = load_config(&config);
            let options = match cfg.to_service_options() {
                Ok(options) => options,
                Err(e) => {
                    tracing::error!("Invalid config: {}", e);
                    std::process::exit(1);
                }
            };

            let store = match ContentStore::new(&options.storage_root, options.quota_accounting) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::error!("Failed to open storage: {}", e);
                    std::process::exit(1);
                }
            };

            match ExpirySweeper::from_options(store, &options).sweep().await {
                Ok(report) => tracing::info!(
                    "Sweep finished: scanned {}, removed {}, failed {}",
                    report.scanned,
                    report.removed,
                    report.failed
                ),
                Err(e) => {
                    tracing::error!("Sweep failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Init { config } => {
            tracing::info!("Initializing Slidepost storage with config: {}", config);
            let cfg = load_config(&config);

            let root = match cfg.storage_root() {
                Ok(root) => root,
                Err(e) => {
                    tracing::error!("Invalid config: {}", e);
                    std::process::exit(1);
                }
            };

            match ContentStore::new(&root, cfg.storage.quota_accounting) {
                Ok(store) => tracing::info!("Created directory: {:?}", store.slides_dir()),
                Err(e) => {
                    tracing::error!("Failed to create storage under {:?}: {}", root, e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn load_config(path: &str) -> Config {
    match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

/// Cancelled on Ctrl+C or SIGTERM.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();

    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl+C received, shutting down");
                token.cancel();
            }
        });
    }

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let token = token.clone();
        tokio::spawn(async move {
            if let Ok(mut term) = signal(SignalKind::terminate()) {
                term.recv().await;
                tracing::info!("SIGTERM received, shutting down");
                token.cancel();
            }
        });
    }

    token
}
