//! Chat Relay
//!
//! An HTTP front door that relays anonymous submissions into one group chat.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────────────┐
//!                     │                        CHAT RELAY                          │
//!                     │                                                            │
//!   POST /sendMessage │  ┌──────────┐   ┌───────────┐   ┌──────────────────────┐   │
//!   ──────────────────┼─▶│   http   │──▶│ admission │──▶│ relay service        │   │
//!                     │  │  server  │   │ (window)  │   │ validate, format     │   │
//!                     │  └──────────┘   └───────────┘   └─────┬──────────┬─────┘   │
//!                     │                                       │          │         │
//!                     │                          text task    ▼          ▼ image   │
//!                     │                              ┌──────────────┐ ┌─────────┐  │
//!                     │                              │ dispatch     │ │ uploads │  │
//!                     │                              │ queue+worker │ │ janitor │  │
//!                     │                              └──────┬───────┘ └─────────┘  │
//!                     │                                     ▼                      │
//!                     │  ┌──────────────┐          ┌──────────────────┐            │
//!                     │  │ credentials  │◀─────────│ courier (retry,  │────────────┼──▶ Feishu
//!                     │  │ single-flight│          │ deadline)        │            │    open API
//!                     │  └──────────────┘          └──────────────────┘            │
//!                     └───────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use chat_relay::config::{self, ConfigError, RelayConfig};
use chat_relay::lifecycle::{self, shutdown_signal};
use chat_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "chat-relay", version)]
#[command(about = "Relay anonymous submissions into a group chat", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults plus environment apply without one.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check_config: bool,
}

fn load(cli: &Cli) -> Result<RelayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_defaults()?,
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        config::validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("chat-relay: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if cli.check_config {
        println!("configuration OK");
        return ExitCode::SUCCESS;
    }

    logging::init(&config.observability);
    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "chat-relay exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chat-relay starting");
    tracing::info!(
        environment = ?config.environment,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );
    if config.platform.has_placeholder_credentials() {
        tracing::warn!("Platform credentials are placeholders; set APP_ID, APP_SECRET and OPEN_CHAT_ID");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                error = %e,
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let services = lifecycle::bootstrap(config).await?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    services.serve(listener, shutdown_signal()).await?;
    Ok(())
}
