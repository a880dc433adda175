//! CLI entry point for the DataMall gateway.
//!
//! `serve` runs the REST API; `fetch` pulls a single transit dataset through
//! the same client, which is handy for checking which datasets the configured
//! account key is subscribed to.

use anyhow::Result;
use clap::{Parser, Subcommand};
use datamall_gateway::{
    api::AppState,
    config::{Config, DatamallConfig},
    infra::datamall::DatamallClient,
    server,
    services::{Dataset, Query, TransitSource, Upstream},
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "datamall-gateway")]
#[command(
    about = "REST gateway for transit open data, feedback and user accounts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
        bind: String,
    },
    /// Pull one transit dataset and report what came back
    Fetch {
        #[arg(value_enum)]
        dataset: Dataset,

        /// Bus stop code, train line or geospatial id, for keyed datasets
        #[arg(short, long)]
        param: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/datamall_gateway.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("datamall_gateway.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => {
            let config = Config::from_env()?;
            let state = AppState::from_config(&config)?;
            server::run(&bind, state).await?;
        }
        Commands::Fetch { dataset, param } => {
            let query = Query::new(dataset, param.as_deref())?;
            let client = DatamallClient::from_config(&DatamallConfig::from_env()?)?;

            match client.fetch(&query).await {
                Upstream::Available(records) => {
                    info!(%dataset, count = records.len(), "Dataset fetched");
                }
                Upstream::Unavailable(cause) => {
                    warn!(%dataset, cause = %cause, "Dataset unavailable");
                }
            }
        }
    }

    Ok(())
}
