use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hookscan::api;
use hookscan::config;
use hookscan::errors::HookscanError;

#[derive(Parser)]
#[command(name = "hookscan", version, about = "Webhook-driven Semgrep scanning service")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "hookscan.yaml")]
    config: PathBuf,

    /// Override the configured listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable ANSI colors in log output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            HookscanError::Config(_) => 2,
            HookscanError::Io(_) => 3,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<(), HookscanError> {
    let mut config = config::parse_config(&cli.config).await?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    let config = Arc::new(config);

    let state = api::create_app_state(config.clone())?;

    // Crash recovery: anything in the workspace root older than the maximum
    // request duration belongs to a dead process.
    match state.workspaces.sweep_stale(config.request_timeout()).await {
        Ok(0) => {}
        Ok(removed) => info!(removed, "Swept stale workspaces from previous run"),
        Err(e) => warn!(error = %e, "Stale workspace sweep failed"),
    }

    let app = api::build_router(state);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "hookscan listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}
