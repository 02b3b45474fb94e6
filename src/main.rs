//! CLI entry point for the bus bunching monitor.
//!
//! `serve` polls a vehicle-position feed on a fixed interval and exposes the
//! latest buses and bunching alerts over HTTP. `analyze` runs a single pass
//! over a file or URL and prints the result.

use anyhow::Result;
use bus_bunching::{
    config::Settings,
    detect::DEFAULT_THRESHOLD_KM,
    output::{log_alerts, print_json, print_pretty},
    refresh::Refresher,
    server,
    source::source_from,
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bus_bunching")]
#[command(about = "Detects bunched buses in a GTFS-RT vehicle position feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the feed continuously and serve buses and alerts over HTTP
    Serve(Settings),
    /// Run a single detection pass over a feed file or URL
    Analyze {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Pairs on the same route closer than this are bunched
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD_KM)]
        threshold_km: f64,

        /// API key sent as `Authorization: apikey <key>`
        #[arg(long, env = "TFN_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Give up on the fetch after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bus_bunching.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bus_bunching.log"));

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
        Commands::Serve(settings) => serve(settings).await?,
        Commands::Analyze {
            source,
            threshold_km,
            api_key,
            timeout_secs,
        } => {
            let timeout = Duration::from_secs(timeout_secs);
            let api_key = api_key.as_deref().filter(|k| !k.trim().is_empty());
            let source = source_from(&source, api_key, timeout)?;

            let output = Refresher::new(source, threshold_km, timeout).tick().await?;

            print_pretty(&output);
            log_alerts(&output);
            print_json(&output)?;
        }
    }

    Ok(())
}

/// Runs the refresh loop and the HTTP API side by side until Ctrl+C.
#[tracing::instrument(
    skip(settings),
    fields(feed = %settings.feed_url, addr = %settings.listen_addr())
)]
async fn serve(settings: Settings) -> Result<()> {
    settings.validate()?;

    let source = source_from(&settings.feed_url, settings.api_key(), settings.fetch_timeout())?;
    if settings.api_key().is_none() && settings.feed_url.starts_with("http") {
        info!("No API key configured, requesting feed anonymously");
    }

    let refresher = Refresher::new(source, settings.threshold_km, settings.fetch_timeout());
    let view = refresher.subscribe();

    let (stop_tx, stop_rx) = watch::channel(false);

    let mut refresh_task =
        tokio::spawn(refresher.run(settings.interval(), stopped(stop_rx.clone())));
    let mut server_task =
        tokio::spawn(server::serve(settings.listen_addr(), view, stopped(stop_rx)));

    info!("Running. Press Ctrl+C to stop.");

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Shutdown requested");
            let _ = stop_tx.send(true);
            if let Err(e) = refresh_task.await {
                error!(error = %e, "Refresh loop panicked");
            }
            match server_task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "HTTP API failed during shutdown"),
                Err(e) => error!(error = %e, "HTTP API task panicked"),
            }
        }
        res = &mut refresh_task => {
            // The loop only returns early if it panicked.
            let _ = stop_tx.send(true);
            if let Ok(Err(e)) = server_task.await {
                error!(error = %e, "HTTP API failed during shutdown");
            }
            match res {
                Ok(()) => anyhow::bail!("refresh loop exited unexpectedly"),
                Err(e) => return Err(anyhow::Error::new(e).context("refresh loop panicked")),
            }
        }
        res = &mut server_task => {
            // The server only returns on its own if it failed to bind or crashed.
            let _ = stop_tx.send(true);
            if let Err(e) = refresh_task.await {
                error!(error = %e, "Refresh loop panicked");
            }
            match res {
                Ok(Ok(())) => anyhow::bail!("HTTP API exited unexpectedly"),
                Ok(Err(e)) => return Err(anyhow::Error::new(e).context("HTTP API failed")),
                Err(e) => return Err(anyhow::Error::new(e).context("HTTP API task panicked")),
            }
        }
    }

    info!("Stopped");
    Ok(())
}

/// Resolves once `rx` flips to `true` or its sender is gone.
async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
