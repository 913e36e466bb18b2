//! Prometheus exporter plugin demo for MAD.

use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use mad_exporter_prometheus::http::host_app;
use mad_exporter_prometheus::{
    ExporterConfig, ExporterPlugin, HostServices, HttpServer, demo,
};

/// Prometheus exporter plugin for MAD.
#[derive(Parser, Debug)]
#[command(name = "mad-exporter-prometheus")]
#[command(about = "Export MAD pokestop, quest and device metrics for Prometheus")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        // Without a config file the demo runs with the plugin enabled; the
        // plain default keeps the plugin inactive, matching embedded use.
        let mut demo_config = ExporterConfig::default();
        demo_config.plugin.active = true;
        demo_config
    };

    // Override listen address from CLI
    if let Some(listen) = args.listen {
        config.http.listen = listen;
    }

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("mad_exporter_prometheus={}", log_level).parse()?)
        .add_directive(format!("mad_host={}", log_level).parse()?);

    match config.logging.format {
        mad_exporter_prometheus::config::LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        mad_exporter_prometheus::config::LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!("Starting MAD Prometheus exporter demo");

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Seeded in-memory host standing in for a running MAD instance
    let host = demo::seed_host();
    let services = HostServices::for_host(host.clone());

    // Parse listen address
    let listen_addr = config
        .http
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Mount the plugin onto the host application
    let plugin = ExporterPlugin::new(config.plugin.clone(), services);
    let stats = plugin.stats_handle();
    let app = plugin.mount(host_app());

    // Start demo churn task
    let churn_shutdown = shutdown_rx.clone();
    let churn_task = tokio::spawn(demo::churn(host, Duration::from_secs(2), churn_shutdown));

    // Start HTTP server
    let http_server = HttpServer::new(app, listen_addr);
    let http_shutdown = shutdown_rx.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(http_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).unwrap();
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for tasks to complete
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = http_task.await;
        let _ = churn_task.await;
    })
    .await;

    // Print final stats
    let final_stats = stats.read().clone();
    info!(
        scrapes = final_stats.scrapes,
        groups_skipped = final_stats.groups_skipped,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
