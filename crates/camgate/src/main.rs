use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use camconf::CamConfig;
use camgate::device::sim::SimulatedCamera;
use camgate::device::DeviceDiscovery;
use camgate::gateway::{Gateway, GatewayConfig};
use camgate::session::SessionManager;
use camgate::{telemetry, web};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// In-memory camera, no hardware required
    Sim,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (replaces ./camgate.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Where downloaded media is written
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    #[arg(long, value_enum, default_value = "sim")]
    backend: Backend,

    /// Serial number reported by the simulated camera
    #[arg(long, default_value = "SIM0000001")]
    sim_serial: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = CamConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.infra.bind.http_host = host;
    }
    if let Some(port) = cli.port {
        config.infra.bind.http_port = port;
    }
    if let Some(save_dir) = cli.save_dir {
        config.infra.paths.save_dir = save_dir;
    }

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    telemetry::init(
        &config.infra.telemetry.otlp_endpoint,
        &config.infra.telemetry.log_level,
    )
    .context("Failed to initialize telemetry")?;

    for file in &sources.files {
        tracing::info!(file = %file.display(), "loaded config");
    }
    for var in &sources.env_overrides {
        tracing::debug!(var = %var, "config overridden from environment");
    }

    let gateway_config =
        GatewayConfig::from_config(&config).context("Invalid bootstrap defaults")?;
    std::fs::create_dir_all(&gateway_config.save_dir).with_context(|| {
        format!(
            "Failed to create save directory {}",
            gateway_config.save_dir.display()
        )
    })?;
    tracing::info!(save_dir = %gateway_config.save_dir.display(), "media directory ready");

    let discovery: Arc<dyn DeviceDiscovery> = match cli.backend {
        Backend::Sim => {
            tracing::info!(serial = %cli.sim_serial, "using simulated camera backend");
            Arc::new(SimulatedCamera::new(cli.sim_serial))
        }
    };

    let session = Arc::new(SessionManager::new(discovery));
    let shutdown_token = CancellationToken::new();

    let mut transitions = session.subscribe();
    let transitions_ct = shutdown_token.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = transitions.recv() => match event {
                    Ok(t) => tracing::info!(from = %t.from, to = %t.to, "camera session state changed"),
                    Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "missed session transitions"),
                    Err(RecvError::Closed) => break,
                },
                _ = transitions_ct.cancelled() => break,
            }
        }
    });

    // A missing camera is not fatal: the reconnect endpoint retries.
    if let Err(e) = session.open().await {
        tracing::warn!(error = %e, "camera not available at startup, continuing");
    }

    let gateway = Arc::new(Gateway::new(session.clone(), gateway_config));
    let app_router = web::router(gateway);

    let addr = format!(
        "{}:{}",
        config.infra.bind.http_host, config.infra.bind.http_port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("camgate listening on http://{}/api/v1", addr);

    let shutdown_token_srv = shutdown_token.clone();
    let server = axum::serve(listener, app_router).with_graceful_shutdown(async move {
        shutdown_token_srv.cancelled().await;
        tracing::info!("Server shutdown signal received");
    });

    tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("Server shutdown with error: {:?}", e);
        }
    });

    // Handle both SIGINT (Ctrl+C) and SIGTERM (systemd)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate() => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
    shutdown_token.cancel();

    session.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to set up SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
