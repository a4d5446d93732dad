use anyhow::Context;
use chargeplan_api::{AppState, Settings, SiteSnapshot, create_app};
use chargeplan_engine::HttpOptimizer;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Command line arguments for the chargeplan server
#[derive(Parser, Debug)]
#[command(name = "chargeplan")]
#[command(about = "Smart charging optimizer adapter")]
struct Args {
    /// Path to the settings TOML file
    #[arg(short, long, default_value = "config/chargeplan.toml")]
    config: PathBuf,

    /// Path to the site snapshot JSON file
    #[arg(short, long)]
    site: PathBuf,

    /// Port to bind the server to, overrides the settings
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().pretty().with_env_filter(filter).init();

    let mut settings = Settings::load(&args.config)
        .with_context(|| format!("Failed to load settings '{}'", args.config.display()))?;
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    let snapshot_content = tokio::fs::read_to_string(&args.site)
        .await
        .with_context(|| format!("Failed to read site file '{}'", args.site.display()))?;
    let snapshot: SiteSnapshot = serde_json::from_str(&snapshot_content)
        .with_context(|| format!("Failed to parse site file '{}'", args.site.display()))?;
    tracing::info!(
        "Loaded site {} with {} stations and {} sessions from {}",
        snapshot.site.id,
        snapshot.site.stations.len(),
        snapshot.transactions.len(),
        args.site.display()
    );

    let optimizer = HttpOptimizer::new(settings.optimizer.clone())?;
    let store = snapshot.into_store()?;
    let app = create_app(AppState::new(optimizer, store));

    let bind_addr = settings.server.socket_addr()?;
    tracing::info!("Starting server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
