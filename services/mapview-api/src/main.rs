//! MapView API server binary.

use anyhow::Result;
use axum::extract::Extension;
use clap::Parser;
use std::{env, net::SocketAddr, sync::Arc, time::Duration};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mapview_api::download;
use mapview_api::layers::InMemoryLayerStore;
use mapview_api::renderer::PlaceholderRenderer;
use mapview_api::state::{AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "mapview-api")]
#[command(about = "OGC WMS/WMTS/WFS + permalink server for a live map view")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8089")]
    listen: String,

    /// External base URL advertised in capabilities documents
    #[arg(long, default_value = "http://localhost:8089")]
    base_url: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Upper bound on one render call, in seconds
    #[arg(long, default_value_t = 30)]
    render_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    info!("Starting MapView API server");

    let config = ServerConfig {
        base_url: args.base_url.clone(),
        render_timeout: Duration::from_secs(args.render_timeout),
        ..Default::default()
    };

    // The standalone binary runs against the placeholder backend and a
    // sample project; a host application injects its own implementations.
    let state = Arc::new(AppState::new(
        config,
        Arc::new(PlaceholderRenderer),
        Arc::new(InMemoryLayerStore::with_sample_data()),
    ));

    // Optional companion asset, fetched off the render path
    if let Ok(url) = env::var("COMPANION_ASSET_URL") {
        let dest = env::temp_dir().join("mapview-companion.bin");
        info!(url = %url, dest = %dest.display(), "fetching companion asset in background");
        let mut handle = download::spawn_fetch(url, dest);
        tokio::spawn(async move {
            let outcome = handle.wait().await;
            info!(?outcome, "companion asset fetch finished");
        });
    }

    let app = mapview_api::build_router(state).layer(Extension(prometheus_handle));

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
