//! Entry point for the geotally HTTP server.

use std::sync::Arc;

use clap::Parser;
use geotally_core::GeoTallyService;
use geotally_provider_factual as factual;
use geotally_provider_instagram::{self as instagram, InstagramCredentials};
use geotally_server::config::{CliArgs, ServerConfig};
use geotally_server::telemetry::init_telemetry;
use geotally_server::{AppState, router};
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments use the environment.
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry()?;

    // HTTP + service setup
    let client = Client::builder()
        .user_agent(concat!("geotally/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let places = factual::places_port(client.clone(), &config.factual_base_url, &config.factual_key);
    let photos = instagram::photos_port(
        client,
        &config.instagram_base_url,
        InstagramCredentials {
            client_id: config.instagram_client_id.clone(),
            access_token: config.instagram_access_token.clone(),
        },
    );
    let service = Arc::new(GeoTallyService::new(places, photos, config.pipeline));

    let listener = TcpListener::bind(&config.server_addr).await?;
    info!(
        addr = %config.server_addr,
        places_row_cap = ?config.pipeline.places_row_cap,
        photos_concurrency = config.pipeline.photos_concurrency,
        "geotally listening"
    );

    axum::serve(listener, router(AppState::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("geotally shut down");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}
