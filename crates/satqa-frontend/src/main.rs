mod api;
mod error;
mod inspector_client;
mod middleware;
mod render;
mod upload;

use std::sync::Arc;
use std::time::Duration;

use satqa_gcp::{GcsClient, TokenSource};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use crate::inspector_client::InspectorClient;
use crate::upload::UploadPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = satqa_core::load_frontend_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let metadata_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let tokens = TokenSource::from_config(config.access_token.as_deref(), &metadata_http)?;
    let storage = GcsClient::with_base_url(
        tokens,
        &config.bucket,
        config.http_timeout_secs,
        &config.storage_endpoint,
    )?;
    let inspector = InspectorClient::new(&config.inspector_url, config.http_timeout_secs)?;

    tracing::info!(
        env = %config.env,
        bind_addr = %config.bind_addr,
        bucket = %config.bucket,
        inspector = %inspector.analyze_url(),
        "starting upload front-end"
    );

    let pipeline = UploadPipeline::new(storage, inspector, &config.upload_prefix);
    let app = build_app(
        AppState {
            pipeline: Arc::new(pipeline),
        },
        config.max_upload_bytes,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
