pub mod handlers;
mod types;

pub use types::{ResponseEnvelope, ServiceInfo, format_runtime};

use crate::{
    Result,
    config::Config,
    ingest::{HttpArchiveFetcher, Pipeline},
    model::ModelRegistry,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use handlers::AppState;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the shared handler state: binds the configured model and the
/// archive fetcher. Fails if the model name is not registered.
pub fn build_state(config: &Config, registry: &ModelRegistry) -> Result<AppState> {
    let model = registry.build(&config.model.name, &config.model.args)?;
    let fetcher = Arc::new(HttpArchiveFetcher::new(&config.archive)?);

    let mut pipeline = Pipeline::new(
        model,
        fetcher,
        config.pipeline.work_root(),
        config.model.timeout(),
    );
    if config.pipeline.memory_diagnostics {
        pipeline = pipeline.with_memory_diagnostics();
    }

    Ok(AppState {
        pipeline,
        model_name: Arc::from(config.model.name.as_str()),
        api_version: API_VERSION,
    })
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/dicom/files", post(handlers::dicom_files))
        // Legacy alias of /dicom/files
        .route("/serve", post(handlers::dicom_files))
        .route("/dicom/uri", post(handlers::dicom_uri))
        .route("/info", get(handlers::info))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config, registry: ModelRegistry) -> Result<()> {
    let app_state = build_state(&config, &registry)?;
    let app = router(app_state, config.server.max_upload_bytes);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!(
        "Starting server on {} with model '{}'",
        addr, config.model.name
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
