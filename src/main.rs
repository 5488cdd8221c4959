use anyhow::Result;
use dicom_serve::{config, model::ModelRegistry, server};
use tracing::info;

/// Rejects filter strings that are not a plain tracing level.
fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Config decides the log level, so it is read before tracing exists.
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over `server.logs.level`.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.server.logs.level.clone());

    if let Err(e) = validate_log_level(&log_level) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(&log_level)?)
        .json()
        .init();

    info!(
        "dicom-serve {} starting (model: {}, log level: {})",
        server::API_VERSION,
        config.model.name,
        log_level
    );

    // An unknown model name aborts startup here.
    server::run(config, ModelRegistry::with_builtin_models()).await?;

    Ok(())
}
