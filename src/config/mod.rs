mod types;

pub use types::*;

use crate::Result;
use std::env;
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(&config_path).await?;
    parse(&config_str)
}

pub fn parse(config_str: &str) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(config_str)?;

    if let Ok(name) = env::var("MODEL_NAME") {
        config.model.name = name;
    }

    if config.model.name.trim().is_empty() {
        return Err(crate::Error::config("model.name must not be empty"));
    }
    if config.model.timeout_secs == 0 {
        return Err(crate::Error::config("model.timeout_secs must be positive"));
    }

    Ok(config)
}
