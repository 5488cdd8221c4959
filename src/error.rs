use axum::http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model '{name}' not found in model registry (available: {available})")]
    UnknownModel { name: String, available: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Materialization(String),

    #[error("{0}")]
    ModelInvocation(String),

    #[error("model invocation exceeded {timeout:?}")]
    ModelTimeout { timeout: std::time::Duration },

    #[error("{0}")]
    Transport(String),

    #[error("archive download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("archive extraction failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn materialization(msg: impl Into<String>) -> Self {
        Self::Materialization(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelInvocation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classification string reported in failure envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Yaml(_) | Self::AddrParse(_) => "ConfigError",
            Self::UnknownModel { .. } => "StartupError",
            Self::Validation(_) => "ValidationError",
            Self::Materialization(_) => "MaterializationError",
            Self::ModelInvocation(_) => "ModelInvocationError",
            Self::ModelTimeout { .. } => "ModelTimeoutError",
            Self::Transport(_) | Self::Download(_) | Self::Archive(_) => "TransportError",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IoError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Client-attributable failures are 400; everything else is a service fault.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Materialization(_)
            | Self::ModelInvocation(_)
            | Self::Transport(_)
            | Self::Download(_)
            | Self::Archive(_) => StatusCode::BAD_REQUEST,
            Self::ModelTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope_message(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        for err in [
            Error::validation("missing required field(s): patientId"),
            Error::materialization("no input files could be persisted"),
            Error::model("predictor exited with status 1"),
            Error::transport("HTTP 404 Not Found"),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{err:?}");
        }
    }

    #[test]
    fn test_service_faults_are_not_bad_request() {
        assert_eq!(
            Error::ModelTimeout {
                timeout: std::time::Duration::from_secs(5)
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            Error::internal("join failed").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_envelope_message_combines_kind_and_detail() {
        let err = Error::validation("missing required field(s): patientId");
        assert_eq!(
            err.envelope_message(),
            "ValidationError: missing required field(s): patientId"
        );

        let err = Error::ModelTimeout {
            timeout: std::time::Duration::from_secs(30),
        };
        assert_eq!(
            err.envelope_message(),
            "ModelTimeoutError: model invocation exceeded 30s"
        );
    }
}
