use crate::Result;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::error;

/// Uniform body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub data: Option<Value>,
    pub message: Option<String>,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub api_version: String,
    pub model_name: String,
    pub model_version: String,
}

impl ResponseEnvelope {
    pub fn success(data: Value) -> Self {
        Self {
            data: Some(data),
            message: None,
            status_code: StatusCode::OK.as_u16(),
            runtime: None,
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            status_code: status.as_u16(),
            runtime: None,
        }
    }

    /// Builds the envelope for a finished ingestion request and stamps the
    /// handler's wall-clock runtime.
    pub fn from_outcome(outcome: Result<Value>, started: Instant) -> Self {
        let envelope = match outcome {
            Ok(data) => Self::success(data),
            Err(e) => {
                let message = e.envelope_message();
                error!("{}", message);
                Self::failure(e.status_code(), message)
            }
        };
        envelope.with_runtime(started.elapsed())
    }

    pub fn with_runtime(mut self, elapsed: Duration) -> Self {
        self.runtime = Some(format_runtime(elapsed));
        self
    }
}

pub fn format_runtime(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
