use super::types::{ResponseEnvelope, ServiceInfo};
use crate::{
    Error, Result,
    ingest::{Pipeline, UploadRequest, UploadedFile},
};
use axum::{
    Json,
    extract::{
        Multipart, State, multipart::MultipartRejection, rejection::JsonRejection,
    },
    http::StatusCode,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

const DATA_FIELD: &str = "data";
const FILES_FIELD: &str = "dicom";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub model_name: Arc<str>,
    pub api_version: &'static str,
}

pub async fn dicom_files(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ResponseEnvelope {
    let started = Instant::now();
    let span = info_span!("dicom_files", request_id = %Uuid::new_v4());

    async move {
        info!("Request received at /dicom/files");

        let outcome = match multipart {
            Ok(multipart) => match read_upload(multipart).await {
                Ok(upload) => state.pipeline.process_upload(upload).await,
                Err(e) => Err(e),
            },
            Err(rejection) => Err(Error::validation(rejection.body_text())),
        };

        ResponseEnvelope::from_outcome(outcome, started)
    }
    .instrument(span)
    .await
}

pub async fn dicom_uri(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ResponseEnvelope {
    let started = Instant::now();
    let span = info_span!("dicom_uri", request_id = %Uuid::new_v4());

    async move {
        info!("Request received at /dicom/uri");

        let outcome = match body {
            Ok(Json(Value::Object(payload))) => state.pipeline.process_uri(payload).await,
            Ok(Json(_)) => Err(Error::validation("request body must be a JSON object")),
            Err(rejection) => Err(Error::validation(rejection.body_text())),
        };

        ResponseEnvelope::from_outcome(outcome, started)
    }
    .instrument(span)
    .await
}

pub async fn info(State(state): State<AppState>) -> ResponseEnvelope {
    info!("Request received at /info");

    let model_version = state.pipeline.model().version();
    if model_version.is_empty() {
        error!("Model '{}' does not report a version", state.model_name);
        return ResponseEnvelope::failure(StatusCode::BAD_REQUEST, "model version unavailable");
    }

    let info = ServiceInfo {
        api_version: state.api_version.to_string(),
        model_name: state.model_name.to_string(),
        model_version: model_version.to_string(),
    };

    match serde_json::to_value(info) {
        Ok(data) => ResponseEnvelope::success(data),
        Err(e) => ResponseEnvelope::failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// Reads the `data` field and every `dicom` part. Parts that cannot be read
/// are logged and skipped; other fields are ignored.
async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest> {
    let mut upload = UploadRequest::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if upload.data.is_none() && upload.files.is_empty() => {
                return Err(Error::validation(format!("malformed multipart body: {}", e)));
            }
            Err(e) => {
                warn!("Stopped reading multipart body early: {}", e);
                break;
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(DATA_FIELD) => {
                let text = field.text().await.map_err(|e| {
                    Error::validation(format!("unreadable '{}' field: {}", DATA_FIELD, e))
                })?;
                upload.data = Some(text);
            }
            Some(FILES_FIELD) => {
                let file_name = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(content) => upload.files.push(UploadedFile { file_name, content }),
                    Err(e) => warn!(
                        "Skipping unreadable upload {}: {}",
                        file_name.as_deref().unwrap_or("unnamed"),
                        e
                    ),
                }
            }
            other => debug!("Ignoring form field {:?}", other),
        }
    }

    Ok(upload)
}
