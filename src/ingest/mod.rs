mod archive;
mod validator;
mod workspace;

pub use archive::{ArchiveFetcher, ExtractLimits, HttpArchiveFetcher, extract_zip, walk_series};
pub use validator::validate;
pub use workspace::{RequestWorkspace, UploadedFile};

use crate::{
    Error, Result,
    diagnostics::MemoryProbe,
    model::{CancellationToken, ModelAdapter, Payload, Series},
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const URI_FIELD: &str = "uri";

/// Raw parts of an upload request, as read from the multipart body.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// JSON payload string from the `data` form field.
    pub data: Option<String>,
    pub files: Vec<UploadedFile>,
}

/// Validate, materialize, invoke. Shared by every request.
#[derive(Clone)]
pub struct Pipeline {
    model: Arc<dyn ModelAdapter>,
    fetcher: Arc<dyn ArchiveFetcher>,
    work_root: PathBuf,
    model_timeout: Duration,
    memory: Option<Arc<MemoryProbe>>,
}

impl Pipeline {
    pub fn new(
        model: Arc<dyn ModelAdapter>,
        fetcher: Arc<dyn ArchiveFetcher>,
        work_root: PathBuf,
        model_timeout: Duration,
    ) -> Self {
        Self {
            model,
            fetcher,
            work_root,
            model_timeout,
            memory: None,
        }
    }

    pub fn with_memory_diagnostics(mut self) -> Self {
        self.memory = Some(Arc::new(MemoryProbe::new()));
        self
    }

    pub fn model(&self) -> &Arc<dyn ModelAdapter> {
        &self.model
    }

    pub async fn process_upload(&self, upload: UploadRequest) -> Result<Value> {
        let payload = parse_payload(upload.data.as_deref())?;
        debug!("Received JSON payload: {:?}", payload);
        validate(&payload, self.model.required_fields())?;

        debug!("Received {} files", upload.files.len());
        let workspace = RequestWorkspace::create(&self.work_root)?;
        let series = workspace.persist_uploads(upload.files).await;

        self.invoke(series, payload).await
    }

    pub async fn process_uri(&self, payload: Payload) -> Result<Value> {
        debug!("Received JSON payload: {:?}", payload);
        let mut required = vec![URI_FIELD.to_string()];
        required.extend(self.model.required_fields().iter().cloned());
        validate(&payload, required.as_slice())?;

        let uri = payload
            .get(URI_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("field 'uri' must be a string"))?
            .to_string();

        let workspace = RequestWorkspace::create(&self.work_root)?;
        let extracted = self.fetcher.fetch(&uri, workspace.path()).await?;
        let series = walk_series(&extracted)?;
        debug!("Archive yielded {} files", series.len());

        self.invoke(series, payload).await
    }

    /// Runs the model on the blocking pool under the configured timeout.
    /// The model is told to stop when the timeout fires or when this future
    /// is dropped, whichever comes first.
    async fn invoke(&self, series: Series, payload: Payload) -> Result<Value> {
        if series.is_empty() {
            return Err(Error::materialization(
                "no input files could be materialized",
            ));
        }

        let before = self.memory.as_ref().and_then(|probe| probe.sample());

        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let model = Arc::clone(&self.model);
        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || model.run(&series, &payload, &token));
        let outcome = match tokio::time::timeout(self.model_timeout, task).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(e @ Error::ModelInvocation(_)))) => Err(e),
            Ok(Ok(Err(e))) => Err(Error::model(e.to_string())),
            Ok(Err(join_error)) => Err(Error::internal(format!(
                "model task failed: {}",
                join_error
            ))),
            Err(_) => {
                cancel.cancel();
                Err(Error::ModelTimeout {
                    timeout: self.model_timeout,
                })
            }
        };

        if let Some(ref probe) = self.memory {
            probe.record(before);
        }

        outcome
    }
}

/// Parses the `data` form field into a JSON object.
pub fn parse_payload(data: Option<&str>) -> Result<Payload> {
    let data = data.ok_or_else(|| Error::validation("missing 'data' form field"))?;
    match serde_json::from_str(data) {
        Ok(Value::Object(payload)) => Ok(payload),
        Ok(_) => Err(Error::validation("'data' must be a JSON object")),
        Err(e) => Err(Error::validation(format!("'data' is not valid JSON: {}", e))),
    }
}
