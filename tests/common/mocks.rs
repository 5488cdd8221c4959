use dicom_serve::{
    Error, Result,
    model::{CancellationToken, ModelAdapter, Payload, Series},
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Mock model for testing
#[derive(Debug)]
pub struct MockModel {
    pub version: String,
    pub required: Vec<String>,
    pub calls: Mutex<Vec<Vec<PathBuf>>>,
    pub payloads: Mutex<Vec<Payload>>,
    pub delay: Option<Duration>,
    pub error: Option<String>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            version: "1.2.3".to_string(),
            required: Vec::new(),
            calls: Mutex::new(Vec::new()),
            payloads: Mutex::new(Vec::new()),
            delay: None,
            error: None,
        }
    }

    pub fn with_required(mut self, fields: &[&str]) -> Self {
        self.required = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn series_lengths(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().iter().flatten().cloned().collect()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelAdapter for MockModel {
    fn version(&self) -> &str {
        &self.version
    }

    fn required_fields(&self) -> &[String] {
        &self.required
    }

    fn run(
        &self,
        series: &Series,
        payload: &Payload,
        _cancel: &CancellationToken,
    ) -> Result<Value> {
        // Every path must be readable while the model runs.
        let sizes: Vec<u64> = series
            .iter()
            .map(|path| std::fs::metadata(path).map(|m| m.len()))
            .collect::<std::io::Result<_>>()
            .map_err(|e| Error::model(format!("series file missing: {}", e)))?;

        self.calls.lock().unwrap().push(series.paths().to_vec());
        self.payloads.lock().unwrap().push(payload.clone());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if let Some(ref error) = self.error {
            return Err(Error::model(error.clone()));
        }

        Ok(json!({
            "predictions": vec![0.5; series.len()],
            "sizes": sizes,
        }))
    }
}
