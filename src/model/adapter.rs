use crate::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Parsed JSON request payload handed to the model alongside the series.
pub type Payload = serde_json::Map<String, Value>;

/// Ordered local paths of the input files belonging to one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    paths: Vec<PathBuf>,
}

impl Series {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

/// A servable prediction model.
///
/// One instance is built at startup and shared by every in-flight request,
/// so `run` must be safe to call concurrently. `run` is allowed to block for
/// a long time; callers are expected to move it off the async executor.
/// Once `cancel` fires nobody is waiting for the result, and the adapter
/// should stop and release whatever it started.
pub trait ModelAdapter: Send + Sync {
    fn version(&self) -> &str;

    /// Top-level (or dotted) payload fields that must be present and non-empty.
    fn required_fields(&self) -> &[String];

    fn run(
        &self,
        series: &Series,
        payload: &Payload,
        cancel: &CancellationToken,
    ) -> Result<Value>;
}
