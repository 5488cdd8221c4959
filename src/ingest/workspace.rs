use crate::{Result, model::Series};
use axum::body::Bytes;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

/// One uploaded input file, still held in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content: Bytes,
}

/// Directory owning everything materialized for a single request.
///
/// The directory has a random name under the configured work root and is
/// removed, with all of its contents, when the workspace is dropped.
pub struct RequestWorkspace {
    dir: TempDir,
}

impl RequestWorkspace {
    pub fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("dicom-serve-")
            .tempdir_in(root)?;
        debug!("Created request workspace: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes each upload to its own file and returns the paths that were
    /// written. A file that cannot be written is logged and skipped.
    pub async fn persist_uploads(&self, files: Vec<UploadedFile>) -> Series {
        let mut series = Series::default();

        for (index, file) in files.into_iter().enumerate() {
            let path = self.path().join(format!("{:04}.dcm", index));
            match tokio::fs::write(&path, &file.content).await {
                Ok(()) => series.push(path),
                Err(e) => {
                    warn!(
                        "Failed to persist upload {} ({}): {}",
                        index,
                        file.file_name.as_deref().unwrap_or("unnamed"),
                        e
                    );
                    let _ = tokio::fs::remove_file(&path).await;
                }
            }
        }

        debug!("Persisted {} uploaded files", series.len());
        series
    }
}

impl Drop for RequestWorkspace {
    fn drop(&mut self) {
        debug!("Releasing request workspace: {}", self.dir.path().display());
    }
}
