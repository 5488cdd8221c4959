use crate::{Error, Result, config::ArchiveConfig, model::Series};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

const ARCHIVE_FILE: &str = "archive.zip";
const EXTRACT_DIR: &str = "extracted";

#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Downloads the archive at `uri` into `workspace`, extracts it and
    /// returns the directory holding the extracted files.
    async fn fetch(&self, uri: &str, workspace: &Path) -> Result<PathBuf>;
}

/// Fetches zip archives over HTTP(S).
pub struct HttpArchiveFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    limits: ExtractLimits,
}

/// Bounds applied while unpacking an archive.
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    pub max_entries: usize,
    /// Total uncompressed bytes across all entries.
    pub max_bytes: u64,
}

impl From<&ArchiveConfig> for ExtractLimits {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            max_bytes: config.max_extracted_bytes,
        }
    }
}

impl HttpArchiveFetcher {
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            max_bytes: config.max_bytes,
            limits: ExtractLimits::from(config),
        })
    }

    async fn download(&self, uri: &str, target: &Path) -> Result<u64> {
        let url = reqwest::Url::parse(uri)
            .map_err(|e| Error::transport(format!("invalid archive uri '{}': {}", uri, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::transport(format!(
                "unsupported archive uri scheme '{}'",
                url.scheme()
            )));
        }

        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(format!(
                "archive download from {} failed with HTTP {}",
                uri, status
            )));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(self.too_large(uri));
            }
        }

        let mut file = tokio::fs::File::create(target).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(self.too_large(uri));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(written)
    }

    fn too_large(&self, uri: &str) -> Error {
        Error::transport(format!(
            "archive at {} exceeds the {} byte limit",
            uri, self.max_bytes
        ))
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch(&self, uri: &str, workspace: &Path) -> Result<PathBuf> {
        let archive_path = workspace.join(ARCHIVE_FILE);
        let extract_dir = workspace.join(EXTRACT_DIR);

        let size = self.download(uri, &archive_path).await?;
        info!("Downloaded archive from {} ({} bytes)", uri, size);

        let limits = self.limits;
        let target = extract_dir.clone();
        tokio::task::spawn_blocking(move || extract_zip(&archive_path, &target, limits))
            .await
            .map_err(|e| Error::internal(format!("archive extraction task failed: {}", e)))??;

        Ok(extract_dir)
    }
}

/// Extracts a zip archive into `dest`, refusing entries that would land
/// outside of it. Anything wrong with the archive itself is reported as a
/// transport failure.
pub fn extract_zip(archive: &Path, dest: &Path, limits: ExtractLimits) -> Result<()> {
    let mut zip = zip::ZipArchive::new(BufReader::new(File::open(archive)?))?;
    if zip.len() > limits.max_entries {
        return Err(Error::transport(format!(
            "archive holds {} entries, limit is {}",
            zip.len(),
            limits.max_entries
        )));
    }

    std::fs::create_dir_all(dest)?;
    let mut remaining = limits.max_bytes;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let name = entry.name().to_string();
        let relative = entry.enclosed_name().ok_or_else(|| {
            Error::transport(format!(
                "archive entry '{}' escapes the extraction directory",
                name
            ))
        })?;
        let target = dest.join(relative);
        let failed = |e: std::io::Error| {
            Error::transport(format!("failed to extract '{}': {}", name, e))
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(failed)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(failed)?;
        }
        let mut out = File::create(&target).map_err(failed)?;
        let written =
            std::io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut out)
                .map_err(failed)?;
        if written > remaining {
            return Err(Error::transport(format!(
                "archive expands beyond the {} byte limit",
                limits.max_bytes
            )));
        }
        remaining -= written;
    }

    debug!(
        "Extracted {} archive entries ({} bytes) into {}",
        zip.len(),
        limits.max_bytes - remaining,
        dest.display()
    );
    Ok(())
}

/// Collects every regular file below `root`, ordered by path.
pub fn walk_series(root: &Path) -> Result<Series> {
    let mut series = Series::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
    for entry in walker {
        let entry = entry
            .map_err(|e| Error::transport(format!("failed to walk extracted archive: {}", e)))?;
        if entry.file_type().is_file() {
            series.push(entry.into_path());
        }
    }

    Ok(series)
}

fn is_hidden(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "__MACOSX"
}
