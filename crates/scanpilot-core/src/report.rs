use crate::error::ScanError;
use crate::providers::{ReportKind, ScannerApi};
use crate::request::Credentials;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where fetched reports end up.
pub trait ArtifactStore: Send + Sync {
    /// Store `content` under `name` and return where it was written.
    fn persist(&self, name: &str, content: &[u8]) -> Result<PathBuf>;
}

/// Writes artifacts into a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    dir: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn persist(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create report directory '{}'", self.dir.display())
        })?;
        let path = self.dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write report '{}'", path.display()))?;
        Ok(path)
    }
}

/// A report saved by the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportArtifact {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: usize,
}

/// Download the crawled XML report for `scan_id` and persist it.
pub async fn fetch_report<A, S>(
    api: &A,
    store: &S,
    scan_id: &str,
    credentials: &Credentials,
) -> Result<ReportArtifact, ScanError>
where
    A: ScannerApi + ?Sized,
    S: ArtifactStore + ?Sized,
{
    let kind = ReportKind::CRAWLED_XML;
    info!(scan_id, "Getting scan result...");

    let content = api
        .scan_report(scan_id, kind, credentials)
        .await
        .map_err(|e| ScanError::transport("Error occurred during scan result retrieval", e))?;

    let name = kind.artifact_name(scan_id);
    let path = store
        .persist(&name, &content)
        .map_err(|e| ScanError::transport("Error occurred while storing scan result", e))?;

    info!(path = %path.display(), bytes = content.len(), "Scan result saved");

    Ok(ReportArtifact {
        name,
        path,
        size_bytes: content.len(),
    })
}
