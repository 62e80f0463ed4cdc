use std::path::{Path, PathBuf};

use anyhow::Context as _;
use uuid::Uuid;

use crate::error::PatientsServiceError;

const DOCUMENTS_DIR: &str = "documents";

/// Document photos on local disk, under `<root>/documents/`.
///
/// Stored paths are relative to `root` and always use `/`, e.g.
/// `documents/0190....jpg`.
#[derive(Debug, Clone)]
pub struct LocalPhotoStorage {
    root: PathBuf,
}

impl LocalPhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        let dir = self.root.join(DOCUMENTS_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create uploads directory {}", dir.display()))
    }

    /// Write the photo under a fresh name and return its relative path.
    pub async fn store_document(&self, bytes: &[u8]) -> Result<String, PatientsServiceError> {
        self.ensure_dirs().await?;
        let relative = format!("{DOCUMENTS_DIR}/{}.jpg", Uuid::now_v7());
        let path = self.root.join(&relative);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write document photo {}", path.display()))?;
        Ok(relative)
    }

    /// Best-effort delete; a missing file or an I/O error is only logged.
    pub async fn remove(&self, relative: &str) {
        let path = self.root.join(relative);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed document photo"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove document photo"
            ),
        }
    }
}

/// Public URL of a stored photo (served under `/uploads`).
pub fn document_photo_url(relative: &str) -> String {
    let file_name = relative
        .replace('\\', "/")
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_owned();
    format!("/uploads/{DOCUMENTS_DIR}/{file_name}")
}
