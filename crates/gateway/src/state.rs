use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use {buchi_device::DeviceLink, buchi_passes::PassStore};

use crate::shutdown::ShutdownHandle;

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub device: Arc<dyn DeviceLink>,
    pub passes: PassStore,
    pub file: SharedFile,
    pub shutdown: ShutdownHandle,
}

// ── Shared file ──────────────────────────────────────────────────────────────

/// The single file this service exists to hand over.
///
/// Metadata is read from the filesystem at request time, never cached;
/// the file on disk is the source of truth for its own size.
#[derive(Clone)]
pub struct SharedFile {
    path: Arc<PathBuf>,
}

impl SharedFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".into())
    }

    pub async fn info(&self) -> std::io::Result<FileInfo> {
        let meta = tokio::fs::metadata(self.path()).await?;
        Ok(FileInfo {
            name: self.name(),
            size: meta.len(),
            kind: mime_guess::from_path(self.path())
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        })
    }
}

/// Payload for `GET /api/fileinfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
}
