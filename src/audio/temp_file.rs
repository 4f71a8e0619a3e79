//! # Temp File Management
//!
//! Uploads are written to a scoped working directory so the transcription
//! client can send them as a named file (the provider infers the audio
//! container from the extension).
//!
//! ## Lifecycle:
//! 1. **store**: write `<dir>/<uuid>.<ext>` and hand back a [`TempAudioFile`]
//! 2. **use**: the pipeline reads the file during transcription
//! 3. **release**: the guard deletes the file when dropped, on every exit path
//!
//! Release is idempotent and never fails; a deletion problem is logged and
//! swallowed so it can't replace the request's real outcome.

use crate::audio::validator::UploadedAudio;
use crate::error::{AppError, AppResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Writes uploads into the configured temp directory.
#[derive(Debug, Clone)]
pub struct TempFileManager {
    dir: PathBuf,
}

impl TempFileManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist the upload under a unique name, keeping its extension.
    pub async fn store(&self, upload: &UploadedAudio) -> AppResult<TempAudioFile> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            tracing::error!(dir = %self.dir.display(), error = %e, "Failed to create temp directory");
            AppError::Internal("Failed to prepare audio storage".to_string())
        })?;

        let file_name = match upload.extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.dir.join(file_name);

        tokio::fs::write(&path, upload.bytes()).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to write temp audio file");
            AppError::Internal("Failed to store audio file".to_string())
        })?;

        tracing::debug!(path = %path.display(), bytes = upload.len(), "Stored temp audio file");
        Ok(TempAudioFile {
            path,
            released: false,
        })
    }

    /// Delete a temp file. Absent files are a no-op; other failures are logged.
    pub fn release(path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed temp audio file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not remove temp audio file")
            }
        }
    }
}

/// Handle to one stored upload. Dropping it removes the file.
#[derive(Debug)]
pub struct TempAudioFile {
    path: PathBuf,
    released: bool,
}

impl TempAudioFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now. Calling it again (or dropping afterwards) does nothing.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            TempFileManager::release(&self.path);
        }
    }
}

impl Drop for TempAudioFile {
    fn drop(&mut self) {
        self.release();
    }
}
