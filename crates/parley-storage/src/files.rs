// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! App-private cache for attachments pending upload.
//!
//! Caller-supplied files may live behind revocable grants (content
//! providers, temp dirs), so we copy them into our own directory and
//! upload from the copy.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use parley_core::ParleyError;

/// File cache rooted at a directory under the app's data dir.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub async fn new(root: PathBuf) -> Result<Self, ParleyError> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Copies `source` into the cache under a unique name, keeping the
    /// original file name as a suffix so uploads preserve it.
    pub async fn cache(&self, source: &str) -> Result<String, ParleyError> {
        let source = Path::new(source);
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ParleyError::Config(format!("invalid file path: {}", source.display())))?;
        let cached = self.root.join(format!("{}_{file_name}", Uuid::new_v4()));
        fs::copy(source, &cached).await?;
        debug!(source = %source.display(), cached = %cached.display(), "attachment cached");
        Ok(cached.to_string_lossy().into_owned())
    }

    /// Removes a cached copy. Missing files are not an error; the upload
    /// may have been retried after a partial cleanup.
    pub async fn remove(&self, cached: &str) -> Result<(), ParleyError> {
        let cached = Path::new(cached);
        if !cached.starts_with(&self.root) {
            return Err(ParleyError::Config(format!(
                "path outside file cache: {}",
                cached.display()
            )));
        }
        match fs::remove_file(cached).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
