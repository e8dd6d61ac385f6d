//! The spill directory for oversized request bodies.
//!
//! Process-wide and write-shared by concurrently spilling readers;
//! filenames are made unique at spill start (counter + timestamp), so
//! no locking is needed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::error::IngestError;

/// A verified-writable directory spill files are written to.
#[derive(Debug)]
pub struct SpillDir {
    root: PathBuf,
    counter: AtomicU64,
}

impl SpillDir {
    /// Open (creating if absent) and probe the spill directory.
    ///
    /// Fails fatally when the directory cannot be created or written;
    /// callers are expected to abort startup on that error.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, IngestError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| IngestError::SpillDir {
                path: root.clone(),
                source,
            })?;

        let probe = root.join(".write_probe");
        tokio::fs::write(&probe, b"")
            .await
            .map_err(|source| IngestError::SpillDir {
                path: root.clone(),
                source,
            })?;
        tokio::fs::remove_file(&probe)
            .await
            .map_err(|source| IngestError::SpillDir {
                path: root.clone(),
                source,
            })?;

        info!(path = %root.display(), "spill directory ready");
        Ok(Self {
            root,
            counter: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a unique path for one request body.
    pub fn next_path(&self) -> PathBuf {
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.root.join(format!("request_{count}_{stamp}"))
    }
}
