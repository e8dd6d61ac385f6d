//! The content ingestion stage.
//!
//! Buffers up asynchronously received body data so later stages can
//! read an assembled body. The stage itself only selects the buffering
//! strategy and publishes the reader; the transport drives the reader
//! with chunks as they arrive on the event loop.

use std::sync::Arc;

use flowline_core::StageContract;
use flowline_exec::{Chain, Stage};
use tracing::debug;

use crate::error::IngestError;
use crate::keys;
use crate::reader::{ContentReader, ReaderHandle};
use crate::spill::SpillDir;

/// Selects memory or spill buffering per request and publishes the
/// chunk reader for the transport to drive.
pub struct ContentIngestStage {
    threshold: u64,
    spill_dir: Arc<SpillDir>,
}

impl ContentIngestStage {
    /// `threshold` is the largest declared length buffered in memory;
    /// anything above spills into `spill_dir`.
    pub fn new(threshold: u64, spill_dir: Arc<SpillDir>) -> Self {
        Self {
            threshold,
            spill_dir,
        }
    }

    /// Build the stage from the content configuration, opening (and
    /// probing) the configured spill directory.
    ///
    /// Fails fatally when the directory is unusable; wiring is
    /// expected to abort startup on that error.
    pub async fn from_config(config: &flowline_core::ContentConfig) -> Result<Self, IngestError> {
        let spill = SpillDir::open(&config.spill_dir).await?;
        Ok(Self::new(config.spill_threshold, Arc::new(spill)))
    }
}

impl Stage for ContentIngestStage {
    fn name(&self) -> &str {
        "content-ingest"
    }

    fn contract(&self) -> StageContract {
        StageContract::new()
            .requires(&keys::CONTENT_LENGTH)
            .defines(&keys::CONTENT_READER)
            .defines(&keys::CONTENT_REQUIRED)
            .optional(&keys::RESPONSE_SUCCESS)
    }

    fn process(&self, chain: &mut Chain) -> anyhow::Result<()> {
        // Skip in case the response is already in error.
        if chain.get(&keys::RESPONSE_SUCCESS)? == Some(&false) {
            return Ok(());
        }

        let declared = chain.get(&keys::CONTENT_LENGTH)?.copied().unwrap_or(0);
        if declared == 0 {
            chain.set(&keys::CONTENT_REQUIRED, false)?;
            return Ok(());
        }

        let reader = if declared > self.threshold {
            let path = self.spill_dir.next_path();
            debug!(
                path = %path.display(),
                declared,
                "spilling request body to disk"
            );
            let cleanup = path.clone();
            chain.on_finalize(move || {
                match std::fs::remove_file(&cleanup) {
                    Ok(()) => {
                        debug!(path = %cleanup.display(), "spill file removed");
                        Ok(())
                    }
                    // Never written or already gone.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(err) => Err(err.into()),
                }
            });
            ContentReader::spill(declared, path)
        } else {
            ContentReader::in_memory(declared)
        };

        chain.set(&keys::CONTENT_READER, ReaderHandle::new(reader))?;
        chain.set(&keys::CONTENT_REQUIRED, true)?;
        Ok(())
    }
}
