//! The streaming content reader.
//!
//! An ingestion state machine fed one chunk per call, across separate
//! event-loop callbacks. State is fully externalized between calls:
//! each `accept` takes the next chunk and returns a small status, never
//! blocking for more data. Bodies at or below the configured threshold
//! buffer in memory; larger ones spill to a temporary file written with
//! `tokio::fs` so the event loop is never blocked on disk.

use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::IngestError;
use crate::source::Body;

/// Result of accepting one chunk.
#[derive(Debug)]
pub enum ChunkStatus {
    /// The declared length is not reached yet; keep calling.
    NeedMore,
    /// The declared length was reached exactly at the chunk boundary.
    Complete,
    /// The declared length was reached mid-chunk; the unread remainder
    /// is handed back to the caller. The caller decides whether the
    /// tail belongs to a subsequent message.
    Overflow(Bytes),
    /// An empty chunk signaled end-of-input; ingestion finalized
    /// (early, if the declared length was not reached).
    Closed,
}

/// Ingestion phase, for introspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderPhase {
    /// Declared length is zero or absent; nothing to read.
    NoContent,
    /// Accumulating in memory.
    BufferMemory,
    /// Writing to a spill file.
    SpillDisk,
    /// Body fully assembled and exposed as a readable source.
    Ready,
}

enum ReaderState {
    NoContent { body: Option<Body> },
    Memory { buf: BytesMut },
    Disk { file: Option<tokio::fs::File>, path: PathBuf },
    Ready { body: Option<Body> },
}

/// Assembles one request body from successive byte chunks.
pub struct ContentReader {
    declared: u64,
    received: u64,
    short: bool,
    state: ReaderState,
}

impl ContentReader {
    /// A reader for a request that declares no content.
    pub fn no_content() -> Self {
        Self {
            declared: 0,
            received: 0,
            short: false,
            state: ReaderState::NoContent {
                body: Some(Body::memory(Bytes::new(), false)),
            },
        }
    }

    /// Buffer the declared length in memory.
    pub fn in_memory(declared: u64) -> Self {
        Self {
            declared,
            received: 0,
            short: false,
            state: ReaderState::Memory {
                buf: BytesMut::with_capacity(declared.min(64 * 1024) as usize),
            },
        }
    }

    /// Spill the declared length to `path`.
    ///
    /// The file is created lazily on the first chunk, so constructing
    /// the reader stays synchronous and a body that never arrives
    /// leaves nothing on disk.
    pub fn spill(declared: u64, path: PathBuf) -> Self {
        Self {
            declared,
            received: 0,
            short: false,
            state: ReaderState::Disk { file: None, path },
        }
    }

    pub fn phase(&self) -> ReaderPhase {
        match &self.state {
            ReaderState::NoContent { .. } => ReaderPhase::NoContent,
            ReaderState::Memory { .. } => ReaderPhase::BufferMemory,
            ReaderState::Disk { .. } => ReaderPhase::SpillDisk,
            ReaderState::Ready { .. } => ReaderPhase::Ready,
        }
    }

    pub fn declared_length(&self) -> u64 {
        self.declared
    }

    /// Bytes written so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// The spill file path, when spilling was selected.
    pub fn spill_path(&self) -> Option<&Path> {
        match &self.state {
            ReaderState::Disk { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Accept the next chunk.
    ///
    /// An empty chunk signals end-of-input: whatever was received is
    /// finalized as the body (a short body, not an error — later
    /// stages decide how to treat it). Once the reader is ready, any
    /// further non-empty chunk comes back whole as overflow.
    pub async fn accept(&mut self, chunk: Bytes) -> Result<ChunkStatus, IngestError> {
        if matches!(
            self.state,
            ReaderState::Ready { .. } | ReaderState::NoContent { .. }
        ) {
            return Ok(if chunk.is_empty() {
                ChunkStatus::Closed
            } else {
                ChunkStatus::Overflow(chunk)
            });
        }

        if chunk.is_empty() {
            self.short = self.received < self.declared;
            self.seal().await?;
            return Ok(ChunkStatus::Closed);
        }

        let remaining = self.declared - self.received;
        if (chunk.len() as u64) <= remaining {
            self.write(&chunk).await?;
            self.received += chunk.len() as u64;
            if self.received == self.declared {
                self.seal().await?;
                Ok(ChunkStatus::Complete)
            } else {
                Ok(ChunkStatus::NeedMore)
            }
        } else {
            // Mid-chunk truncation: keep exactly the bytes up to the
            // declared length, hand the rest back unread.
            let keep = remaining as usize;
            self.write(&chunk[..keep]).await?;
            self.received = self.declared;
            let tail = chunk.slice(keep..);
            self.seal().await?;
            Ok(ChunkStatus::Overflow(tail))
        }
    }

    /// Take the assembled body once ingestion finished.
    pub fn take_body(&mut self) -> Option<Body> {
        match &mut self.state {
            ReaderState::Ready { body } | ReaderState::NoContent { body } => body.take(),
            _ => None,
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), IngestError> {
        match &mut self.state {
            ReaderState::Memory { buf } => {
                buf.extend_from_slice(data);
                Ok(())
            }
            ReaderState::Disk { file, path } => {
                let handle = match file {
                    Some(handle) => handle,
                    None => {
                        debug!(path = %path.display(), "opening spill file");
                        let created = tokio::fs::File::create(&path).await.map_err(|source| {
                            IngestError::SpillIo {
                                path: path.clone(),
                                source,
                            }
                        })?;
                        file.insert(created)
                    }
                };
                handle
                    .write_all(data)
                    .await
                    .map_err(|source| IngestError::SpillIo {
                        path: path.clone(),
                        source,
                    })
            }
            _ => Ok(()),
        }
    }

    /// Transition to ready: rewind memory buffers, reopen spill files
    /// for reading.
    async fn seal(&mut self) -> Result<(), IngestError> {
        let state = std::mem::replace(&mut self.state, ReaderState::Ready { body: None });
        let body = match state {
            ReaderState::Memory { buf } => Body::memory(buf.freeze(), self.short),
            ReaderState::Disk { file, path } => {
                if let Some(mut handle) = file {
                    handle
                        .flush()
                        .await
                        .map_err(|source| IngestError::SpillIo {
                            path: path.clone(),
                            source,
                        })?;
                }
                // The write handle is dropped; reads come from a fresh
                // handle over the same bytes. A spill that never saw a
                // chunk reads as empty.
                let read = match tokio::fs::File::open(&path).await {
                    Ok(file) => Some(file.into_std().await),
                    Err(_) if self.received == 0 => None,
                    Err(source) => {
                        return Err(IngestError::SpillIo { path, source });
                    }
                };
                match read {
                    Some(file) => Body::file(file, self.received, self.short),
                    None => Body::memory(Bytes::new(), self.short),
                }
            }
            ReaderState::NoContent { .. } | ReaderState::Ready { .. } => {
                unreachable!("seal is only reached while receiving")
            }
        };
        self.state = ReaderState::Ready { body: Some(body) };
        Ok(())
    }
}

/// A content reader shared through the context set.
///
/// The ingestion stage publishes the reader into the run's context;
/// the transport picks it up and drives it chunk by chunk. The async
/// lock keeps the two holders honest without blocking the event loop.
#[derive(Clone)]
pub struct ReaderHandle(std::sync::Arc<tokio::sync::Mutex<ContentReader>>);

impl ReaderHandle {
    pub fn new(reader: ContentReader) -> Self {
        Self(std::sync::Arc::new(tokio::sync::Mutex::new(reader)))
    }

    /// Feed the next chunk to the reader.
    pub async fn accept(&self, chunk: Bytes) -> Result<ChunkStatus, IngestError> {
        self.0.lock().await.accept(chunk).await
    }

    /// Take the assembled body once ingestion finished.
    pub async fn take_body(&self) -> Option<Body> {
        self.0.lock().await.take_body()
    }

    pub async fn phase(&self) -> ReaderPhase {
        self.0.lock().await.phase()
    }
}
