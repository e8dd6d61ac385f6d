//! flowline-content — streaming body ingestion.
//!
//! Feeds raw socket data into the pipeline engine. Chunks arriving
//! across separate event-loop callbacks are assembled by a resumable
//! [`ContentReader`](reader::ContentReader): bodies at or below a
//! configured threshold buffer in memory, larger ones spill to a
//! uniquely named temporary file that a chain finalize hook removes on
//! every exit path. The assembled body is exposed as a readable source
//! only after ingestion completes.
//!
//! # Components
//!
//! - **`reader`** — the chunk-fed ingestion state machine
//! - **`spill`** — the process-wide spill directory
//! - **`source`** — assembled bodies and their shared handles
//! - **`ingest`** — the pipeline stage selecting memory vs. disk
//! - **`parse`** — the branching stage dispatching into parsers
//! - **`keys`** — well-known attribute names at the transport boundary

pub mod error;
pub mod ingest;
pub mod keys;
pub mod parse;
pub mod reader;
pub mod source;
pub mod spill;

pub use error::IngestError;
pub use ingest::ContentIngestStage;
pub use parse::{ENCODING_UNKNOWN, ParseDispatchStage};
pub use reader::{ChunkStatus, ContentReader, ReaderHandle, ReaderPhase};
pub use source::{Body, BodyHandle, BodySource};
pub use spill::SpillDir;
