//! Assembled request bodies.
//!
//! Once ingestion completes the body is exposed as a readable source:
//! a rewound in-memory buffer or a freshly reopened read handle over
//! the spill file. Reads are synchronous — the body is fully assembled
//! by the time any stage sees it.

use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

/// Where the assembled bytes live.
pub enum BodySource {
    Memory(Cursor<Bytes>),
    File(std::fs::File),
}

impl Read for BodySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BodySource::Memory(cursor) => cursor.read(buf),
            BodySource::File(file) => file.read(buf),
        }
    }
}

/// An assembled request body.
pub struct Body {
    source: BodySource,
    length: u64,
    short: bool,
}

impl Body {
    pub(crate) fn memory(bytes: Bytes, short: bool) -> Self {
        let length = bytes.len() as u64;
        Self {
            source: BodySource::Memory(Cursor::new(bytes)),
            length,
            short,
        }
    }

    pub(crate) fn file(file: std::fs::File, length: u64, short: bool) -> Self {
        Self {
            source: BodySource::File(file),
            length,
            short,
        }
    }

    /// Bytes actually received.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Whether ingestion ended before the declared length was reached.
    ///
    /// A short body is not an error at this layer; later stages decide
    /// whether to accept or reject it.
    pub fn is_short(&self) -> bool {
        self.short
    }

    /// Read the remaining bytes into memory.
    pub fn into_bytes(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::with_capacity(self.length as usize);
        self.source.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.source.read(buf)
    }
}

/// A body shared through the context set.
///
/// Context values are shared (`Arc`) while reading needs exclusive
/// access, so the body travels behind a lock. Parsers either lock it
/// for streaming reads or drain it with [`BodyHandle::read_all`].
#[derive(Clone)]
pub struct BodyHandle(Arc<Mutex<Body>>);

impl BodyHandle {
    pub fn new(body: Body) -> Self {
        Self(Arc::new(Mutex::new(body)))
    }

    /// Lock the body for reading.
    pub fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, Body>> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("body lock poisoned"))
    }

    /// Drain the remaining bytes into memory.
    pub fn read_all(&self) -> io::Result<Bytes> {
        let mut body = self.lock()?;
        let mut buf = Vec::with_capacity(body.length as usize);
        body.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Whether ingestion ended early.
    pub fn is_short(&self) -> io::Result<bool> {
        Ok(self.lock()?.is_short())
    }

    /// Bytes actually received.
    pub fn length(&self) -> io::Result<u64> {
        Ok(self.lock()?.length())
    }
}
