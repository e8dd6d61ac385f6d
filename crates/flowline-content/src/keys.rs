//! Well-known attribute keys at the transport boundary.
//!
//! Declared once so the shipped stages and the transport layer agree
//! on names. External handlers are free to declare further attributes;
//! these are only the ones this crate touches.

use flowline_core::Attr;

use crate::reader::ReaderHandle;
use crate::source::BodyHandle;

/// Request verb, seeded by the transport.
pub const METHOD: Attr<String> = Attr::new("request", "method");

/// Declared request content length in bytes, seeded by the transport.
/// Zero or absent means no content.
pub const CONTENT_LENGTH: Attr<u64> = Attr::new("request_content", "length");

/// Declared request content type.
pub const CONTENT_TYPE: Attr<String> = Attr::new("request_content", "type");

/// Declared request character set.
pub const CONTENT_CHAR_SET: Attr<String> = Attr::new("request_content", "char_set");

/// The chunk-accepting reader the transport drives.
pub const CONTENT_READER: Attr<ReaderHandle> = Attr::new("request_content", "reader");

/// Whether the transport must deliver body chunks for this request.
pub const CONTENT_REQUIRED: Attr<bool> = Attr::new("request_content", "required");

/// The assembled request body.
pub const CONTENT_SOURCE: Attr<BodyHandle> = Attr::new("request_content", "source");

/// Whether the response is (still) successful. Absent reads as
/// not-yet-failed.
pub const RESPONSE_SUCCESS: Attr<bool> = Attr::new("response", "success");

/// Machine-readable response code.
pub const RESPONSE_CODE: Attr<String> = Attr::new("response", "code");

/// Human-readable response text.
pub const RESPONSE_TEXT: Attr<String> = Attr::new("response", "text");

/// Content type the response will be rendered with.
pub const RESPONSE_CONTENT_TYPE: Attr<String> = Attr::new("response_content", "type");
