//! The parse dispatch stage.
//!
//! Owns a sub-assembly of parser stages and delegates the request
//! content to it. A parser that handles the content stops the nested
//! chain; if none does, the response is marked with a recognized
//! failure (unsupported encoding) and the outer chain proceeds to
//! finalization rather than raising.

use flowline_core::StageContract;
use flowline_exec::{Assembly, Branch, Chain, Stage};
use tracing::debug;

use crate::keys;

/// Response code set when no parser supports the content type.
pub const ENCODING_UNKNOWN: &str = "encoding_unknown";

const PARSERS: usize = 0;

/// Dispatches request content into a parser sub-assembly.
pub struct ParseDispatchStage {
    char_set_default: String,
}

impl ParseDispatchStage {
    /// `char_set_default` is assumed whenever the request declares no
    /// character set, or one nothing here can decode.
    pub fn new(char_set_default: &str) -> Self {
        Self {
            char_set_default: char_set_default.to_string(),
        }
    }

    /// Build the stage from the content configuration.
    pub fn from_config(config: &flowline_core::ContentConfig) -> Self {
        Self::new(&config.char_set_default)
    }

    /// The branch wiring for the parser sub-assembly.
    ///
    /// Parsers see the request content attributes and the response
    /// marker attributes under their outer names; everything else
    /// stays invisible to them. A parser that handles the content must
    /// stop its chain.
    pub fn parser_branch(parsers: &Assembly) -> Branch {
        Branch::new(parsers)
            .share(&keys::CONTENT_TYPE)
            .share(&keys::CONTENT_CHAR_SET)
            .share(&keys::CONTENT_SOURCE)
            .share(&keys::RESPONSE_SUCCESS)
            .share(&keys::RESPONSE_CODE)
            .share(&keys::RESPONSE_TEXT)
    }
}

impl Stage for ParseDispatchStage {
    fn name(&self) -> &str {
        "parse-dispatch"
    }

    fn contract(&self) -> StageContract {
        StageContract::new()
            .requires(&keys::RESPONSE_CONTENT_TYPE)
            .optional(&keys::CONTENT_SOURCE)
            .optional(&keys::CONTENT_TYPE)
            .optional(&keys::CONTENT_CHAR_SET)
            .defines(&keys::RESPONSE_SUCCESS)
            .defines(&keys::RESPONSE_CODE)
            .defines(&keys::RESPONSE_TEXT)
    }

    fn process(&self, chain: &mut Chain) -> anyhow::Result<()> {
        // Skip in case the response is in error.
        if chain.get(&keys::RESPONSE_SUCCESS)? == Some(&false) {
            return Ok(());
        }
        // Skip if there is no content to parse.
        if chain.get(&keys::CONTENT_SOURCE)?.is_none() {
            return Ok(());
        }

        let declared_char_set = chain.get(&keys::CONTENT_CHAR_SET)?.cloned();
        match declared_char_set.as_deref() {
            Some(char_set) if known_char_set(char_set) => {}
            other => {
                if let Some(char_set) = other {
                    debug!(
                        char_set,
                        default = self.char_set_default.as_str(),
                        "unknown character set, using default"
                    );
                }
                chain.set(&keys::CONTENT_CHAR_SET, self.char_set_default.clone())?;
            }
        }

        if chain.get(&keys::CONTENT_TYPE)?.is_none() {
            if let Some(fallback) = chain.get(&keys::RESPONSE_CONTENT_TYPE)?.cloned() {
                chain.set(&keys::CONTENT_TYPE, fallback)?;
            }
        }

        let outcome = chain.branch(PARSERS)?;
        if outcome.consumed() {
            // A parser handled the content; the rest of the pipeline
            // runs without the request content.
            chain.clear(&keys::CONTENT_SOURCE)?;
        } else if chain.get(&keys::RESPONSE_SUCCESS)? != Some(&false) {
            let declared = chain
                .get(&keys::CONTENT_TYPE)?
                .cloned()
                .unwrap_or_default();
            chain.set(&keys::RESPONSE_SUCCESS, false)?;
            chain.set(&keys::RESPONSE_CODE, ENCODING_UNKNOWN.to_string())?;
            chain.set(
                &keys::RESPONSE_TEXT,
                format!("Content type '{declared}' not supported for parsing"),
            )?;
        }
        Ok(())
    }
}

/// Character sets the text decoding layer can handle.
fn known_char_set(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "utf-8"
            | "utf8"
            | "us-ascii"
            | "ascii"
            | "iso-8859-1"
            | "latin-1"
            | "latin1"
            | "utf-16"
            | "utf-16le"
            | "utf-16be"
            | "windows-1252"
    )
}
