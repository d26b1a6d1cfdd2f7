//! Structured error types for the mdpdf rendering engine.
//!
//! Two enums reflect the two failure modes of a render:
//!
//! * [`MdPdfError`] is fatal. The canvas or PDF writer failed, or the input
//!   could not be read at all, and no document is produced.
//! * [`BlockError`] is recoverable. One block (an image, a table) could not be
//!   rendered; the engine draws a placeholder in its place and moves on.

use thiserror::Error;

/// The unified error type returned by all public mdpdf API functions.
#[derive(Debug, Error)]
pub enum MdPdfError {
    /// JSON input (a document or a render options file) failed to parse.
    #[error("Failed to parse input: {source}{}", format_hint(.hint))]
    ParseError {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A custom font could not be decoded, parsed, or embedded.
    #[error("Font error: {0}")]
    FontError(String),

    /// The page canvas or the PDF writer failed. Aborts the whole render.
    #[error("Render error: {0}")]
    RenderError(String),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for MdPdfError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and block types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        MdPdfError::ParseError { source: e, hint }
    }
}

/// A non-fatal error confined to a single block.
///
/// Never propagated past the block that raised it: the engine records it in
/// [`crate::RenderResult::placeholders`] and draws a visible marker instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlockError {
    /// Local path, `file://` URI, or any scheme other than http(s)/data.
    #[error("unsupported image source '{src}'")]
    UnsupportedImageSource { src: String },

    /// The fetch did not settle within the configured timeout.
    #[error("image fetch timed out after {secs}s for '{url}'")]
    ImageFetchTimeout { url: String, secs: u64 },

    /// Network error, non-success HTTP status, or a malformed data URI.
    #[error("failed to fetch image '{url}': {reason}")]
    ImageFetchFailed { url: String, reason: String },

    /// Bytes were obtained but are not a decodable image.
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// The table has no columns, or a row is wider than its header.
    #[error("malformed table: {0}")]
    TableParseError(String),
}

impl BlockError {
    /// Load failures draw a muted placeholder; decode and table failures
    /// draw an error marker.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            BlockError::UnsupportedImageSource { .. }
                | BlockError::ImageFetchTimeout { .. }
                | BlockError::ImageFetchFailed { .. }
        )
    }
}
