//! # Front-ends
//!
//! Adapters that turn source text into a [`Document`](crate::model::Document).
//! Markdown goes through pulldown-cmark; plain text becomes a single
//! monospaced block. JSON documents deserialize directly into the model.

pub mod markdown;
pub mod plain;

use tracing::warn;

/// Decode raw input bytes as text.
///
/// A leading UTF-8 byte order mark is dropped. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!(
                "Input is not valid UTF-8 ({}), decoding with replacement characters",
                e
            );
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
