//! Text decoding with a candidate-encoding retry loop.
//!
//! Bank exports arrive in UTF-8 (sometimes with a BOM) or in the legacy
//! single-byte encodings Latin-1/Windows-1252. Candidates are tried in
//! order and the first clean decode wins.

use crate::error::{Error, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Candidate encodings, tried in order. Windows-1252 is a superset of
/// Latin-1 for the printable range, so one entry covers both.
const CANDIDATES: [&Encoding; 2] = [UTF_8, WINDOWS_1252];

/// Decode raw file bytes into text, trying each candidate encoding in turn.
///
/// Returns [`Error::Decode`] when no candidate produces a clean decode.
pub fn decode_text(data: &[u8]) -> Result<String> {
    // Strip a UTF-8 BOM up front so header matching never sees it.
    let data = data.strip_prefix(b"\xef\xbb\xbf").unwrap_or(data);

    for encoding in CANDIDATES {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(data) {
            return Ok(text.into_owned());
        }
    }

    Err(Error::Decode)
}
