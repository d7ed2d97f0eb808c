//! # Hex Encoding/Decoding Utilities
//!
//! EPC identifiers cross the public surface as uppercase hex strings, and
//! tests describe frames as hex. This module wraps the `hex` crate with the
//! conventions used throughout: uppercase output, whitespace-tolerant input.

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("Empty hex string")]
    EmptyString,

    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to an uppercase hex string.
///
/// This is the EPC formatting used on every outward event; an empty slice
/// yields an empty string rather than an error.
pub fn encode_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a hex string to bytes.
///
/// Accepts both uppercase and lowercase characters; whitespace is stripped
/// so frames can be written readably in tests and CLI input.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    if hex_str.is_empty() {
        return Err(HexError::EmptyString);
    }

    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}
