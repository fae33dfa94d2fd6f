//! Big-endian data streams used by every message payload.
//!
//! # Encoding
//!
//! - **Integers**: fixed width, network byte order
//! - **Boolean**: one byte, `0` or `1`
//! - **UTF**: `u16` byte length followed by modified UTF-8
//! - **Bytes**: `i32` length followed by raw bytes
//! - **Optional UTF**: boolean marker (`true` = absent), then UTF when present

mod input;
mod output;

pub use input::InputStream;
pub use output::OutputStream;

use std::fmt;

use crate::exception::TgException;

/// Largest encoded length a UTF string may have.
pub const MAX_UTF_LENGTH: usize = u16::MAX as usize;

/// Stream errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Not enough bytes left for the requested read
    UnexpectedEof {
        /// Bytes requested
        needed: usize,
        /// Bytes left
        remaining: usize,
    },
    /// Malformed modified UTF-8
    InvalidUtf(String),
    /// Encoded string does not fit a `u16` length prefix
    StringTooLong(usize),
    /// Length prefix or payload is inconsistent
    CorruptData(&'static str),
    /// Position outside the written or readable range
    PositionOutOfRange {
        /// Requested position
        position: usize,
        /// Current limit
        limit: usize,
    },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::UnexpectedEof { needed, remaining } => write!(
                f,
                "Unexpected end of stream: needed {} bytes, {} remaining",
                needed, remaining
            ),
            StreamError::InvalidUtf(msg) => write!(f, "Invalid modified UTF-8: {}", msg),
            StreamError::StringTooLong(len) => {
                write!(f, "Encoded string too long: {} bytes (max: {})", len, MAX_UTF_LENGTH)
            }
            StreamError::CorruptData(msg) => f.write_str(msg),
            StreamError::PositionOutOfRange { position, limit } => {
                write!(f, "Position {} out of range (limit: {})", position, limit)
            }
        }
    }
}

impl std::error::Error for StreamError {}

impl From<StreamError> for TgException {
    fn from(err: StreamError) -> Self {
        TgException::io(err.to_string())
    }
}

/// Encode a string as modified UTF-8 (no length prefix).
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Decode modified UTF-8 (no length prefix).
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, StreamError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = continuation(bytes, i + 1)?;
            units.push((((b & 0x1F) as u16) << 6) | b2);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = continuation(bytes, i + 1)?;
            let b3 = continuation(bytes, i + 2)?;
            units.push((((b & 0x0F) as u16) << 12) | (b2 << 6) | b3);
            i += 3;
        } else {
            return Err(StreamError::InvalidUtf(format!(
                "invalid lead byte 0x{:02X} at offset {}",
                b, i
            )));
        }
    }
    String::from_utf16(&units).map_err(|e| StreamError::InvalidUtf(e.to_string()))
}

fn continuation(bytes: &[u8], index: usize) -> Result<u16, StreamError> {
    match bytes.get(index) {
        Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        Some(b) => Err(StreamError::InvalidUtf(format!(
            "invalid continuation byte 0x{:02X} at offset {}",
            b, index
        ))),
        None => Err(StreamError::InvalidUtf("truncated multi-byte sequence".to_string())),
    }
}
