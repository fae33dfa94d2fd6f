//! Output stream for building outbound buffers.

use bytes::{BufMut, Bytes, BytesMut};

use super::{encode_modified_utf8, StreamError, MAX_UTF_LENGTH};

/// Writer that appends big-endian values to a growable buffer.
#[derive(Debug, Clone, Default)]
pub struct OutputStream {
    buffer: BytesMut,
}

impl OutputStream {
    /// Create a new stream with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new stream with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Current write position, equal to the number of bytes written.
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the stream and return the buffer.
    pub fn into_inner(self) -> BytesMut {
        self.buffer
    }

    /// Consume the stream and return frozen bytes.
    pub fn freeze(self) -> Bytes {
        self.buffer.freeze()
    }

    /// Write a boolean as one byte.
    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u8(u8::from(value));
    }

    /// Write an unsigned byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    /// Write a signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.buffer.put_i8(value);
    }

    /// Write a big-endian `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16(value);
    }

    /// Write a big-endian `i16`.
    pub fn write_i16(&mut self, value: i16) {
        self.buffer.put_i16(value);
    }

    /// Write a big-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32(value);
    }

    /// Write a big-endian `i64`.
    pub fn write_i64(&mut self, value: i64) {
        self.buffer.put_i64(value);
    }

    /// Write a big-endian `f64`.
    pub fn write_f64(&mut self, value: f64) {
        self.buffer.put_f64(value);
    }

    /// Write raw bytes with no prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
    }

    /// Write a `u16`-prefixed modified UTF-8 string.
    pub fn write_utf(&mut self, value: &str) -> Result<(), StreamError> {
        let encoded = encode_modified_utf8(value);
        if encoded.len() > MAX_UTF_LENGTH {
            return Err(StreamError::StringTooLong(encoded.len()));
        }
        self.buffer.put_u16(encoded.len() as u16);
        self.buffer.put_slice(&encoded);
        Ok(())
    }

    /// Write a marker-prefixed string. `None` and the empty string are both
    /// written as absent.
    pub fn write_optional_utf(&mut self, value: Option<&str>) -> Result<(), StreamError> {
        match value {
            Some(s) if !s.is_empty() => {
                self.write_bool(false);
                self.write_utf(s)
            }
            _ => {
                self.write_bool(true);
                Ok(())
            }
        }
    }

    /// Write an `i32`-prefixed byte sequence.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        let len = i32::try_from(bytes.len())
            .map_err(|_| StreamError::CorruptData("Byte sequence exceeds i32 length"))?;
        self.buffer.put_i32(len);
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Overwrite four already-written bytes at `pos` with a big-endian `i32`.
    pub fn write_i32_at(&mut self, pos: usize, value: i32) -> Result<(), StreamError> {
        let end = pos.checked_add(4).unwrap_or(usize::MAX);
        if end > self.buffer.len() {
            return Err(StreamError::PositionOutOfRange {
                position: pos,
                limit: self.buffer.len(),
            });
        }
        self.buffer[pos..end].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::stream::InputStream;

    #[test]
    fn test_write_integers() {
        let mut out = OutputStream::new();
        out.write_i16(-2);
        out.write_i32(256);
        assert_eq!(out.as_bytes(), &[0xFF, 0xFE, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_write_i32_at_patches() {
        let mut out = OutputStream::new();
        out.write_i32(0);
        out.write_i64(9);
        out.write_i32_at(0, out.len() as i32).unwrap();
        assert_eq!(&out.as_bytes()[..4], &[0, 0, 0, 12]);
    }

    #[test]
    fn test_write_i32_at_out_of_range() {
        let mut out = OutputStream::new();
        out.write_i16(0);
        assert!(matches!(
            out.write_i32_at(0, 1),
            Err(StreamError::PositionOutOfRange { position: 0, limit: 2 })
        ));
    }

    #[test]
    fn test_write_utf_too_long() {
        let mut out = OutputStream::new();
        let long = "x".repeat(MAX_UTF_LENGTH + 1);
        assert!(matches!(out.write_utf(&long), Err(StreamError::StringTooLong(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_optional_utf_empty_is_absent() {
        let mut out = OutputStream::new();
        out.write_optional_utf(Some("")).unwrap();
        out.write_optional_utf(None).unwrap();
        out.write_optional_utf(Some("inbox")).unwrap();
        let bytes = out.freeze();
        let mut input = InputStream::new(&bytes);
        assert_eq!(input.read_optional_utf().unwrap(), None);
        assert_eq!(input.read_optional_utf().unwrap(), None);
        assert_eq!(input.read_optional_utf().unwrap().as_deref(), Some("inbox"));
    }

    #[test]
    fn test_bytes_prefix() {
        let mut out = OutputStream::new();
        out.write_bytes(&[7, 8]).unwrap();
        assert_eq!(out.as_bytes(), &[0, 0, 0, 2, 7, 8]);
    }
}
