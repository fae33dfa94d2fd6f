//! Input stream over a received buffer.

use bytes::Buf;

use super::{decode_modified_utf8, StreamError};

/// Cursor that reads big-endian values from a byte slice.
///
/// The stream never copies the underlying buffer; slices it hands out borrow
/// from it.
#[derive(Debug, Clone)]
pub struct InputStream<'a> {
    data: &'a [u8],
    pos: usize,
    mark: usize,
}

impl<'a> InputStream<'a> {
    /// Create a new stream positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            mark: 0,
        }
    }

    /// Get the current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor. Positions past the end are rejected.
    pub fn set_position(&mut self, pos: usize) -> Result<(), StreamError> {
        if pos > self.data.len() {
            return Err(StreamError::PositionOutOfRange {
                position: pos,
                limit: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Number of unread bytes.
    pub fn available(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Remember the current position.
    pub fn mark(&mut self) {
        self.mark = self.pos;
    }

    /// Return to the last marked position.
    pub fn reset(&mut self) {
        self.pos = self.mark;
    }

    /// The whole underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Unread bytes, without consuming them.
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Skip `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), StreamError> {
        self.ensure(len)?;
        self.pos += len;
        Ok(())
    }

    /// Read a boolean (any non-zero byte is `true`).
    pub fn read_bool(&mut self) -> Result<bool, StreamError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read an unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        self.ensure(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self) -> Result<i8, StreamError> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        self.ensure(2)?;
        let value = (&self.data[self.pos..]).get_u16();
        self.pos += 2;
        Ok(value)
    }

    /// Read a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16, StreamError> {
        self.ensure(2)?;
        let value = (&self.data[self.pos..]).get_i16();
        self.pos += 2;
        Ok(value)
    }

    /// Read a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, StreamError> {
        self.ensure(4)?;
        let value = (&self.data[self.pos..]).get_i32();
        self.pos += 4;
        Ok(value)
    }

    /// Read a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, StreamError> {
        self.ensure(8)?;
        let value = (&self.data[self.pos..]).get_i64();
        self.pos += 8;
        Ok(value)
    }

    /// Read a big-endian `f64`.
    pub fn read_f64(&mut self) -> Result<f64, StreamError> {
        self.ensure(8)?;
        let value = (&self.data[self.pos..]).get_f64();
        self.pos += 8;
        Ok(value)
    }

    /// Read the next `i32` without consuming it.
    pub fn peek_i32(&self) -> Result<i32, StreamError> {
        self.ensure(4)?;
        Ok((&self.data[self.pos..]).get_i32())
    }

    /// Read a `u16`-prefixed modified UTF-8 string.
    pub fn read_utf(&mut self) -> Result<String, StreamError> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_raw(len)?;
        decode_modified_utf8(bytes)
    }

    /// Read a marker-prefixed string; a `true` marker means absent.
    pub fn read_optional_utf(&mut self) -> Result<Option<String>, StreamError> {
        if self.read_bool()? {
            Ok(None)
        } else {
            self.read_utf().map(Some)
        }
    }

    /// Read an `i32`-prefixed byte sequence.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], StreamError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(StreamError::CorruptData("Read data corrupt"));
        }
        self.read_raw(len as usize)
    }

    /// Read `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8], StreamError> {
        self.ensure(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn ensure(&self, needed: usize) -> Result<(), StreamError> {
        let remaining = self.available();
        if remaining < needed {
            return Err(StreamError::UnexpectedEof { needed, remaining });
        }
        Ok(())
    }
}
