//! Frame codec for tokio_util.
//!
//! Every message starts with an `i32` length that counts the whole message,
//! the length field included. The codec splits the byte stream on that length
//! and leaves envelope validation to the message factory.

use std::io;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Size of the length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum frame size (64MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Framing errors.
#[derive(Error, Debug)]
pub enum FrameError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Frame exceeds the configured maximum
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Frame size
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Length prefix cannot describe a frame
    #[error("Invalid frame length: {0}")]
    InvalidLength(i32),
}

/// Length-prefixed frame codec.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_message_size: usize,
}

impl FrameCodec {
    /// Create a codec with the default maximum frame size.
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Create a codec with a custom maximum frame size.
    pub fn with_max_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }

    /// Maximum frame size.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let length = i32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if length < LENGTH_PREFIX_SIZE as i32 {
            return Err(FrameError::InvalidLength(length));
        }
        let length = length as usize;
        if length > self.max_message_size {
            return Err(FrameError::MessageTooLarge {
                size: length,
                max: self.max_message_size,
            });
        }

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(length)))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_message_size {
            return Err(FrameError::MessageTooLarge {
                size: item.len(),
                max: self.max_message_size,
            });
        }
        if item.len() < LENGTH_PREFIX_SIZE {
            return Err(FrameError::InvalidLength(item.len() as i32));
        }
        dst.extend_from_slice(&item);
        Ok(())
    }
}
