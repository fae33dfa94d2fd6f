//! Boundary with the graph object model.
//!
//! The codec never interprets entity bytes. Outbound, entities write
//! themselves through [`WireEntity`] and [`WireAttributeDescriptor`]. Inbound,
//! responses expose the undecoded tail as an [`EntityStream`] that an
//! [`EntityDecoder`] consumes lazily.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::stream::{InputStream, OutputStream};
use crate::exception::{TgException, TgResult};

/// Graph entity that can be written into a commit payload.
pub trait WireEntity: fmt::Debug + Send + Sync {
    /// Entity id; provisional ids are negative until committed.
    fn virtual_id(&self) -> i64;

    /// Write the entity in its external form.
    fn write_external(&self, out: &mut OutputStream) -> TgResult<()>;
}

/// Attribute descriptor that can be written into a commit payload.
pub trait WireAttributeDescriptor: fmt::Debug + Send + Sync {
    /// Descriptor id; new descriptors carry a negative provisional id.
    fn attribute_id(&self) -> i32;

    /// Write the descriptor in its external form.
    fn write_external(&self, out: &mut OutputStream) -> TgResult<()>;
}

/// Skips over externally encoded items so section boundaries can be found
/// without decoding them.
pub trait SectionReader {
    /// Skip one attribute descriptor.
    fn skip_attribute_descriptor(&self, input: &mut InputStream<'_>) -> TgResult<()>;

    /// Skip one entity.
    fn skip_entity(&self, input: &mut InputStream<'_>) -> TgResult<()>;
}

/// Decodes individual entities out of an [`EntityStream`].
pub trait EntityDecoder {
    /// Decoded entity type.
    type Entity;

    /// Decode one entity, advancing the cursor past it.
    fn decode_entity(&self, input: &mut InputStream<'_>) -> TgResult<Self::Entity>;
}

/// Undecoded entity bytes left at the end of a response.
///
/// The stream owns a copy of the bytes, so it outlives the frame it came from.
/// Streams produced by the codec start with the `i32` count the server wrote
/// ahead of the entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStream {
    bytes: Bytes,
}

impl EntityStream {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Build a stream from a count and already-encoded entity bytes.
    pub fn with_count(count: i32, body: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(4 + body.len());
        buf.put_i32(count);
        buf.put_slice(body);
        Self { bytes: buf.freeze() }
    }

    /// Capture the unread tail of `input` without consuming it.
    pub(crate) fn capture(input: &InputStream<'_>) -> Self {
        Self::new(Bytes::copy_from_slice(input.remaining_slice()))
    }

    /// Cursor over the stream, positioned at its start.
    pub fn input(&self) -> InputStream<'_> {
        InputStream::new(&self.bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes in the stream.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the stream is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Count written at the head of the stream, if there is one.
    pub fn declared_count(&self) -> Option<i32> {
        self.input().peek_i32().ok()
    }

    /// Decode every entity the stream declares.
    ///
    /// A negative count is rejected. The count is not trusted for
    /// preallocation; a count larger than the entities present fails once
    /// the bytes run out.
    pub fn decode_all<D: EntityDecoder>(&self, decoder: &D) -> TgResult<Vec<D::Entity>> {
        let mut input = self.input();
        let count = input.read_i32()?;
        if count < 0 {
            return Err(TgException::io("Invalid entity count")
                .with_details(format!("count={}", count)));
        }
        let count = count as usize;
        let mut entities = Vec::with_capacity(count.min(input.available()));
        for _ in 0..count {
            entities.push(decoder.decode_entity(&mut input)?);
        }
        Ok(entities)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_with_count_prefix() {
        let stream = EntityStream::with_count(3, &[9, 9]);
        assert_eq!(stream.as_bytes(), &[0, 0, 0, 3, 9, 9]);
        assert_eq!(stream.declared_count(), Some(3));
    }

    #[test]
    fn test_capture_leaves_cursor() {
        let data = [0, 0, 0, 1, 0, 0, 0, 2];
        let mut input = InputStream::new(&data);
        input.read_i32().unwrap();
        let stream = EntityStream::capture(&input);
        assert_eq!(input.position(), 4);
        assert_eq!(stream.declared_count(), Some(2));
    }

    #[test]
    fn test_decode_all() {
        let entities = vec![TestEntity::new(1, "a"), TestEntity::new(2, "b")];
        let stream = entity_stream(&entities);
        assert_eq!(stream.decode_all(&TestModel).unwrap(), entities);
    }

    #[test]
    fn test_empty_stream_has_no_count() {
        assert_eq!(EntityStream::default().declared_count(), None);
        assert!(EntityStream::default().decode_all(&TestModel).is_err());
    }

    #[test]
    fn test_decode_all_rejects_negative_count() {
        let stream = EntityStream::with_count(-1, &[]);
        let err = stream.decode_all(&TestModel).unwrap_err();
        assert!(matches!(err, TgException::Io(_)));
        assert_eq!(err.message(), "Invalid entity count");
    }

    #[test]
    fn test_decode_all_count_beyond_bytes() {
        let stream = EntityStream::new(Bytes::from_static(&[0x7f, 0xff, 0xff, 0xff]));
        assert!(stream.decode_all(&TestModel).is_err());

        let one = entity_stream(&[TestEntity::new(1, "a")]);
        let overstated = EntityStream::with_count(3, &one.as_bytes()[4..]);
        assert!(overstated.decode_all(&TestModel).is_err());
    }
}
