//! Metadata request and response payloads.

use super::Payload;
use crate::exception::{TgException, TgResult};
use crate::protocol::model::EntityStream;
use crate::protocol::stream::{InputStream, OutputStream};

/// Metadata request. Carries nothing after the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataRequest;

impl Payload for MetadataRequest {
    fn write_payload(&self, _out: &mut OutputStream) -> TgResult<()> {
        Ok(())
    }

    fn read_payload(&mut self, _input: &mut InputStream<'_>) -> TgResult<()> {
        Ok(())
    }

    fn is_updatable(&self) -> bool {
        true
    }
}

/// Metadata response.
///
/// Wire layout: `i32 group count`, then per group `u8 system type | i32 item
/// count | items`. The groups are left undecoded in a stream that starts at
/// the group count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataResponse {
    /// Declared number of groups
    pub group_count: i32,
    /// Undecoded groups, led by the group count
    pub entity_stream: EntityStream,
}

impl Default for MetadataResponse {
    fn default() -> Self {
        Self::new(EntityStream::with_count(0, &[]))
    }
}

impl MetadataResponse {
    /// Response over a count-prefixed stream.
    pub fn new(entity_stream: EntityStream) -> Self {
        Self {
            group_count: entity_stream.declared_count().unwrap_or(0),
            entity_stream,
        }
    }
}

impl Payload for MetadataResponse {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_raw(self.entity_stream.as_bytes());
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        if input.is_empty() {
            return Err(TgException::io("Metadata response has no data"));
        }
        self.group_count = input.peek_i32()?;
        self.entity_stream = EntityStream::capture(input);
        Ok(())
    }
}
