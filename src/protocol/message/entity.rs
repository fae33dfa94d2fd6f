//! Get-entity and traverse payloads, and the fetch options they share.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::Payload;
use crate::exception::{TgException, TgResult};
use crate::protocol::model::EntityStream;
use crate::protocol::stream::{InputStream, OutputStream};

/// Default number of entities fetched per request.
pub const DEFAULT_FETCH_SIZE: i32 = 1000;
/// Default number of entities per batch.
pub const DEFAULT_BATCH_SIZE: i16 = 50;
/// Default traversal depth.
pub const DEFAULT_TRAVERSAL_DEPTH: i16 = 3;
/// Default number of edges followed per node.
pub const DEFAULT_EDGE_LIMIT: i16 = 1000;

/// Result paging and traversal limits.
///
/// Out-of-range values never reach the wire: each setter replaces them with
/// the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFetchOptions")]
pub struct FetchOptions {
    fetch_size: i32,
    batch_size: i16,
    traversal_depth: i16,
    edge_limit: i16,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            fetch_size: DEFAULT_FETCH_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            traversal_depth: DEFAULT_TRAVERSAL_DEPTH,
            edge_limit: DEFAULT_EDGE_LIMIT,
        }
    }
}

impl FetchOptions {
    /// Options with every limit at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from raw values, clamped.
    pub fn with_limits(fetch_size: i32, batch_size: i32, traversal_depth: i32, edge_limit: i32) -> Self {
        let mut options = Self::default();
        options.set_fetch_size(fetch_size);
        options.set_batch_size(batch_size);
        options.set_traversal_depth(traversal_depth);
        options.set_edge_limit(edge_limit);
        options
    }

    /// Fetch size.
    pub fn fetch_size(&self) -> i32 {
        self.fetch_size
    }

    /// Batch size.
    pub fn batch_size(&self) -> i16 {
        self.batch_size
    }

    /// Traversal depth.
    pub fn traversal_depth(&self) -> i16 {
        self.traversal_depth
    }

    /// Edge limit.
    pub fn edge_limit(&self) -> i16 {
        self.edge_limit
    }

    /// Set the fetch size; negative values reset it to 1000.
    pub fn set_fetch_size(&mut self, value: i32) {
        self.fetch_size = if value < 0 { DEFAULT_FETCH_SIZE } else { value };
    }

    /// Set the batch size; values outside `[10, 32767]` reset it to 50.
    pub fn set_batch_size(&mut self, value: i32) {
        self.batch_size = if (10..=i16::MAX as i32).contains(&value) {
            value as i16
        } else {
            DEFAULT_BATCH_SIZE
        };
    }

    /// Set the traversal depth; values outside `[1, 1000]` reset it to 3.
    pub fn set_traversal_depth(&mut self, value: i32) {
        self.traversal_depth = if (1..=1000).contains(&value) {
            value as i16
        } else {
            DEFAULT_TRAVERSAL_DEPTH
        };
    }

    /// Set the edge limit; values outside `[0, 32767]` reset it to 1000.
    pub fn set_edge_limit(&mut self, value: i32) {
        self.edge_limit = if (0..=i16::MAX as i32).contains(&value) {
            value as i16
        } else {
            DEFAULT_EDGE_LIMIT
        };
    }

    /// Write `i32 fetch | i16 batch | i16 depth | i16 edge limit`.
    pub fn write_to(&self, out: &mut OutputStream) {
        out.write_i32(self.fetch_size);
        out.write_i16(self.batch_size);
        out.write_i16(self.traversal_depth);
        out.write_i16(self.edge_limit);
    }

    /// Read the layout written by [`write_to`](Self::write_to), clamping.
    pub fn read_from(input: &mut InputStream<'_>) -> TgResult<Self> {
        let fetch = input.read_i32()?;
        let batch = input.read_i16()?;
        let depth = input.read_i16()?;
        let edge = input.read_i16()?;
        Ok(Self::with_limits(fetch, batch as i32, depth as i32, edge as i32))
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawFetchOptions {
    fetch_size: i32,
    batch_size: i32,
    traversal_depth: i32,
    edge_limit: i32,
}

impl Default for RawFetchOptions {
    fn default() -> Self {
        Self {
            fetch_size: DEFAULT_FETCH_SIZE,
            batch_size: DEFAULT_BATCH_SIZE as i32,
            traversal_depth: DEFAULT_TRAVERSAL_DEPTH as i32,
            edge_limit: DEFAULT_EDGE_LIMIT as i32,
        }
    }
}

impl From<RawFetchOptions> for FetchOptions {
    fn from(raw: RawFetchOptions) -> Self {
        Self::with_limits(raw.fetch_size, raw.batch_size, raw.traversal_depth, raw.edge_limit)
    }
}

/// Get-entity command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum GetEntityCommand {
    /// Fresh lookup
    #[default]
    Get = 0,
    /// Lookup by id
    GetById = 1,
    /// Batch lookup
    GetMultiples = 2,
    /// Next page of an open result
    Continue = 10,
    /// Release an open result
    Close = 20,
}

impl GetEntityCommand {
    /// Decode from the wire value.
    pub fn from_i16(value: i16) -> TgResult<Self> {
        match value {
            0 => Ok(GetEntityCommand::Get),
            1 => Ok(GetEntityCommand::GetById),
            2 => Ok(GetEntityCommand::GetMultiples),
            10 => Ok(GetEntityCommand::Continue),
            20 => Ok(GetEntityCommand::Close),
            other => Err(TgException::io(format!("Invalid get entity command {}", other))),
        }
    }

    /// Whether fetch options follow the command on the wire.
    pub fn carries_fetch_options(self) -> bool {
        matches!(
            self,
            GetEntityCommand::Get | GetEntityCommand::GetById | GetEntityCommand::GetMultiples
        )
    }
}

/// Get-entity request.
///
/// Wire layout: `i16 command | i32 result id`, then for fresh lookups the
/// fetch options followed by the key bytes produced by the object model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetEntityRequest {
    /// Command
    pub command: GetEntityCommand,
    /// Open result id, for continue and close
    pub result_id: i32,
    /// Paging and traversal limits
    pub fetch: FetchOptions,
    /// Encoded lookup key
    pub key: Bytes,
}

impl GetEntityRequest {
    /// Fresh lookup for an encoded key.
    pub fn lookup(key: impl Into<Bytes>, fetch: FetchOptions) -> Self {
        Self {
            command: GetEntityCommand::Get,
            result_id: 0,
            fetch,
            key: key.into(),
        }
    }

    /// Request the next page of an open result.
    pub fn continue_result(result_id: i32) -> Self {
        Self {
            command: GetEntityCommand::Continue,
            result_id,
            ..Self::default()
        }
    }

    /// Release an open result.
    pub fn close_result(result_id: i32) -> Self {
        Self {
            command: GetEntityCommand::Close,
            result_id,
            ..Self::default()
        }
    }
}

impl Payload for GetEntityRequest {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_i16(self.command as i16);
        out.write_i32(self.result_id);
        if self.command.carries_fetch_options() {
            self.fetch.write_to(out);
            out.write_raw(&self.key);
        }
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.command = GetEntityCommand::from_i16(input.read_i16()?)?;
        self.result_id = input.read_i32()?;
        if self.command.carries_fetch_options() {
            self.fetch = FetchOptions::read_from(input)?;
            self.key = Bytes::copy_from_slice(input.read_raw(input.available())?);
        } else {
            self.fetch = FetchOptions::default();
            self.key = Bytes::new();
        }
        Ok(())
    }

    fn is_updatable(&self) -> bool {
        true
    }
}

/// Get-entity response.
///
/// Wire layout: `i32 result id | i32 total count | entities`. The entity
/// stream starts at the total count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetEntityResponse {
    /// Open result id
    pub result_id: i32,
    /// Total number of matching entities
    pub total_count: i32,
    /// Whether anything matched
    pub has_result: bool,
    /// Undecoded entities
    pub entity_stream: EntityStream,
}

impl Default for GetEntityResponse {
    /// No matches, with a zero total so the body encodes and decodes.
    fn default() -> Self {
        Self::new(0, EntityStream::with_count(0, &[]))
    }
}

impl GetEntityResponse {
    /// Response carrying a count-prefixed entity stream.
    pub fn new(result_id: i32, entity_stream: EntityStream) -> Self {
        let total_count = entity_stream.declared_count().unwrap_or(0);
        Self {
            result_id,
            total_count,
            has_result: total_count > 0,
            entity_stream,
        }
    }
}

impl Payload for GetEntityResponse {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_i32(self.result_id);
        out.write_raw(self.entity_stream.as_bytes());
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        if input.is_empty() {
            return Err(TgException::io("Get entity response has no data"));
        }
        self.result_id = input.read_i32()?;
        self.total_count = input.peek_i32()?;
        self.has_result = self.total_count > 0;
        self.entity_stream = EntityStream::capture(input);
        Ok(())
    }
}

/// Traverse request: the get-entity shape without a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraverseRequest {
    /// Command
    pub command: GetEntityCommand,
    /// Open result id
    pub result_id: i32,
    /// Paging and traversal limits
    pub fetch: FetchOptions,
}

impl Payload for TraverseRequest {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_i16(self.command as i16);
        out.write_i32(self.result_id);
        if self.command.carries_fetch_options() {
            self.fetch.write_to(out);
        }
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.command = GetEntityCommand::from_i16(input.read_i16()?)?;
        self.result_id = input.read_i32()?;
        self.fetch = if self.command.carries_fetch_options() {
            FetchOptions::read_from(input)?
        } else {
            FetchOptions::default()
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::model::testing::{entity_stream, TestEntity, TestModel};

    fn encode(payload: &dyn Payload) -> Vec<u8> {
        let mut out = OutputStream::new();
        payload.write_payload(&mut out).unwrap();
        out.as_bytes().to_vec()
    }

    #[test]
    fn test_defaults() {
        let options = FetchOptions::default();
        assert_eq!(options.fetch_size(), 1000);
        assert_eq!(options.batch_size(), 50);
        assert_eq!(options.traversal_depth(), 3);
        assert_eq!(options.edge_limit(), 1000);
    }

    #[test]
    fn test_clamping() {
        let mut options = FetchOptions::default();
        options.set_batch_size(5);
        assert_eq!(options.batch_size(), 50);
        options.set_batch_size(40000);
        assert_eq!(options.batch_size(), 50);
        options.set_batch_size(10);
        assert_eq!(options.batch_size(), 10);

        options.set_traversal_depth(0);
        assert_eq!(options.traversal_depth(), 3);
        options.set_traversal_depth(1001);
        assert_eq!(options.traversal_depth(), 3);
        options.set_traversal_depth(1000);
        assert_eq!(options.traversal_depth(), 1000);

        options.set_edge_limit(-1);
        assert_eq!(options.edge_limit(), 1000);
        options.set_edge_limit(0);
        assert_eq!(options.edge_limit(), 0);

        options.set_fetch_size(-5);
        assert_eq!(options.fetch_size(), 1000);
        options.set_fetch_size(0);
        assert_eq!(options.fetch_size(), 0);
    }

    #[test]
    fn test_fetch_options_deserialize_clamps() {
        let options: FetchOptions =
            serde_json::from_str(r#"{"batch_size": 3, "traversal_depth": 7}"#).unwrap();
        assert_eq!(options.batch_size(), 50);
        assert_eq!(options.traversal_depth(), 7);
        assert_eq!(options.fetch_size(), 1000);
    }

    #[test]
    fn test_get_request_layout() {
        let request = GetEntityRequest::lookup(Bytes::from_static(&[0xAA, 0xBB]), FetchOptions::default());
        let bytes = encode(&request);
        assert_eq!(
            bytes,
            vec![
                0, 0, // command
                0, 0, 0, 0, // result id
                0, 0, 0x03, 0xE8, // fetch 1000
                0, 50, // batch
                0, 3, // depth
                0x03, 0xE8, // edge limit
                0xAA, 0xBB, // key
            ]
        );
        assert!(request.is_updatable());
    }

    #[test]
    fn test_continue_request_has_no_options() {
        let bytes = encode(&GetEntityRequest::continue_result(9));
        assert_eq!(bytes, vec![0, 10, 0, 0, 0, 9]);

        let mut decoded = GetEntityRequest::default();
        decoded.read_payload(&mut InputStream::new(&bytes)).unwrap();
        assert_eq!(decoded, GetEntityRequest::continue_result(9));
    }

    #[test]
    fn test_get_request_round_trip() {
        let request =
            GetEntityRequest::lookup(Bytes::from_static(b"key"), FetchOptions::with_limits(10, 20, 2, 5));
        let mut decoded = GetEntityRequest::default();
        decoded
            .read_payload(&mut InputStream::new(&encode(&request)))
            .unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_invalid_command() {
        let mut decoded = GetEntityRequest::default();
        assert!(decoded
            .read_payload(&mut InputStream::new(&[0, 7, 0, 0, 0, 0]))
            .is_err());
    }

    #[test]
    fn test_response_no_data() {
        let mut response = GetEntityResponse::default();
        let err = response
            .read_payload(&mut InputStream::new(&[]))
            .unwrap_err();
        assert_eq!(err.message(), "Get entity response has no data");
    }

    #[test]
    fn test_response_keeps_total_count_for_stream() {
        let entities = vec![TestEntity::new(1, "a"), TestEntity::new(2, "b")];
        let response = GetEntityResponse::new(4, entity_stream(&entities));
        let mut decoded = GetEntityResponse::default();
        decoded
            .read_payload(&mut InputStream::new(&encode(&response)))
            .unwrap();
        assert_eq!(decoded.result_id, 4);
        assert_eq!(decoded.total_count, 2);
        assert!(decoded.has_result);
        assert_eq!(decoded.entity_stream.decode_all(&TestModel).unwrap(), entities);
    }

    #[test]
    fn test_response_zero_total() {
        let mut decoded = GetEntityResponse::default();
        decoded
            .read_payload(&mut InputStream::new(&[0, 0, 0, 1, 0, 0, 0, 0]))
            .unwrap();
        assert!(!decoded.has_result);
    }

    #[test]
    fn test_default_response_round_trip() {
        let response = GetEntityResponse::default();
        let bytes = encode(&response);
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0, 0]);

        let mut decoded = GetEntityResponse::new(7, entity_stream(&[TestEntity::new(1, "a")]));
        decoded.read_payload(&mut InputStream::new(&bytes)).unwrap();
        assert_eq!(decoded, response);
        assert!(decoded.entity_stream.decode_all(&TestModel).unwrap().is_empty());
    }

    #[test]
    fn test_traverse_request_round_trip() {
        let request = TraverseRequest {
            command: GetEntityCommand::GetById,
            result_id: 3,
            fetch: FetchOptions::with_limits(100, 10, 4, 10),
        };
        let bytes = encode(&request);
        assert_eq!(bytes.len(), 2 + 4 + 10);
        let mut decoded = TraverseRequest::default();
        decoded.read_payload(&mut InputStream::new(&bytes)).unwrap();
        assert_eq!(decoded, request);
    }
}
