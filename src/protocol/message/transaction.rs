//! Transaction payloads: begin, commit and the commit remap.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use super::Payload;
use crate::exception::{TgException, TgResult, TransactionException, TransactionStatus};
use crate::protocol::model::{EntityStream, SectionReader, WireAttributeDescriptor, WireEntity};
use crate::protocol::stream::{InputStream, OutputStream};

/// Commit section opcodes.
pub mod opcode {
    /// New attribute descriptors
    pub const ATTRIBUTE_DESCRIPTORS: i16 = 0x1010;
    /// Added entities
    pub const ADDED: i16 = 0x1011;
    /// Updated entities
    pub const UPDATED: i16 = 0x1012;
    /// Removed entities
    pub const REMOVED: i16 = 0x1013;
    /// Entity stream trailer of a commit response
    pub const ENTITY_STREAM: i16 = 0x6789;
}

/// Size of the sub-length and checksum fields that open commit payloads.
const PREAMBLE_LENGTH: i32 = 8;

/// Begin transaction response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeginTransactionResponse {
    /// Server-assigned transaction id
    pub transaction_id: i64,
}

impl Payload for BeginTransactionResponse {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_i64(self.transaction_id);
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.transaction_id = input.read_i64()?;
        Ok(())
    }
}

/// Changes collected by a transaction, keyed by entity id.
///
/// Consumed once when the commit request is built.
#[derive(Debug, Clone, Default)]
pub struct CommitSet {
    /// New entities, keyed by provisional id
    pub added: BTreeMap<i64, Arc<dyn WireEntity>>,
    /// Modified entities
    pub updated: BTreeMap<i64, Arc<dyn WireEntity>>,
    /// Deleted entities
    pub removed: BTreeMap<i64, Arc<dyn WireEntity>>,
    /// Attribute descriptors touched by the transaction
    pub attribute_descriptors: Vec<Arc<dyn WireAttributeDescriptor>>,
}

impl CommitSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new entity.
    pub fn add(&mut self, entity: Arc<dyn WireEntity>) {
        self.added.insert(entity.virtual_id(), entity);
    }

    /// Record a modified entity.
    pub fn update(&mut self, entity: Arc<dyn WireEntity>) {
        self.updated.insert(entity.virtual_id(), entity);
    }

    /// Record a deleted entity.
    pub fn remove(&mut self, entity: Arc<dyn WireEntity>) {
        self.removed.insert(entity.virtual_id(), entity);
    }

    /// Record an attribute descriptor.
    pub fn add_attribute_descriptor(&mut self, descriptor: Arc<dyn WireAttributeDescriptor>) {
        self.attribute_descriptors.push(descriptor);
    }

    /// Check if there is nothing to commit.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.attribute_descriptors.is_empty()
    }

    fn new_descriptors(&self) -> impl Iterator<Item = &Arc<dyn WireAttributeDescriptor>> {
        self.attribute_descriptors
            .iter()
            .filter(|d| d.attribute_id() < 0)
    }

    /// Write every non-empty section.
    ///
    /// Only descriptors with a provisional (negative) id are sent; the
    /// descriptor section is written whenever the set holds any descriptor.
    fn write_sections(&self, out: &mut OutputStream) -> TgResult<()> {
        if !self.attribute_descriptors.is_empty() {
            out.write_i16(opcode::ATTRIBUTE_DESCRIPTORS);
            out.write_i32(self.new_descriptors().count() as i32);
            for descriptor in self.new_descriptors() {
                descriptor.write_external(out)?;
            }
        }
        for (op, entities) in [
            (opcode::ADDED, &self.added),
            (opcode::UPDATED, &self.updated),
            (opcode::REMOVED, &self.removed),
        ] {
            if entities.is_empty() {
                continue;
            }
            out.write_i16(op);
            out.write_i32(entities.len() as i32);
            for entity in entities.values() {
                entity.write_external(out)?;
            }
        }
        Ok(())
    }
}

/// One section of an encoded commit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSection {
    /// Section opcode
    pub opcode: i16,
    /// Declared item count
    pub count: i32,
}

/// Commit transaction request.
///
/// Wire layout: `i32 sub-length | i32 checksum (0) | sections`. The sub-length
/// counts from its own first byte to the end of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitTransactionRequest {
    sections: Bytes,
}

impl CommitTransactionRequest {
    /// Encode the sections of a commit set.
    pub fn new(set: &CommitSet) -> TgResult<Self> {
        let mut out = OutputStream::new();
        set.write_sections(&mut out)?;
        Ok(Self {
            sections: out.freeze(),
        })
    }

    /// Encoded section bytes.
    pub fn section_bytes(&self) -> &[u8] {
        &self.sections
    }

    /// Walk the encoded sections, using `reader` to skip over the items.
    pub fn read_sections<R: SectionReader + ?Sized>(
        &self,
        reader: &R,
    ) -> TgResult<Vec<CommitSection>> {
        let mut input = InputStream::new(&self.sections);
        let mut sections = Vec::new();
        while !input.is_empty() {
            let op = input.read_i16()?;
            if !matches!(
                op,
                opcode::ATTRIBUTE_DESCRIPTORS | opcode::ADDED | opcode::UPDATED | opcode::REMOVED
            ) {
                return Err(unknown_opcode(op));
            }
            let count = input.read_i32()?;
            for _ in 0..count.max(0) {
                if op == opcode::ATTRIBUTE_DESCRIPTORS {
                    reader.skip_attribute_descriptor(&mut input)?;
                } else {
                    reader.skip_entity(&mut input)?;
                }
            }
            trace!(opcode = op, count, "Read commit section");
            sections.push(CommitSection { opcode: op, count });
        }
        Ok(sections)
    }
}

impl Payload for CommitTransactionRequest {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        let start = out.position();
        out.write_i32(0);
        out.write_i32(0);
        out.write_raw(&self.sections);
        let length = (out.position() - start) as i32;
        out.write_i32_at(start, length)?;
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        let length = input.read_i32()?;
        let _checksum = input.read_i32()?;
        let body = length - PREAMBLE_LENGTH;
        if body < 0 || body as usize > input.available() {
            return Err(TgException::io("Commit buffer length mismatch")
                .with_details(format!("length={}, available={}", length, input.available())));
        }
        self.sections = Bytes::copy_from_slice(input.read_raw(body as usize)?);
        Ok(())
    }
}

/// Final identities assigned by the server on commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRemap {
    /// Provisional descriptor id to real id
    pub attribute_descriptors: BTreeMap<i32, i32>,
    /// Provisional entity id to (real id, version)
    pub added: BTreeMap<i64, (i64, i64)>,
    /// Entity id to new version
    pub updated: BTreeMap<i64, i64>,
    /// Removed entity ids
    pub removed: BTreeSet<i64>,
}

impl CommitRemap {
    /// Check if nothing was remapped.
    pub fn is_empty(&self) -> bool {
        self.attribute_descriptors.is_empty()
            && self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
    }

    fn write_sections(&self, out: &mut OutputStream) {
        if !self.attribute_descriptors.is_empty() {
            out.write_i16(opcode::ATTRIBUTE_DESCRIPTORS);
            out.write_i32(self.attribute_descriptors.len() as i32);
            for (temp, real) in &self.attribute_descriptors {
                out.write_i32(*temp);
                out.write_i32(*real);
            }
        }
        if !self.added.is_empty() {
            out.write_i16(opcode::ADDED);
            out.write_i32(self.added.len() as i32);
            for (temp, (real, version)) in &self.added {
                out.write_i64(*temp);
                out.write_i64(*real);
                out.write_i64(*version);
            }
        }
        if !self.updated.is_empty() {
            out.write_i16(opcode::UPDATED);
            out.write_i32(self.updated.len() as i32);
            for (id, version) in &self.updated {
                out.write_i64(*id);
                out.write_i64(*version);
            }
        }
        if !self.removed.is_empty() {
            out.write_i16(opcode::REMOVED);
            out.write_i32(self.removed.len() as i32);
            for id in &self.removed {
                out.write_i64(*id);
            }
        }
    }
}

/// Commit transaction response.
///
/// A failed commit still decodes successfully; the failure is carried in
/// [`exception`](Self::exception) for the caller to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTransactionResponse {
    /// Raw transaction status
    pub status_code: i32,
    /// Failure reported by the server, if any
    pub exception: Option<TransactionException>,
    /// Identity remap
    pub remap: CommitRemap,
    /// Entities returned with the commit, if any
    pub entity_stream: Option<EntityStream>,
    /// Count declared at the head of the entity stream
    pub entity_count: i32,
}

impl Default for CommitTransactionResponse {
    fn default() -> Self {
        Self {
            status_code: TransactionStatus::Success.code(),
            exception: None,
            remap: CommitRemap::default(),
            entity_stream: None,
            entity_count: 0,
        }
    }
}

impl CommitTransactionResponse {
    /// Successful response.
    pub fn succeeded(remap: CommitRemap) -> Self {
        Self {
            remap,
            ..Self::default()
        }
    }

    /// Failed response for a status code.
    pub fn failed(status_code: i32, message: impl Into<String>) -> Self {
        Self {
            status_code,
            exception: Some(TransactionException::from_status_code(status_code, message)),
            ..Self::default()
        }
    }

    /// Attach an entity stream.
    pub fn with_entity_stream(mut self, stream: EntityStream) -> Self {
        self.entity_count = stream.declared_count().unwrap_or(0);
        self.entity_stream = Some(stream);
        self
    }

    /// Check if the commit succeeded.
    pub fn is_success(&self) -> bool {
        self.exception.is_none()
    }

    /// Convert into the remap or the server's failure.
    pub fn into_result(self) -> Result<CommitRemap, TransactionException> {
        match self.exception {
            Some(exception) => Err(exception),
            None => Ok(self.remap),
        }
    }
}

impl Payload for CommitTransactionResponse {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        let start = out.position();
        out.write_i32(0);
        out.write_i32(0);
        out.write_i32(self.status_code);
        match &self.exception {
            Some(exception) => out.write_utf(exception.message())?,
            None => {
                self.remap.write_sections(out);
                if let Some(stream) = &self.entity_stream {
                    out.write_i16(opcode::ENTITY_STREAM);
                    out.write_raw(stream.as_bytes());
                }
            }
        }
        let length = (out.position() - start) as i32;
        out.write_i32_at(start, length)?;
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        *self = Self::default();
        let _length = input.read_i32()?;
        let _checksum = input.read_i32()?;
        self.status_code = input.read_i32()?;

        if !TransactionStatus::from_code(self.status_code).is_success() {
            let message = if input.is_empty() {
                String::new()
            } else {
                input.read_utf()?
            };
            self.exception = Some(TransactionException::from_status_code(
                self.status_code,
                message,
            ));
            return Ok(());
        }

        while !input.is_empty() {
            let op = input.read_i16()?;
            match op {
                opcode::ATTRIBUTE_DESCRIPTORS => {
                    let count = input.read_i32()?;
                    for _ in 0..count {
                        let temp = input.read_i32()?;
                        let real = input.read_i32()?;
                        self.remap.attribute_descriptors.insert(temp, real);
                    }
                    trace!(count, "Remapped attribute descriptors");
                }
                opcode::ADDED => {
                    let count = input.read_i32()?;
                    for _ in 0..count {
                        let temp = input.read_i64()?;
                        let real = input.read_i64()?;
                        let version = input.read_i64()?;
                        self.remap.added.insert(temp, (real, version));
                    }
                    trace!(count, "Remapped added entities");
                }
                opcode::UPDATED => {
                    let count = input.read_i32()?;
                    for _ in 0..count {
                        let id = input.read_i64()?;
                        let version = input.read_i64()?;
                        self.remap.updated.insert(id, version);
                    }
                    trace!(count, "Remapped updated entities");
                }
                opcode::REMOVED => {
                    let count = input.read_i32()?;
                    for _ in 0..count {
                        self.remap.removed.insert(input.read_i64()?);
                    }
                    trace!(count, "Remapped removed entities");
                }
                opcode::ENTITY_STREAM => {
                    input.mark();
                    self.entity_count = input.read_i32()?;
                    input.reset();
                    self.entity_stream = Some(EntityStream::capture(input));
                    trace!(count = self.entity_count, "Commit entity stream");
                    break;
                }
                other => return Err(unknown_opcode(other)),
            }
        }
        Ok(())
    }
}

fn unknown_opcode(op: i16) -> TgException {
    TgException::io("Unknown commit section opcode").with_details(format!("0x{:04x}", op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::TransactionErrorKind;
    use crate::protocol::model::testing::{entity_stream, TestDescriptor, TestEntity, TestModel};

    fn encode(payload: &dyn Payload) -> Vec<u8> {
        let mut out = OutputStream::new();
        payload.write_payload(&mut out).unwrap();
        out.as_bytes().to_vec()
    }

    fn decode_response(bytes: &[u8]) -> CommitTransactionResponse {
        let mut response = CommitTransactionResponse::default();
        response.read_payload(&mut InputStream::new(bytes)).unwrap();
        response
    }

    fn commit_set(n: i64) -> CommitSet {
        let mut set = CommitSet::new();
        for i in 1..=n {
            set.add(Arc::new(TestEntity::new(-i, "new")));
            set.update(Arc::new(TestEntity::new(100 + i, "changed")));
            set.remove(Arc::new(TestEntity::new(200 + i, "gone")));
            set.add_attribute_descriptor(Arc::new(TestDescriptor::new(-(i as i32), "attr")));
        }
        set
    }

    #[test]
    fn test_empty_commit_request() {
        let request = CommitTransactionRequest::new(&CommitSet::new()).unwrap();
        let bytes = encode(&request);
        assert_eq!(bytes, vec![0, 0, 0, 8, 0, 0, 0, 0]);
        assert!(request.read_sections(&TestModel).unwrap().is_empty());
    }

    #[test]
    fn test_commit_request_section_counts() {
        for n in [1, 5] {
            let request = CommitTransactionRequest::new(&commit_set(n)).unwrap();
            let sections = request.read_sections(&TestModel).unwrap();
            let expected: Vec<_> = [
                opcode::ATTRIBUTE_DESCRIPTORS,
                opcode::ADDED,
                opcode::UPDATED,
                opcode::REMOVED,
            ]
            .iter()
            .map(|&op| CommitSection {
                opcode: op,
                count: n as i32,
            })
            .collect();
            assert_eq!(sections, expected);
        }
    }

    #[test]
    fn test_commit_request_sub_length() {
        let request = CommitTransactionRequest::new(&commit_set(2)).unwrap();
        let bytes = encode(&request);
        let length = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(length as usize, bytes.len());
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);

        let mut decoded = CommitTransactionRequest::default();
        decoded.read_payload(&mut InputStream::new(&bytes)).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_only_provisional_descriptors_sent() {
        let mut set = CommitSet::new();
        set.add_attribute_descriptor(Arc::new(TestDescriptor::new(5, "existing")));
        set.add_attribute_descriptor(Arc::new(TestDescriptor::new(-1, "new")));
        let request = CommitTransactionRequest::new(&set).unwrap();
        let sections = request.read_sections(&TestModel).unwrap();
        assert_eq!(
            sections,
            vec![CommitSection {
                opcode: opcode::ATTRIBUTE_DESCRIPTORS,
                count: 1
            }]
        );
    }

    #[test]
    fn test_existing_descriptors_only_still_write_marker() {
        let mut set = CommitSet::new();
        set.add_attribute_descriptor(Arc::new(TestDescriptor::new(5, "existing")));
        let request = CommitTransactionRequest::new(&set).unwrap();
        assert_eq!(request.section_bytes(), &[0x10, 0x10, 0, 0, 0, 0]);
    }

    #[test]
    fn test_read_sections_unknown_opcode() {
        let request = CommitTransactionRequest {
            sections: Bytes::from_static(&[0x20, 0x00, 0, 0, 0, 0]),
        };
        let err = request.read_sections(&TestModel).unwrap_err();
        assert!(matches!(err, TgException::Io(_)));
    }

    #[test]
    fn test_commit_request_bad_sub_length() {
        let mut request = CommitTransactionRequest::default();
        let err = request
            .read_payload(&mut InputStream::new(&[0, 0, 0, 40, 0, 0, 0, 0]))
            .unwrap_err();
        assert_eq!(err.message(), "Commit buffer length mismatch");
    }

    #[test]
    fn test_response_remap_round_trip() {
        for n in [0i64, 1, 4] {
            let mut remap = CommitRemap::default();
            for i in 1..=n {
                remap.attribute_descriptors.insert(-(i as i32), 1000 + i as i32);
                remap.added.insert(-i, (5000 + i, 1));
                remap.updated.insert(100 + i, 2);
                remap.removed.insert(200 + i);
            }
            let response = CommitTransactionResponse::succeeded(remap.clone());
            let decoded = decode_response(&encode(&response));
            assert!(decoded.is_success());
            assert_eq!(decoded.remap, remap);
            assert_eq!(decoded.remap.added.len() as i64, n);
        }
    }

    #[test]
    fn test_response_entity_stream_ends_sections() {
        let mut remap = CommitRemap::default();
        remap.added.insert(-1, (10, 1));
        let stream = entity_stream(&[TestEntity::new(10, "node")]);
        let response = CommitTransactionResponse::succeeded(remap).with_entity_stream(stream.clone());
        let decoded = decode_response(&encode(&response));
        assert_eq!(decoded.entity_count, 1);
        assert_eq!(decoded.entity_stream.as_ref(), Some(&stream));
        assert_eq!(
            decoded.entity_stream.unwrap().decode_all(&TestModel).unwrap(),
            vec![TestEntity::new(10, "node")]
        );
    }

    #[test]
    fn test_response_status_mapping() {
        let cases = [
            (8001, TransactionErrorKind::AlreadyInProgress),
            (8002, TransactionErrorKind::Base),
            (8003, TransactionErrorKind::MalFormed),
            (8004, TransactionErrorKind::GeneralError),
            (8005, TransactionErrorKind::VerificationError),
            (8006, TransactionErrorKind::InBadState),
            (8007, TransactionErrorKind::UniqueConstraintViolation),
            (8008, TransactionErrorKind::OptimisticLockFailed),
            (8009, TransactionErrorKind::ResourceExceeded),
            (8010, TransactionErrorKind::Base),
            (8011, TransactionErrorKind::UniqueIndexKeyAttributeNullError),
            (4242, TransactionErrorKind::Base),
        ];
        for (code, kind) in cases {
            let response = CommitTransactionResponse::failed(code, "rejected");
            let decoded = decode_response(&encode(&response));
            let exception = decoded.exception.as_ref().unwrap();
            assert_eq!(exception.kind(), kind, "status {}", code);
            assert_eq!(exception.message(), "rejected");
            assert!(decoded.remap.is_empty());
        }
    }

    #[test]
    fn test_failed_response_without_message() {
        let bytes = [0, 0, 0, 12, 0, 0, 0, 0, 0, 0, 0x1F, 0x43];
        let decoded = decode_response(&bytes);
        let exception = decoded.into_result().unwrap_err();
        assert_eq!(exception.status(), TransactionStatus::MalFormed);
        assert!(exception.message().is_empty());
    }

    #[test]
    fn test_response_unknown_opcode() {
        let bytes = [0, 0, 0, 14, 0, 0, 0, 0, 0, 0, 0, 0, 0x55, 0x55];
        let mut response = CommitTransactionResponse::default();
        let err = response
            .read_payload(&mut InputStream::new(&bytes))
            .unwrap_err();
        assert_eq!(err.message(), "Unknown commit section opcode");
    }

    #[test]
    fn test_begin_transaction_response() {
        let response = BeginTransactionResponse { transaction_id: 77 };
        let mut decoded = BeginTransactionResponse::default();
        decoded
            .read_payload(&mut InputStream::new(&encode(&response)))
            .unwrap();
        assert_eq!(decoded.transaction_id, 77);
    }
}
