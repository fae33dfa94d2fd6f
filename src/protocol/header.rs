//! Message envelope.
//!
//! Every message starts with the same 54-byte header:
//!
//! ```text
//! i32 length | i32 magic | i16 version | i16 verb | i64 sequence | i64 timestamp
//! | i64 request id | i64 auth token | i64 session id | i16 data offset
//! ```

use super::stream::{InputStream, OutputStream};
use super::verb::Verb;
use super::{MAGIC, PROTOCOL_VERSION};
use crate::exception::{TgException, TgResult};

/// Encoded size of the header in bytes.
pub const HEADER_LENGTH: usize = 54;

/// Byte offset of the verb id inside an encoded message.
pub const VERB_OFFSET: usize = 10;

/// Sentinel for header fields that have not been assigned.
pub const UNSET: i64 = -1;

/// Envelope fields common to every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Total encoded length; `-1` until encoded or decoded
    pub buffer_length: i32,
    /// Message kind
    pub verb: Verb,
    /// Sequence number
    pub sequence_no: i64,
    /// Epoch seconds
    pub timestamp: i64,
    /// Correlation id, `-1` if unset
    pub request_id: i64,
    /// Auth token issued by the server, `-1` until authenticated
    pub auth_token: i64,
    /// Session id issued by the server, `-1` until authenticated
    pub session_id: i64,
    /// Offset at which the payload begins; `-1` until encoded or decoded
    pub data_offset: i16,
}

impl MessageHeader {
    /// Fresh header for an outbound message.
    pub fn new(verb: Verb, sequence_no: i64) -> Self {
        Self {
            buffer_length: -1,
            verb,
            sequence_no,
            timestamp: chrono::Utc::now().timestamp(),
            request_id: UNSET,
            auth_token: UNSET,
            session_id: UNSET,
            data_offset: -1,
        }
    }

    /// Check whether the header carries a usable auth context.
    pub fn is_authenticated(&self) -> bool {
        self.auth_token != UNSET && self.session_id != UNSET
    }

    /// Write the header with a zero length placeholder.
    ///
    /// The caller patches the length at offset 0 once the payload is written.
    pub fn write_to(&self, out: &mut OutputStream) {
        out.write_i32(0);
        out.write_i32(MAGIC);
        out.write_i16(PROTOCOL_VERSION);
        out.write_i16(self.verb.id());
        out.write_i64(self.sequence_no);
        out.write_i64(self.timestamp);
        out.write_i64(self.request_id);
        out.write_i64(self.auth_token);
        out.write_i64(self.session_id);
        let data_offset = out.position() + 2;
        out.write_i16(data_offset as i16);
    }

    /// Read and validate a header for a message of kind `expected`.
    ///
    /// `input` must span exactly one message and be positioned at its start.
    pub fn read_from(input: &mut InputStream<'_>, expected: Verb) -> TgResult<Self> {
        let verb_id = validate_prefix(input)?;
        if verb_id != expected.id() {
            return Err(TgException::bad_verb("Incorrect Message Type")
                .with_details(format!("expected {}, received {}", expected.id(), verb_id)));
        }

        Ok(Self {
            buffer_length: input.len() as i32,
            verb: expected,
            sequence_no: input.read_i64()?,
            timestamp: input.read_i64()?,
            request_id: input.read_i64()?,
            auth_token: input.read_i64()?,
            session_id: input.read_i64()?,
            data_offset: input.read_i16()?,
        })
    }
}

/// Read length, magic, version and verb id, validating the first three.
///
/// Leaves the cursor just past the verb id.
pub(crate) fn validate_prefix(input: &mut InputStream<'_>) -> TgResult<i16> {
    let length = input.read_i32()?;
    if length < 0 || length as usize != input.len() {
        return Err(TgException::invalid_message_length("Buffer length mismatch")
            .with_details(format!("header={}, buffer={}", length, input.len())));
    }

    if input.read_i32()? != MAGIC {
        return Err(TgException::bad_magic("Bad Magic id"));
    }

    let version = input.read_i16()?;
    if version != PROTOCOL_VERSION {
        return Err(TgException::protocol_not_supported("Unsupported protocol version")
            .with_details(format!("0x{:04x}", version)));
    }

    Ok(input.read_i16()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ErrorType;

    fn encoded(header: &MessageHeader) -> Vec<u8> {
        let mut out = OutputStream::new();
        header.write_to(&mut out);
        let len = out.len() as i32;
        out.write_i32_at(0, len).unwrap();
        out.as_bytes().to_vec()
    }

    #[test]
    fn test_header_layout() {
        let header = MessageHeader::new(Verb::Ping, 7);
        let bytes = encoded(&header);
        assert_eq!(bytes.len(), HEADER_LENGTH);
        assert_eq!(&bytes[0..4], &(HEADER_LENGTH as i32).to_be_bytes());
        assert_eq!(&bytes[4..8], &MAGIC.to_be_bytes());
        assert_eq!(&bytes[8..10], &[0x03, 0x00]);
        assert_eq!(&bytes[VERB_OFFSET..VERB_OFFSET + 2], &[0x00, 0x00]);
        assert_eq!(&bytes[12..20], &7i64.to_be_bytes());
        assert_eq!(&bytes[52..54], &54i16.to_be_bytes());
    }

    #[test]
    fn test_new_header_is_unauthenticated() {
        let mut header = MessageHeader::new(Verb::BeginTransactionRequest, 1);
        assert_eq!(header.auth_token, UNSET);
        assert_eq!(header.session_id, UNSET);
        assert!(!header.is_authenticated());

        let bytes = encoded(&header);
        assert_eq!(&bytes[36..52], &[0xFF; 16]);

        header.auth_token = 0;
        header.session_id = 0;
        assert!(header.is_authenticated());
    }

    #[test]
    fn test_read_back() {
        let mut header = MessageHeader::new(Verb::QueryRequest, 42);
        header.request_id = 9;
        header.auth_token = 100;
        header.session_id = 200;
        let bytes = encoded(&header);

        let decoded = MessageHeader::read_from(&mut InputStream::new(&bytes), Verb::QueryRequest)
            .unwrap();
        assert_eq!(decoded.sequence_no, 42);
        assert_eq!(decoded.timestamp, header.timestamp);
        assert_eq!(decoded.request_id, 9);
        assert_eq!(decoded.auth_token, 100);
        assert_eq!(decoded.session_id, 200);
        assert_eq!(decoded.buffer_length, HEADER_LENGTH as i32);
        assert_eq!(decoded.data_offset, HEADER_LENGTH as i16);
    }

    #[test]
    fn test_length_mismatch() {
        let mut bytes = encoded(&MessageHeader::new(Verb::Ping, 1));
        bytes[3] = 0x10;
        let err = MessageHeader::read_from(&mut InputStream::new(&bytes), Verb::Ping).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InvalidMessageLength);
        assert_eq!(err.message(), "Buffer length mismatch");
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encoded(&MessageHeader::new(Verb::Ping, 1));
        bytes[4] ^= 0xFF;
        let err = MessageHeader::read_from(&mut InputStream::new(&bytes), Verb::Ping).unwrap_err();
        assert!(matches!(err, TgException::BadMagic(_)));
    }

    #[test]
    fn test_bad_version() {
        let mut bytes = encoded(&MessageHeader::new(Verb::Ping, 1));
        bytes[8] = 0x02;
        let err = MessageHeader::read_from(&mut InputStream::new(&bytes), Verb::Ping).unwrap_err();
        assert!(matches!(err, TgException::ProtocolNotSupported(_)));
    }

    #[test]
    fn test_bad_verb() {
        let bytes = encoded(&MessageHeader::new(Verb::Ping, 1));
        let err = MessageHeader::read_from(&mut InputStream::new(&bytes), Verb::QueryResponse)
            .unwrap_err();
        assert!(matches!(err, TgException::BadVerb(_)));
        assert_eq!(err.message(), "Incorrect Message Type");
    }

    #[test]
    fn test_truncated_buffer_is_io() {
        let err = MessageHeader::read_from(&mut InputStream::new(&[0, 0]), Verb::Ping).unwrap_err();
        assert!(matches!(err, TgException::Io(_)));
    }
}
