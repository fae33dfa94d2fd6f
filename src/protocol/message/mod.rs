//! Protocol message types.
//!
//! A [`ProtocolMessage`] pairs the shared [`MessageHeader`] with a typed
//! [`MessageBody`]. Each body variant wraps a payload type implementing
//! [`Payload`]; the envelope codec lives here once instead of per message.

mod auth;
mod basic;
mod entity;
mod handshake;
mod large_object;
mod metadata;
mod query;
mod transaction;

pub use auth::{AuthenticateRequest, AuthenticateResponse};
pub use basic::{EmptyPayload, ExceptionPayload};
pub use entity::{FetchOptions, GetEntityCommand, GetEntityRequest, GetEntityResponse, TraverseRequest};
pub use handshake::{HandshakeRequest, HandshakeRequestType, HandshakeResponse, HandshakeStatus};
pub use large_object::{
    DecryptBufferRequest, DecryptBufferResponse, GetLargeObjectRequest, GetLargeObjectResponse,
};
pub use metadata::{MetadataRequest, MetadataResponse};
pub use query::{QueryCommand, QueryError, QueryRequest, QueryResponse, SortSpec};
pub use transaction::{
    opcode, BeginTransactionResponse, CommitRemap, CommitSection, CommitSet,
    CommitTransactionRequest, CommitTransactionResponse,
};

use std::fmt;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use super::header::MessageHeader;
use super::sequence::SequenceGenerator;
use super::stream::{InputStream, OutputStream};
use super::verb::Verb;
use crate::exception::{TgException, TgResult};

/// Payload encode/decode for one message kind.
pub trait Payload: fmt::Debug + Send + Sync {
    /// Write the payload after the header.
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()>;

    /// Read the payload; `input` is positioned just past the header.
    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()>;

    /// Whether the header of a message carrying this payload may be mutated
    /// after construction.
    fn is_updatable(&self) -> bool {
        false
    }
}

macro_rules! message_set {
    ($($(#[$doc:meta])* $name:ident($payload:ty)),* $(,)?) => {
        /// Typed message payload, one variant per implemented verb.
        #[derive(Debug, Clone, PartialEq)]
        pub enum MessageBody {
            $($(#[$doc])* $name($payload),)*
        }

        impl MessageBody {
            /// Default payload for a verb, or `None` if the verb has no
            /// message type.
            pub fn empty(verb: Verb) -> Option<Self> {
                match verb {
                    $(Verb::$name => Some(MessageBody::$name(<$payload>::default())),)*
                    _ => None,
                }
            }

            /// Verb this payload is sent under.
            pub fn verb(&self) -> Verb {
                match self {
                    $(MessageBody::$name(_) => Verb::$name,)*
                }
            }

            fn payload(&self) -> &dyn Payload {
                match self {
                    $(MessageBody::$name(p) => p,)*
                }
            }

            fn payload_mut(&mut self) -> &mut dyn Payload {
                match self {
                    $(MessageBody::$name(p) => p,)*
                }
            }
        }
    };
}

message_set! {
    /// Heartbeat
    Ping(EmptyPayload),
    /// Handshake request
    HandshakeRequest(HandshakeRequest),
    /// Handshake response
    HandshakeResponse(HandshakeResponse),
    /// Authenticate request
    AuthenticateRequest(AuthenticateRequest),
    /// Authenticate response
    AuthenticateResponse(AuthenticateResponse),
    /// Begin transaction request
    BeginTransactionRequest(EmptyPayload),
    /// Begin transaction response
    BeginTransactionResponse(BeginTransactionResponse),
    /// Commit transaction request
    CommitTransactionRequest(CommitTransactionRequest),
    /// Commit transaction response
    CommitTransactionResponse(CommitTransactionResponse),
    /// Rollback transaction request
    RollbackTransactionRequest(EmptyPayload),
    /// Rollback transaction response
    RollbackTransactionResponse(EmptyPayload),
    /// Query request
    QueryRequest(QueryRequest),
    /// Query response
    QueryResponse(QueryResponse),
    /// Traverse request
    TraverseRequest(TraverseRequest),
    /// Traverse response
    TraverseResponse(EmptyPayload),
    /// Metadata request
    MetadataRequest(MetadataRequest),
    /// Metadata response
    MetadataResponse(MetadataResponse),
    /// Get entity request
    GetEntityRequest(GetEntityRequest),
    /// Get entity response
    GetEntityResponse(GetEntityResponse),
    /// Get large object request
    GetLargeObjectRequest(GetLargeObjectRequest),
    /// Get large object response
    GetLargeObjectResponse(GetLargeObjectResponse),
    /// Dump stacktrace request
    DumpStacktraceRequest(EmptyPayload),
    /// Disconnect channel request
    DisconnectChannelRequest(EmptyPayload),
    /// Session terminated by the server
    SessionForcefullyTerminated(ExceptionPayload),
    /// Decrypt buffer request
    DecryptBufferRequest(DecryptBufferRequest),
    /// Decrypt buffer response
    DecryptBufferResponse(DecryptBufferResponse),
    /// Exception raised by the server
    ExceptionMessage(ExceptionPayload),
    /// Invalid message
    InvalidMessage(EmptyPayload),
}

/// A complete protocol message: envelope plus typed payload.
///
/// The encoded form is cached behind a lock on first [`to_bytes`](Self::to_bytes)
/// and reused until the message is mutated.
#[derive(Debug)]
pub struct ProtocolMessage {
    header: MessageHeader,
    body: MessageBody,
    cache: Mutex<Option<Bytes>>,
}

impl ProtocolMessage {
    /// Create a message with a fresh header.
    pub fn new(body: MessageBody, sequence_no: i64) -> Self {
        Self {
            header: MessageHeader::new(body.verb(), sequence_no),
            body,
            cache: Mutex::new(None),
        }
    }

    /// The envelope.
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// Message kind.
    pub fn verb(&self) -> Verb {
        self.header.verb
    }

    /// Sequence number.
    pub fn sequence_no(&self) -> i64 {
        self.header.sequence_no
    }

    /// Timestamp.
    pub fn timestamp(&self) -> i64 {
        self.header.timestamp
    }

    /// Correlation id.
    pub fn request_id(&self) -> i64 {
        self.header.request_id
    }

    /// Auth token.
    pub fn auth_token(&self) -> i64 {
        self.header.auth_token
    }

    /// Session id.
    pub fn session_id(&self) -> i64 {
        self.header.session_id
    }

    /// Encoded length: the cached buffer's length if encoded, otherwise the
    /// value recorded by the last decode (`-1` if neither happened).
    pub fn buffer_length(&self) -> i32 {
        match self.cache.lock().as_ref() {
            Some(bytes) => bytes.len() as i32,
            None => self.header.buffer_length,
        }
    }

    /// Whether header mutation is allowed.
    pub fn is_updatable(&self) -> bool {
        self.body.payload().is_updatable()
    }

    /// Typed payload.
    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Mutable payload. Invalidates the cached encoding.
    pub fn body_mut(&mut self) -> &mut MessageBody {
        self.invalidate();
        &mut self.body
    }

    /// Consume the message and return its payload.
    pub fn into_body(self) -> MessageBody {
        self.body
    }

    /// Set the correlation id.
    pub fn set_request_id(&mut self, request_id: i64) {
        self.header.request_id = request_id;
        self.invalidate();
    }

    /// Adopt an auth token and session id.
    pub fn set_auth_context(&mut self, auth_token: i64, session_id: i64) {
        self.header.auth_token = auth_token;
        self.header.session_id = session_id;
        self.invalidate();
    }

    /// Set the timestamp.
    ///
    /// Fails with a general exception if the message is not updatable and
    /// `timestamp` is not the `-1` sentinel.
    pub fn set_timestamp(&mut self, timestamp: i64) -> TgResult<()> {
        if !self.is_updatable() && timestamp != -1 {
            return Err(TgException::general(format!(
                "Mutating a readonly message '{}'",
                self.verb().name()
            )));
        }
        self.header.timestamp = timestamp;
        self.invalidate();
        Ok(())
    }

    /// Set the timestamp and, for updatable messages, take a new sequence
    /// number and drop the cached encoding.
    pub fn update_sequence_and_timestamp(
        &mut self,
        sequence: &SequenceGenerator,
        timestamp: i64,
    ) -> TgResult<()> {
        self.set_timestamp(timestamp)?;
        if self.is_updatable() {
            self.header.sequence_no = sequence.next();
            self.header.buffer_length = -1;
        }
        Ok(())
    }

    /// Encode the message, reusing the cached buffer when present.
    pub fn to_bytes(&self) -> TgResult<Bytes> {
        let mut cache = self.cache.lock();
        if let Some(bytes) = cache.as_ref() {
            return Ok(bytes.clone());
        }

        let verb = self.verb();
        if verb.requires_authentication() && !self.header.is_authenticated() {
            return Err(TgException::io("Message not authenticated")
                .with_details(verb.name().to_string()));
        }

        let mut out = OutputStream::new();
        self.header.write_to(&mut out);
        self.body.payload().write_payload(&mut out)?;
        let length = i32::try_from(out.len())
            .map_err(|_| TgException::invalid_message_length("Message exceeds i32 length"))?;
        out.write_i32_at(0, length)?;

        let bytes = out.freeze();
        debug!(
            verb = verb.name(),
            seq = self.header.sequence_no,
            len = bytes.len(),
            "Encoded message"
        );
        *cache = Some(bytes.clone());
        Ok(bytes)
    }

    /// Decode `buffer` into this message in place.
    ///
    /// The buffer must hold exactly one message of this message's verb. On
    /// failure the message is left as it was.
    pub fn from_bytes(&mut self, buffer: &[u8]) -> TgResult<()> {
        let mut input = InputStream::new(buffer);
        let verb = self.verb();
        let header = MessageHeader::read_from(&mut input, verb)?;
        let mut body = self.body.clone();
        body.payload_mut().read_payload(&mut input)?;
        self.header = header;
        self.body = body;
        *self.cache.get_mut() = None;

        debug!(
            verb = verb.name(),
            seq = self.header.sequence_no,
            len = buffer.len(),
            "Decoded message"
        );
        Ok(())
    }

    /// One-line human readable summary. Not a wire format.
    pub fn describe(&self) -> String {
        format!(
            "{}{{seq={}, ts={}, req={}, auth={}, session={}, len={}, updatable={}, body={:?}}}",
            self.verb().name(),
            self.header.sequence_no,
            self.header.timestamp,
            self.header.request_id,
            self.header.auth_token,
            self.header.session_id,
            self.buffer_length(),
            self.is_updatable(),
            self.body,
        )
    }

    fn invalidate(&mut self) {
        *self.cache.get_mut() = None;
    }
}

impl Clone for ProtocolMessage {
    fn clone(&self) -> Self {
        Self {
            header: self.header,
            body: self.body.clone(),
            cache: Mutex::new(self.cache.lock().clone()),
        }
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
