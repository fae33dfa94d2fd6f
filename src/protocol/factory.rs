//! Message factory.
//!
//! Builds outbound messages with sequence numbers from one generator and
//! turns inbound frames into typed messages by peeking their verb.

use tracing::{debug, warn};

use super::header::validate_prefix;
use super::message::{MessageBody, ProtocolMessage};
use super::sequence::SequenceGenerator;
use super::stream::InputStream;
use super::verb::Verb;
use crate::exception::{TgException, TgResult};

/// Creates protocol messages.
#[derive(Debug, Clone)]
pub struct MessageFactory {
    sequence: SequenceGenerator,
}

impl Default for MessageFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFactory {
    /// Factory drawing sequence numbers from the process-wide generator.
    pub fn new() -> Self {
        Self::with_sequence(SequenceGenerator::global())
    }

    /// Factory drawing sequence numbers from `sequence`.
    pub fn with_sequence(sequence: SequenceGenerator) -> Self {
        Self { sequence }
    }

    /// The sequence generator.
    pub fn sequence(&self) -> &SequenceGenerator {
        &self.sequence
    }

    /// Empty message of kind `verb` with the next sequence number.
    ///
    /// Verbs without a message type fail with an I/O exception.
    pub fn create_empty(&self, verb: Verb) -> TgResult<ProtocolMessage> {
        let body = MessageBody::empty(verb).ok_or_else(|| unsupported(verb))?;
        Ok(ProtocolMessage::new(body, self.sequence.next()))
    }

    /// Wrap a body in a message with the next sequence number.
    pub fn create(&self, body: MessageBody) -> ProtocolMessage {
        ProtocolMessage::new(body, self.sequence.next())
    }

    /// Empty message of kind `verb` carrying an auth context.
    pub fn create_with_auth_context(
        &self,
        verb: Verb,
        auth_token: i64,
        session_id: i64,
    ) -> TgResult<ProtocolMessage> {
        let mut message = self.create_empty(verb)?;
        message.set_auth_context(auth_token, session_id);
        Ok(message)
    }

    /// Decode one complete frame into a typed message.
    pub fn create_from_buffer(&self, buffer: &[u8]) -> TgResult<ProtocolMessage> {
        let id = validate_prefix(&mut InputStream::new(buffer))?;
        let verb = Verb::try_from_id(id).ok_or_else(|| {
            warn!(id, "Received message with unknown verb");
            TgException::io("invalid message type")
        })?;
        let body = MessageBody::empty(verb).ok_or_else(|| {
            warn!(verb = verb.name(), "Received message with no message type");
            unsupported(verb)
        })?;

        // The decoded header replaces the placeholder sequence number.
        let mut message = ProtocolMessage::new(body, 0);
        message.from_bytes(buffer)?;
        debug!(verb = verb.name(), seq = message.sequence_no(), "Created message from buffer");
        Ok(message)
    }

    /// Verb of an encoded frame, after length, magic and version checks.
    pub fn verb_of(&self, buffer: &[u8]) -> TgResult<Verb> {
        let mut input = InputStream::new(buffer);
        let id = validate_prefix(&mut input)?;
        Ok(Verb::from_id(id))
    }
}

fn unsupported(verb: Verb) -> TgException {
    TgException::io(format!("AttributeTypeInvalid Message Type '{}'", verb.name()))
}
