//! Payloads shared by several verbs.

use super::Payload;
use crate::exception::{ErrorType, TgException, TgResult};
use crate::protocol::stream::{InputStream, OutputStream};

/// Payload of messages that carry nothing after the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyPayload;

impl Payload for EmptyPayload {
    fn write_payload(&self, _out: &mut OutputStream) -> TgResult<()> {
        Ok(())
    }

    fn read_payload(&mut self, _input: &mut InputStream<'_>) -> TgResult<()> {
        Ok(())
    }
}

/// Server-raised exception, also used for forced session termination.
///
/// Wire layout: `u8 exception type | utf message`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionPayload {
    /// Server exception type
    pub exception_type: u8,
    /// Server message
    pub message: String,
}

impl ExceptionPayload {
    /// Create a payload.
    pub fn new(exception_type: u8, message: impl Into<String>) -> Self {
        Self {
            exception_type,
            message: message.into(),
        }
    }

    /// Convert to an exception of the matching type.
    ///
    /// Types outside the taxonomy become general exceptions so the server
    /// message is kept.
    pub fn to_exception(&self) -> TgException {
        match ErrorType::from_i32(self.exception_type as i32) {
            ErrorType::InvalidErrorCode | ErrorType::Success => {
                TgException::general(self.message.clone())
                    .with_details(format!("exception type {}", self.exception_type))
            }
            error_type => TgException::by_type(
                error_type.as_i32(),
                error_type.code(),
                self.message.clone(),
                "",
            ),
        }
    }
}

impl Payload for ExceptionPayload {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_u8(self.exception_type);
        out.write_utf(&self.message)?;
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.exception_type = input.read_u8()?;
        self.message = input.read_utf()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_payload_layout() {
        let payload = ExceptionPayload::new(3, "gone");
        let mut out = OutputStream::new();
        payload.write_payload(&mut out).unwrap();
        assert_eq!(out.as_bytes(), &[3, 0, 4, b'g', b'o', b'n', b'e']);

        let mut decoded = ExceptionPayload::default();
        decoded
            .read_payload(&mut InputStream::new(out.as_bytes()))
            .unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_to_exception_known_type() {
        let exception = ExceptionPayload::new(4, "link down").to_exception();
        assert!(matches!(exception, TgException::ChannelDisconnected(_)));
        assert_eq!(exception.message(), "link down");
    }

    #[test]
    fn test_to_exception_unknown_type() {
        let exception = ExceptionPayload::new(200, "boom").to_exception();
        assert!(matches!(exception, TgException::General(_)));
        assert_eq!(exception.message(), "boom");
    }

    #[test]
    fn test_truncated_exception_payload() {
        let mut decoded = ExceptionPayload::default();
        assert!(decoded.read_payload(&mut InputStream::new(&[1, 0, 9])).is_err());
    }
}
