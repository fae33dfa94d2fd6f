//! Handshake request and response payloads.

use super::Payload;
use crate::exception::{TgException, TgResult};
use crate::protocol::handshake::ProductVersion;
use crate::protocol::stream::{InputStream, OutputStream};

/// Handshake request type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeRequestType {
    /// Not set
    #[default]
    Invalid = 0,
    /// First round
    Initiate = 1,
    /// Reply to an accepted challenge
    ChallengeAccepted = 2,
}

impl HandshakeRequestType {
    /// Decode from the wire byte.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => HandshakeRequestType::Initiate,
            2 => HandshakeRequestType::ChallengeAccepted,
            _ => HandshakeRequestType::Invalid,
        }
    }
}

/// Handshake response status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeStatus {
    /// Not set
    #[default]
    Invalid = 0,
    /// Server accepted the challenge; continue negotiating
    AcceptChallenge = 1,
    /// Negotiation complete; authenticate next
    ProceedWithAuthentication = 2,
    /// Negotiation failed; an error message follows
    ChallengeFailed = 3,
}

impl HandshakeStatus {
    /// Decode from the wire byte.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => HandshakeStatus::AcceptChallenge,
            2 => HandshakeStatus::ProceedWithAuthentication,
            3 => HandshakeStatus::ChallengeFailed,
            _ => HandshakeStatus::Invalid,
        }
    }
}

/// Handshake request.
///
/// Wire layout: `u8 request type | bool ssl | i64 challenge`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request type
    pub request_type: HandshakeRequestType,
    /// Whether the client wants TLS
    pub ssl_mode: bool,
    /// Challenge nonce, or the packed client version when accepting
    pub challenge: i64,
}

impl HandshakeRequest {
    /// Create a request.
    pub fn new(request_type: HandshakeRequestType, ssl_mode: bool, challenge: i64) -> Self {
        Self {
            request_type,
            ssl_mode,
            challenge,
        }
    }
}

impl Payload for HandshakeRequest {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_u8(self.request_type as u8);
        out.write_bool(self.ssl_mode);
        out.write_i64(self.challenge);
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.request_type = HandshakeRequestType::from_u8(input.read_u8()?);
        self.ssl_mode = input.read_bool()?;
        self.challenge = input.read_i64()?;
        Ok(())
    }

    fn is_updatable(&self) -> bool {
        true
    }
}

/// Handshake response.
///
/// Wire layout: `u8 status | i64 challenge`, then `bytes error` only when the
/// status is [`HandshakeStatus::ChallengeFailed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// Response status
    pub status: HandshakeStatus,
    /// Challenge; carries the packed server version on `AcceptChallenge`
    pub challenge: i64,
    /// Failure reason, present only on `ChallengeFailed`
    pub error_message: Option<String>,
}

impl HandshakeResponse {
    /// Response accepting the challenge and advertising a server version.
    pub fn accept(server_version: ProductVersion) -> Self {
        Self {
            status: HandshakeStatus::AcceptChallenge,
            challenge: server_version.to_i64(),
            error_message: None,
        }
    }

    /// Response letting the client authenticate.
    pub fn proceed() -> Self {
        Self {
            status: HandshakeStatus::ProceedWithAuthentication,
            challenge: 0,
            error_message: None,
        }
    }

    /// Failed response.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: HandshakeStatus::ChallengeFailed,
            challenge: 0,
            error_message: Some(message.into()),
        }
    }

    /// Server version packed into the challenge.
    pub fn server_version(&self) -> ProductVersion {
        ProductVersion::from_i64(self.challenge)
    }
}

impl Payload for HandshakeResponse {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_u8(self.status as u8);
        out.write_i64(self.challenge);
        if self.status == HandshakeStatus::ChallengeFailed {
            let message = self.error_message.as_deref().unwrap_or_default();
            out.write_bytes(message.as_bytes())?;
        }
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.status = HandshakeStatus::from_u8(input.read_u8()?);
        self.challenge = input.read_i64()?;
        self.error_message = if self.status == HandshakeStatus::ChallengeFailed {
            let bytes = input.read_bytes()?;
            let message = String::from_utf8(bytes.to_vec())
                .map_err(|e| TgException::io(format!("Invalid handshake error text: {}", e)))?;
            Some(message)
        } else {
            None
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_response(bytes: &[u8]) -> TgResult<HandshakeResponse> {
        let mut response = HandshakeResponse::default();
        let mut input = InputStream::new(bytes);
        response.read_payload(&mut input)?;
        assert!(input.is_empty());
        Ok(response)
    }

    #[test]
    fn test_request_layout() {
        let request = HandshakeRequest::new(HandshakeRequestType::Initiate, true, 0x0102);
        let mut out = OutputStream::new();
        request.write_payload(&mut out).unwrap();
        assert_eq!(out.as_bytes(), &[1, 1, 0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert!(request.is_updatable());
    }

    #[test]
    fn test_failed_response_reads_message() {
        let mut out = OutputStream::new();
        HandshakeResponse::failed("bad challenge")
            .write_payload(&mut out)
            .unwrap();
        let response = decode_response(out.as_bytes()).unwrap();
        assert_eq!(response.status, HandshakeStatus::ChallengeFailed);
        assert_eq!(response.error_message.as_deref(), Some("bad challenge"));
    }

    #[test]
    fn test_accept_response_has_no_message() {
        // trailing bytes after the challenge are not part of this branch
        let mut bytes = vec![1, 0, 0, 0, 0, 0, 0, 0, 3];
        let response = decode_response(&bytes).unwrap();
        assert_eq!(response.status, HandshakeStatus::AcceptChallenge);
        assert_eq!(response.error_message, None);
        assert_eq!(response.server_version().major, 3);

        bytes.extend_from_slice(&[0, 0, 0, 1, b'x']);
        let mut response = HandshakeResponse::default();
        let mut input = InputStream::new(&bytes);
        response.read_payload(&mut input).unwrap();
        assert_eq!(input.available(), 5);
    }

    #[test]
    fn test_unknown_status_is_invalid() {
        let response = decode_response(&[9, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(response.status, HandshakeStatus::Invalid);
    }
}
