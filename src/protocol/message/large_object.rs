//! Large object and decrypt buffer payloads.

use bytes::Bytes;

use super::Payload;
use crate::exception::{TgException, TgResult};
use crate::protocol::stream::{InputStream, OutputStream};

/// Large object fetch.
///
/// Wire layout: `i64 entity id | bool decrypt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetLargeObjectRequest {
    /// Entity owning the large object
    pub entity_id: i64,
    /// Whether the server should decrypt before sending
    pub decrypt: bool,
}

impl GetLargeObjectRequest {
    /// Create a request.
    pub fn new(entity_id: i64, decrypt: bool) -> Self {
        Self { entity_id, decrypt }
    }
}

impl Payload for GetLargeObjectRequest {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_i64(self.entity_id);
        out.write_bool(self.decrypt);
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.entity_id = input.read_i64()?;
        self.decrypt = input.read_bool()?;
        Ok(())
    }

    fn is_updatable(&self) -> bool {
        true
    }
}

/// Large object contents. Everything after the header belongs to the object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetLargeObjectResponse {
    /// Object bytes
    pub buffer: Bytes,
}

impl GetLargeObjectResponse {
    /// Create a response.
    pub fn new(buffer: impl Into<Bytes>) -> Self {
        Self {
            buffer: buffer.into(),
        }
    }
}

impl Payload for GetLargeObjectResponse {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_raw(&self.buffer);
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.buffer = Bytes::copy_from_slice(input.read_raw(input.available())?);
        Ok(())
    }
}

/// Server-side decryption of a buffer.
///
/// Wire layout: `bytes encrypted`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptBufferRequest {
    /// Encrypted bytes
    pub encrypted: Bytes,
}

impl DecryptBufferRequest {
    /// Create a request. An empty buffer fails with an I/O exception.
    pub fn new(encrypted: impl Into<Bytes>) -> TgResult<Self> {
        let encrypted = encrypted.into();
        if encrypted.is_empty() {
            return Err(TgException::io("Encrypted Buffer is EMPTY"));
        }
        Ok(Self { encrypted })
    }
}

impl Payload for DecryptBufferRequest {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_bytes(&self.encrypted)?;
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.encrypted = Bytes::copy_from_slice(input.read_bytes()?);
        Ok(())
    }
}

/// Decrypted buffer.
///
/// Wire layout: `bytes decrypted`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptBufferResponse {
    /// Decrypted bytes
    pub decrypted: Bytes,
}

impl DecryptBufferResponse {
    /// Create a response.
    pub fn new(decrypted: impl Into<Bytes>) -> Self {
        Self {
            decrypted: decrypted.into(),
        }
    }
}

impl Payload for DecryptBufferResponse {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_bytes(&self.decrypted)?;
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.decrypted = Bytes::copy_from_slice(input.read_bytes()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_object_request_layout() {
        let request = GetLargeObjectRequest::new(0x0102, true);
        let mut out = OutputStream::new();
        request.write_payload(&mut out).unwrap();
        assert_eq!(out.as_bytes(), &[0, 0, 0, 0, 0, 0, 0x01, 0x02, 1]);
        assert!(request.is_updatable());
    }

    #[test]
    fn test_large_object_response_takes_remaining_bytes() {
        let mut response = GetLargeObjectResponse::default();
        let mut input = InputStream::new(b"blob-data");
        response.read_payload(&mut input).unwrap();
        assert_eq!(&response.buffer[..], b"blob-data");
        assert!(input.is_empty());
    }

    #[test]
    fn test_empty_decrypt_request_rejected() {
        let err = DecryptBufferRequest::new(Bytes::new()).unwrap_err();
        assert!(matches!(err, TgException::Io(_)));
        assert_eq!(err.message(), "Encrypted Buffer is EMPTY");
    }

    #[test]
    fn test_default_decrypt_request_round_trip() {
        let mut out = OutputStream::new();
        DecryptBufferRequest::default().write_payload(&mut out).unwrap();
        assert_eq!(out.as_bytes(), &[0, 0, 0, 0]);

        let mut decoded = DecryptBufferRequest {
            encrypted: Bytes::from_static(b"stale"),
        };
        decoded
            .read_payload(&mut InputStream::new(out.as_bytes()))
            .unwrap();
        assert_eq!(decoded, DecryptBufferRequest::default());
    }

    #[test]
    fn test_decrypt_round_trip() {
        let request = DecryptBufferRequest::new(Bytes::from_static(b"\x01\x02\x03")).unwrap();
        let mut out = OutputStream::new();
        request.write_payload(&mut out).unwrap();
        assert_eq!(out.as_bytes(), &[0, 0, 0, 3, 1, 2, 3]);

        let response = DecryptBufferResponse::new(Bytes::from_static(b"plain"));
        let mut out = OutputStream::new();
        response.write_payload(&mut out).unwrap();
        let mut decoded = DecryptBufferResponse::default();
        decoded
            .read_payload(&mut InputStream::new(out.as_bytes()))
            .unwrap();
        assert_eq!(decoded, response);
    }
}
