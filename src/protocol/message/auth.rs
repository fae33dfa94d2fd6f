//! Authenticate request and response payloads.

use std::fmt;

use bytes::Bytes;

use super::Payload;
use crate::exception::TgResult;
use crate::protocol::stream::{InputStream, OutputStream};

/// Authenticate request.
///
/// Wire layout: marker-prefixed client id, inbox address and user name
/// (`true` marker means absent), then `bytes password`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthenticateRequest {
    /// Client identifier
    pub client_id: Option<String>,
    /// Inbox address
    pub inbox_address: Option<String>,
    /// User name
    pub user_name: Option<String>,
    /// Password bytes
    pub password: Vec<u8>,
}

impl AuthenticateRequest {
    /// Create a request for a user.
    pub fn new(user_name: impl Into<String>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            client_id: None,
            inbox_address: None,
            user_name: Some(user_name.into()),
            password: password.into(),
        }
    }

    /// Set the client id.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the inbox address.
    pub fn with_inbox_address(mut self, inbox_address: impl Into<String>) -> Self {
        self.inbox_address = Some(inbox_address.into());
        self
    }
}

impl fmt::Debug for AuthenticateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticateRequest")
            .field("client_id", &self.client_id)
            .field("inbox_address", &self.inbox_address)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Payload for AuthenticateRequest {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_optional_utf(self.client_id.as_deref())?;
        out.write_optional_utf(self.inbox_address.as_deref())?;
        out.write_optional_utf(self.user_name.as_deref())?;
        out.write_bytes(&self.password)?;
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        self.client_id = input.read_optional_utf()?;
        self.inbox_address = input.read_optional_utf()?;
        self.user_name = input.read_optional_utf()?;
        self.password = input.read_bytes()?.to_vec();
        Ok(())
    }
}

/// Authenticate response.
///
/// Wire layout: `bool success`, then `i32 error status` on failure, or
/// `i64 auth token | i64 session id | bytes certificate` on success. The
/// certificate is optional.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticateResponse {
    /// Whether the credentials were accepted
    pub success: bool,
    /// Failure status, present only on failure
    pub error_status: Option<i32>,
    /// Issued auth token
    pub auth_token: i64,
    /// Issued session id
    pub session_id: i64,
    /// Server certificate, present only on success
    pub server_certificate: Option<Bytes>,
}

impl Default for AuthenticateResponse {
    /// Rejected with an unknown status, matching what the writer emits for it.
    fn default() -> Self {
        Self::rejected(-1)
    }
}

impl AuthenticateResponse {
    /// Successful response.
    pub fn accepted(auth_token: i64, session_id: i64, certificate: Option<Bytes>) -> Self {
        Self {
            success: true,
            error_status: None,
            auth_token,
            session_id,
            server_certificate: certificate,
        }
    }

    /// Failed response.
    pub fn rejected(error_status: i32) -> Self {
        Self {
            success: false,
            error_status: Some(error_status),
            auth_token: 0,
            session_id: 0,
            server_certificate: None,
        }
    }
}

impl fmt::Debug for AuthenticateResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticateResponse")
            .field("success", &self.success)
            .field("error_status", &self.error_status)
            .field("auth_token", &self.auth_token)
            .field("session_id", &self.session_id)
            .field(
                "server_certificate_len",
                &self.server_certificate.as_ref().map(Bytes::len),
            )
            .finish()
    }
}

impl Payload for AuthenticateResponse {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        out.write_bool(self.success);
        if !self.success {
            out.write_i32(self.error_status.unwrap_or(-1));
            return Ok(());
        }
        out.write_i64(self.auth_token);
        out.write_i64(self.session_id);
        if let Some(certificate) = &self.server_certificate {
            out.write_bytes(certificate)?;
        }
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        if !input.read_bool()? {
            *self = Self::rejected(input.read_i32()?);
            return Ok(());
        }
        let auth_token = input.read_i64()?;
        let session_id = input.read_i64()?;
        let certificate = if input.is_empty() {
            None
        } else {
            Some(Bytes::copy_from_slice(input.read_bytes()?))
        };
        *self = Self::accepted(auth_token, session_id, certificate);
        Ok(())
    }
}
