//! Authentication flow.
//!
//! Runs after a completed handshake: one request carrying the credentials,
//! one response carrying either a failure status or the issued auth token and
//! session id.

use std::fmt;

use bytes::Bytes;
use tracing::{debug, warn};

use super::factory::MessageFactory;
use super::message::{AuthenticateRequest, MessageBody, ProtocolMessage};
use crate::exception::{TgException, TgResult};

/// Realm reported on authentication failures.
pub const AUTH_REALM: &str = "tgdb";

/// User credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub user_name: String,
    /// Password bytes
    pub password: Vec<u8>,
    /// Client identifier
    pub client_id: Option<String>,
    /// Inbox address
    pub inbox_address: Option<String>,
}

impl Credentials {
    /// Credentials for a user.
    pub fn new(user_name: impl Into<String>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
            client_id: None,
            inbox_address: None,
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

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("inbox_address", &self.inbox_address)
            .finish()
    }
}

/// Auth context issued by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Auth token
    pub auth_token: i64,
    /// Session id
    pub session_id: i64,
    /// Server certificate, if the server sent one
    pub server_certificate: Option<Bytes>,
}

/// Builds the authenticate request and interprets its response.
#[derive(Debug, Clone)]
pub struct Authenticator {
    factory: MessageFactory,
    credentials: Credentials,
}

impl Authenticator {
    /// Create an authenticator.
    pub fn new(factory: MessageFactory, credentials: Credentials) -> Self {
        Self {
            factory,
            credentials,
        }
    }

    /// Build the authenticate request.
    pub fn request(&self) -> TgResult<ProtocolMessage> {
        if self.credentials.user_name.is_empty() {
            return Err(TgException::bad_authentication("User name is required", AUTH_REALM));
        }

        let mut payload = AuthenticateRequest::new(
            self.credentials.user_name.clone(),
            self.credentials.password.clone(),
        );
        payload.client_id = self.credentials.client_id.clone();
        payload.inbox_address = self.credentials.inbox_address.clone();

        let request = self.factory.create(MessageBody::AuthenticateRequest(payload));
        debug!(user = %self.credentials.user_name, seq = request.sequence_no(), "Authenticating");
        Ok(request)
    }

    /// Interpret the server's answer.
    pub fn process(&self, response: &ProtocolMessage) -> TgResult<AuthContext> {
        match response.body() {
            MessageBody::AuthenticateResponse(payload) if payload.success => {
                debug!(
                    session = payload.session_id,
                    certificate_len = payload.server_certificate.as_ref().map(Bytes::len),
                    "Authenticated"
                );
                Ok(AuthContext {
                    auth_token: payload.auth_token,
                    session_id: payload.session_id,
                    server_certificate: payload.server_certificate.clone(),
                })
            }
            MessageBody::AuthenticateResponse(payload) => {
                let status = payload.error_status.unwrap_or(-1);
                warn!(user = %self.credentials.user_name, status, "Authentication rejected");
                Err(TgException::bad_authentication(
                    format!("Bad username/password combination for '{}'", self.credentials.user_name),
                    AUTH_REALM,
                )
                .with_details(format!("error status {}", status)))
            }
            MessageBody::SessionForcefullyTerminated(payload) => {
                Err(TgException::channel_disconnected(payload.message.clone()))
            }
            MessageBody::ExceptionMessage(payload) => Err(payload.to_exception()),
            other => Err(TgException::bad_verb("Incorrect Message Type")
                .with_details(format!("expected authenticate response, received {}", other.verb().name()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::{AuthenticateResponse, ExceptionPayload};
    use crate::protocol::sequence::SequenceGenerator;

    fn authenticator(credentials: Credentials) -> Authenticator {
        Authenticator::new(MessageFactory::with_sequence(SequenceGenerator::new()), credentials)
    }

    fn response(payload: AuthenticateResponse) -> ProtocolMessage {
        ProtocolMessage::new(MessageBody::AuthenticateResponse(payload), 1)
    }

    #[test]
    fn test_request_carries_credentials() {
        let auth = authenticator(Credentials::new("scott", b"tiger".to_vec()).with_client_id("c1"));
        let request = auth.request().unwrap();
        match request.body() {
            MessageBody::AuthenticateRequest(payload) => {
                assert_eq!(payload.user_name.as_deref(), Some("scott"));
                assert_eq!(payload.password, b"tiger".to_vec());
                assert_eq!(payload.client_id.as_deref(), Some("c1"));
                assert_eq!(payload.inbox_address, None);
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert!(request.to_bytes().is_ok());
    }

    #[test]
    fn test_missing_user_name() {
        let err = authenticator(Credentials::default()).request().unwrap_err();
        assert_eq!(err.realm(), Some(AUTH_REALM));
    }

    #[test]
    fn test_success_yields_context() {
        let auth = authenticator(Credentials::new("u", b"p".to_vec()));
        let context = auth
            .process(&response(AuthenticateResponse::accepted(
                5,
                6,
                Some(Bytes::from_static(b"cert")),
            )))
            .unwrap();
        assert_eq!(context.auth_token, 5);
        assert_eq!(context.session_id, 6);
        assert_eq!(context.server_certificate, Some(Bytes::from_static(b"cert")));
    }

    #[test]
    fn test_rejection_is_bad_authentication() {
        let auth = authenticator(Credentials::new("u", b"p".to_vec()));
        let err = auth.process(&response(AuthenticateResponse::rejected(7))).unwrap_err();
        assert!(matches!(err, TgException::BadAuthentication { .. }));
        assert_eq!(err.realm(), Some(AUTH_REALM));
        assert_eq!(err.record().details, "error status 7");
    }

    #[test]
    fn test_server_exception() {
        let auth = authenticator(Credentials::new("u", b"p".to_vec()));
        let err = auth
            .process(&ProtocolMessage::new(
                MessageBody::ExceptionMessage(ExceptionPayload::new(11, "denied")),
                1,
            ))
            .unwrap_err();
        assert!(matches!(err, TgException::Security(_)));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let text = format!("{:?}", Credentials::new("u", b"secret".to_vec()));
        assert!(!text.contains("secret"));
    }
}
