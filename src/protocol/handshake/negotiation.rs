//! Handshake state machine.

use tracing::{debug, warn};

use super::ProductVersion;
use crate::exception::{TgException, TgResult};
use crate::protocol::factory::MessageFactory;
use crate::protocol::message::{
    HandshakeRequest, HandshakeRequestType, HandshakeStatus, MessageBody, ProtocolMessage,
};

/// Default cap on challenge rounds.
pub const DEFAULT_MAX_ROUNDS: u32 = 3;

/// Where the handshake stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing sent yet
    Idle,
    /// `Initiate` sent
    Initiated,
    /// `ChallengeAccepted` sent
    ChallengeAccepted,
    /// Server allowed authentication
    Complete,
    /// Handshake failed
    Failed,
}

/// What the caller must do after a response.
#[derive(Debug)]
pub enum HandshakeStep {
    /// Send this request and feed the next response back
    SendRequest(ProtocolMessage),
    /// Handshake is complete; authenticate next
    Authenticate,
    /// Handshake failed
    Failed(TgException),
}

/// Client side of the handshake. Performs no I/O.
#[derive(Debug)]
pub struct Handshake {
    factory: MessageFactory,
    ssl_mode: bool,
    max_rounds: u32,
    rounds: u32,
    state: HandshakeState,
    request: Option<ProtocolMessage>,
    server_version: Option<ProductVersion>,
}

impl Handshake {
    /// Create a handshake drawing messages from `factory`.
    pub fn new(factory: MessageFactory, ssl_mode: bool) -> Self {
        Self {
            factory,
            ssl_mode,
            max_rounds: DEFAULT_MAX_ROUNDS,
            rounds: 0,
            state: HandshakeState::Idle,
            request: None,
            server_version: None,
        }
    }

    /// Cap the number of challenge rounds.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Server version, once the server has advertised it.
    pub fn server_version(&self) -> Option<ProductVersion> {
        self.server_version
    }

    /// Build the `Initiate` request.
    pub fn initiate(&mut self) -> TgResult<ProtocolMessage> {
        if self.state != HandshakeState::Idle {
            return Err(TgException::general("Handshake already initiated"));
        }

        let challenge: i64 = rand::random();
        let request = self.factory.create(MessageBody::HandshakeRequest(HandshakeRequest::new(
            HandshakeRequestType::Initiate,
            self.ssl_mode,
            challenge,
        )));
        debug!(seq = request.sequence_no(), ssl = self.ssl_mode, "Initiating handshake");

        self.state = HandshakeState::Initiated;
        self.request = Some(request.clone());
        Ok(request)
    }

    /// Consume a server response and decide the next step.
    pub fn process(&mut self, response: &ProtocolMessage) -> HandshakeStep {
        let step = match response.body() {
            MessageBody::HandshakeResponse(payload) => match (self.state, payload.status) {
                (HandshakeState::Initiated, HandshakeStatus::AcceptChallenge)
                | (HandshakeState::ChallengeAccepted, HandshakeStatus::AcceptChallenge) => {
                    self.accept_challenge(payload.server_version())
                }
                (HandshakeState::ChallengeAccepted, HandshakeStatus::ProceedWithAuthentication) => {
                    HandshakeStep::Authenticate
                }
                (_, HandshakeStatus::ChallengeFailed) => HandshakeStep::Failed(
                    TgException::general("Handshake Failed")
                        .with_details(payload.error_message.clone().unwrap_or_default()),
                ),
                (state, status) => HandshakeStep::Failed(
                    TgException::general("Handshake Failed")
                        .with_details(format!("unexpected {:?} in {:?}", status, state)),
                ),
            },
            MessageBody::SessionForcefullyTerminated(payload) => {
                HandshakeStep::Failed(TgException::channel_disconnected(payload.message.clone()))
            }
            MessageBody::ExceptionMessage(payload) => HandshakeStep::Failed(
                TgException::general("Handshake Failed").with_details(payload.message.clone()),
            ),
            other => HandshakeStep::Failed(
                TgException::general("Handshake Failed")
                    .with_details(format!("unexpected {}", other.verb().name())),
            ),
        };

        self.state = match &step {
            HandshakeStep::SendRequest(_) => HandshakeState::ChallengeAccepted,
            HandshakeStep::Authenticate => HandshakeState::Complete,
            HandshakeStep::Failed(err) => {
                warn!(error = %err, "Handshake failed");
                HandshakeState::Failed
            }
        };
        step
    }

    fn accept_challenge(&mut self, server_version: ProductVersion) -> HandshakeStep {
        self.rounds += 1;
        if self.rounds > self.max_rounds {
            return HandshakeStep::Failed(
                TgException::general("Handshake Failed")
                    .with_details(format!("exceeded {} challenge rounds", self.max_rounds)),
            );
        }

        self.server_version = Some(server_version);
        if !ProductVersion::CLIENT.is_compatible_with(&server_version) {
            return HandshakeStep::Failed(TgException::version_mismatch(format!(
                "Client version {} is not compatible with server version {}",
                ProductVersion::CLIENT,
                server_version
            )));
        }
        debug!(server = %server_version, round = self.rounds, "Server accepted challenge");

        match self.build_accepted_request() {
            Ok(request) => HandshakeStep::SendRequest(request),
            Err(err) => HandshakeStep::Failed(err),
        }
    }

    fn build_accepted_request(&mut self) -> TgResult<ProtocolMessage> {
        let mut request = match self.request.take() {
            Some(request) => request,
            None => return Err(TgException::general("Handshake not initiated")),
        };
        request.update_sequence_and_timestamp(self.factory.sequence(), -1)?;
        if let MessageBody::HandshakeRequest(payload) = request.body_mut() {
            payload.request_type = HandshakeRequestType::ChallengeAccepted;
            payload.ssl_mode = self.ssl_mode;
            payload.challenge = ProductVersion::CLIENT.to_i64();
        }
        self.request = Some(request.clone());
        Ok(request)
    }
}
