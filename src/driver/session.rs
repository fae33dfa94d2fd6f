//! Protocol session.
//!
//! A [`ProtocolSession`] owns one channel. Connecting runs the handshake and
//! authentication state machines; afterwards every request is stamped with
//! the auth context, sent, and answered by exactly one inbound frame.

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use super::channel::Channel;
use super::config::ConnectionConfig;
use super::connection::TcpChannel;
use super::error::{DriverError, DriverResult};
use super::transaction::{Transaction, TransactionState};
use crate::exception::TgException;
use crate::protocol::message::{
    CommitSet, CommitTransactionRequest, CommitTransactionResponse, DecryptBufferRequest,
    EmptyPayload, GetEntityRequest, GetEntityResponse, GetLargeObjectRequest, MetadataRequest,
    MetadataResponse, QueryRequest, QueryResponse, TraverseRequest,
};
use crate::protocol::{
    AuthContext, Authenticator, Handshake, HandshakeStep, MessageBody, MessageFactory,
    ProductVersion, ProtocolMessage, Verb,
};

// ============================================================================
// SessionState
// ============================================================================

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Authenticated and usable
    Open,
    /// Disconnected by the client
    Closed,
    /// Terminated by the server
    Terminated,
}

// ============================================================================
// ProtocolSession
// ============================================================================

/// Authenticated session over a [`Channel`].
pub struct ProtocolSession<C: Channel> {
    channel: C,
    factory: MessageFactory,
    config: ConnectionConfig,
    auth: AuthContext,
    server_version: Option<ProductVersion>,
    transaction: Transaction,
    state: SessionState,
}

impl ProtocolSession<TcpChannel> {
    /// Open a TCP channel to the configured server and connect over it.
    pub async fn open(config: ConnectionConfig) -> DriverResult<Self> {
        config.validate()?;
        let channel = TcpChannel::connect(&config).await?;
        Self::connect(channel, config).await
    }
}

impl<C: Channel> ProtocolSession<C> {
    /// Handshake and authenticate over `channel`.
    pub async fn connect(channel: C, config: ConnectionConfig) -> DriverResult<Self> {
        Self::connect_with_factory(channel, config, MessageFactory::new()).await
    }

    /// Like [`connect`](Self::connect), drawing sequence numbers from `factory`.
    pub async fn connect_with_factory(
        mut channel: C,
        config: ConnectionConfig,
        factory: MessageFactory,
    ) -> DriverResult<Self> {
        config.validate()?;
        let timeout = config.request_timeout();

        let server_version = match handshake(&mut channel, &factory, &config, timeout).await {
            Ok(version) => version,
            Err(e) => {
                close_after_failure(&mut channel).await;
                return Err(e);
            }
        };

        let auth = match authenticate(&mut channel, &factory, &config, timeout).await {
            Ok(auth) => auth,
            Err(e) => {
                close_after_failure(&mut channel).await;
                return Err(e);
            }
        };

        debug!(
            address = %config.address,
            session = auth.session_id,
            server = ?server_version.map(|v| v.to_string()),
            "Session established"
        );

        Ok(Self {
            channel,
            factory,
            config,
            auth,
            server_version,
            transaction: Transaction::new(),
            state: SessionState::Open,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Auth context issued by the server
    pub fn auth_context(&self) -> &AuthContext {
        &self.auth
    }

    /// Version the server advertised during the handshake
    pub fn server_version(&self) -> Option<ProductVersion> {
        self.server_version
    }

    /// Session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the session can carry requests
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open && self.channel.is_open()
    }

    /// Transaction state
    pub fn transaction_state(&self) -> TransactionState {
        self.transaction.state()
    }

    /// Current transaction
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Message factory
    pub fn factory(&self) -> &MessageFactory {
        &self.factory
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Begin a transaction and return its server id.
    pub async fn begin_transaction(&mut self) -> DriverResult<i64> {
        self.transaction.ensure_can_begin()?;
        match self.request(MessageBody::BeginTransactionRequest(EmptyPayload)).await? {
            MessageBody::BeginTransactionResponse(response) => {
                self.transaction.begin(response.transaction_id)?;
                Ok(response.transaction_id)
            }
            other => Err(unexpected(Verb::BeginTransactionResponse, &other)),
        }
    }

    /// Commit the active transaction.
    ///
    /// A refused commit leaves the transaction [`Failed`](TransactionState::Failed)
    /// and surfaces the server's transaction exception.
    pub async fn commit(&mut self, set: CommitSet) -> DriverResult<CommitTransactionResponse> {
        self.transaction.ensure_active()?;
        let payload = CommitTransactionRequest::new(&set)?;

        let response = match self.request(MessageBody::CommitTransactionRequest(payload)).await {
            Ok(MessageBody::CommitTransactionResponse(response)) => response,
            Ok(other) => {
                self.transaction.mark_failed()?;
                return Err(unexpected(Verb::CommitTransactionResponse, &other));
            }
            Err(e) => {
                if self.transaction.is_active() {
                    self.transaction.mark_failed()?;
                }
                return Err(e);
            }
        };

        if let Some(exception) = &response.exception {
            warn!(
                transaction_id = ?self.transaction.transaction_id(),
                status = ?exception.status(),
                "Commit refused"
            );
            self.transaction.mark_failed()?;
            return Err(TgException::from(exception.clone()).into());
        }

        self.transaction.mark_committed()?;
        Ok(response)
    }

    /// Roll back the active transaction.
    pub async fn rollback(&mut self) -> DriverResult<()> {
        self.transaction.ensure_active()?;
        match self.request(MessageBody::RollbackTransactionRequest(EmptyPayload)).await? {
            MessageBody::RollbackTransactionResponse(_) => self.transaction.mark_rolled_back(),
            other => Err(unexpected(Verb::RollbackTransactionResponse, &other)),
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Run a query. A non-zero server result becomes an error.
    pub async fn query(&mut self, request: QueryRequest) -> DriverResult<QueryResponse> {
        match self.request(MessageBody::QueryRequest(request)).await? {
            MessageBody::QueryResponse(response) => Ok(response.into_result()?),
            other => Err(unexpected(Verb::QueryResponse, &other)),
        }
    }

    /// Fetch entities by key, or page through an open result.
    pub async fn get_entity(&mut self, request: GetEntityRequest) -> DriverResult<GetEntityResponse> {
        match self.request(MessageBody::GetEntityRequest(request)).await? {
            MessageBody::GetEntityResponse(response) => Ok(response),
            other => Err(unexpected(Verb::GetEntityResponse, &other)),
        }
    }

    /// Continue a traversal.
    pub async fn traverse(&mut self, request: TraverseRequest) -> DriverResult<()> {
        match self.request(MessageBody::TraverseRequest(request)).await? {
            MessageBody::TraverseResponse(_) => Ok(()),
            other => Err(unexpected(Verb::TraverseResponse, &other)),
        }
    }

    /// Fetch the content of a large attribute.
    pub async fn get_large_object(&mut self, entity_id: i64, decrypt: bool) -> DriverResult<Bytes> {
        let payload = GetLargeObjectRequest::new(entity_id, decrypt);
        match self.request(MessageBody::GetLargeObjectRequest(payload)).await? {
            MessageBody::GetLargeObjectResponse(response) => Ok(response.buffer),
            other => Err(unexpected(Verb::GetLargeObjectResponse, &other)),
        }
    }

    /// Have the server decrypt a buffer.
    pub async fn decrypt_buffer(&mut self, encrypted: impl Into<Bytes>) -> DriverResult<Bytes> {
        let payload = DecryptBufferRequest::new(encrypted)?;
        match self.request(MessageBody::DecryptBufferRequest(payload)).await? {
            MessageBody::DecryptBufferResponse(response) => Ok(response.decrypted),
            other => Err(unexpected(Verb::DecryptBufferResponse, &other)),
        }
    }

    /// Fetch the schema metadata.
    pub async fn metadata(&mut self) -> DriverResult<MetadataResponse> {
        match self.request(MessageBody::MetadataRequest(MetadataRequest)).await? {
            MessageBody::MetadataResponse(response) => Ok(response),
            other => Err(unexpected(Verb::MetadataResponse, &other)),
        }
    }

    // ------------------------------------------------------------------------
    // Channel control
    // ------------------------------------------------------------------------

    /// Send a ping. The server does not answer.
    pub async fn ping(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        let message = self.stamped(MessageBody::Ping(EmptyPayload));
        send_message(&mut self.channel, &message, self.config.request_timeout()).await
    }

    /// Tell the server the session is ending and close the channel.
    ///
    /// Disconnecting a closed session is a no-op.
    pub async fn disconnect(&mut self) -> DriverResult<()> {
        if self.state != SessionState::Open {
            return Ok(());
        }
        if self.transaction.is_active() {
            warn!(
                transaction_id = ?self.transaction.transaction_id(),
                "Disconnecting with an active transaction"
            );
        }

        let message = self.stamped(MessageBody::DisconnectChannelRequest(EmptyPayload));
        let sent = send_message(&mut self.channel, &message, self.config.request_timeout()).await;
        self.state = SessionState::Closed;
        self.channel.close().await?;
        debug!(session = self.auth.session_id, "Session disconnected");
        sent
    }

    // ------------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------------

    fn ensure_open(&self) -> DriverResult<()> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Closed => Err(DriverError::invalid_state("Session is closed")),
            SessionState::Terminated => Err(DriverError::invalid_state("Session was terminated by the server")),
        }
    }

    fn stamped(&self, body: MessageBody) -> ProtocolMessage {
        let mut message = self.factory.create(body);
        message.set_auth_context(self.auth.auth_token, self.auth.session_id);
        message
    }

    /// One request/response exchange. Server exceptions and forced
    /// termination are turned into errors here.
    async fn request(&mut self, body: MessageBody) -> DriverResult<MessageBody> {
        self.ensure_open()?;
        let message = self.stamped(body);
        let response =
            round_trip(&mut self.channel, &self.factory, &message, self.config.request_timeout()).await?;

        match response.into_body() {
            MessageBody::SessionForcefullyTerminated(payload) => {
                warn!(session = self.auth.session_id, reason = %payload.message, "Session forcefully terminated");
                self.state = SessionState::Terminated;
                close_after_failure(&mut self.channel).await;
                Err(DriverError::SessionTerminated(payload.message))
            }
            MessageBody::ExceptionMessage(payload) => Err(payload.to_exception().into()),
            body => Ok(body),
        }
    }
}

impl<C: Channel> std::fmt::Debug for ProtocolSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolSession")
            .field("address", &self.config.address)
            .field("session_id", &self.auth.session_id)
            .field("state", &self.state)
            .field("transaction", &self.transaction.state())
            .finish()
    }
}

// ============================================================================
// Exchange helpers
// ============================================================================

async fn send_message<C: Channel>(
    channel: &mut C,
    message: &ProtocolMessage,
    timeout: Duration,
) -> DriverResult<()> {
    let frame = message.to_bytes()?;
    debug!(verb = message.verb().name(), seq = message.sequence_no(), len = frame.len(), "Sending");
    tokio::time::timeout(timeout, channel.send(frame))
        .await
        .map_err(|_| DriverError::timeout(format!("Sending {}", message.verb().name())))?
}

async fn round_trip<C: Channel>(
    channel: &mut C,
    factory: &MessageFactory,
    message: &ProtocolMessage,
    timeout: Duration,
) -> DriverResult<ProtocolMessage> {
    send_message(channel, message, timeout).await?;
    let frame = tokio::time::timeout(timeout, channel.receive())
        .await
        .map_err(|_| DriverError::timeout(format!("No response to {}", message.verb().name())))??;

    let response = factory.create_from_buffer(&frame)?;
    debug!(verb = response.verb().name(), seq = response.sequence_no(), len = frame.len(), "Received");
    Ok(response)
}

async fn handshake<C: Channel>(
    channel: &mut C,
    factory: &MessageFactory,
    config: &ConnectionConfig,
    timeout: Duration,
) -> DriverResult<Option<ProductVersion>> {
    let mut handshake =
        Handshake::new(factory.clone(), config.ssl_mode).with_max_rounds(config.max_handshake_rounds);
    let mut request = handshake.initiate()?;

    loop {
        let response = round_trip(channel, factory, &request, timeout).await?;
        match handshake.process(&response) {
            HandshakeStep::SendRequest(next) => request = next,
            HandshakeStep::Authenticate => return Ok(handshake.server_version()),
            HandshakeStep::Failed(e) => return Err(handshake_error(e)),
        }
    }
}

async fn authenticate<C: Channel>(
    channel: &mut C,
    factory: &MessageFactory,
    config: &ConnectionConfig,
    timeout: Duration,
) -> DriverResult<AuthContext> {
    let authenticator = Authenticator::new(factory.clone(), config.credentials());
    let request = authenticator.request().map_err(authentication_error)?;
    let response = round_trip(channel, factory, &request, timeout).await?;
    authenticator.process(&response).map_err(authentication_error)
}

async fn close_after_failure<C: Channel>(channel: &mut C) {
    if let Err(e) = channel.close().await {
        warn!(error = %e, "Failed to close channel");
    }
}

fn handshake_error(e: TgException) -> DriverError {
    match e {
        TgException::ChannelDisconnected(_) => DriverError::SessionTerminated(e.message().to_string()),
        TgException::General(_) => DriverError::handshake(e.to_string()),
        other => DriverError::Protocol(other),
    }
}

fn authentication_error(e: TgException) -> DriverError {
    match e {
        TgException::BadAuthentication { .. } => DriverError::authentication(e.to_string()),
        TgException::ChannelDisconnected(_) => DriverError::SessionTerminated(e.message().to_string()),
        other => DriverError::Protocol(other),
    }
}

fn unexpected(expected: Verb, body: &MessageBody) -> DriverError {
    TgException::bad_verb("Incorrect Message Type")
        .with_details(format!("expected {}, received {}", expected.name(), body.verb().name()))
        .into()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::channel::testing::ScriptedChannel;
    use crate::protocol::message::{
        AuthenticateResponse, BeginTransactionResponse, CommitRemap, DecryptBufferResponse,
        ExceptionPayload, GetLargeObjectResponse, HandshakeRequest, HandshakeRequestType,
        HandshakeResponse,
    };
    use crate::protocol::{EntityStream, SequenceGenerator};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    fn server() -> MessageFactory {
        MessageFactory::with_sequence(SequenceGenerator::new())
    }

    fn reply(channel: &ScriptedChannel, body: MessageBody) {
        channel.push_response(server().create(body).to_bytes().unwrap());
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig::builder("tcp://localhost:8222")
            .unwrap()
            .with_credentials("scott", "tiger")
            .build()
    }

    fn script_login(channel: &ScriptedChannel) {
        reply(channel, MessageBody::HandshakeResponse(HandshakeResponse::accept(ProductVersion::CLIENT)));
        reply(channel, MessageBody::HandshakeResponse(HandshakeResponse::proceed()));
        reply(channel, MessageBody::AuthenticateResponse(AuthenticateResponse::accepted(5, 6, None)));
    }

    async fn connected() -> (ProtocolSession<ScriptedChannel>, ScriptedChannel) {
        init_tracing();
        let channel = ScriptedChannel::new();
        script_login(&channel);
        let session = ProtocolSession::connect_with_factory(channel.clone(), config(), server())
            .await
            .unwrap();
        (session, channel)
    }

    fn sent_message(channel: &ScriptedChannel, index: usize) -> ProtocolMessage {
        server().create_from_buffer(&channel.sent()[index]).unwrap()
    }

    #[tokio::test]
    async fn test_connect_runs_handshake_then_authentication() {
        let (session, channel) = connected().await;

        assert!(session.is_open());
        assert_eq!(session.auth_context().auth_token, 5);
        assert_eq!(session.auth_context().session_id, 6);
        assert_eq!(session.server_version(), Some(ProductVersion::CLIENT));

        let sent = channel.sent();
        assert_eq!(sent.len(), 3);
        match sent_message(&channel, 1).into_body() {
            MessageBody::HandshakeRequest(HandshakeRequest { request_type, .. }) => {
                assert_eq!(request_type, HandshakeRequestType::ChallengeAccepted)
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert_eq!(sent_message(&channel, 2).verb(), Verb::AuthenticateRequest);
    }

    #[tokio::test]
    async fn test_connect_rejected_credentials() {
        let channel = ScriptedChannel::new();
        reply(&channel, MessageBody::HandshakeResponse(HandshakeResponse::accept(ProductVersion::CLIENT)));
        reply(&channel, MessageBody::HandshakeResponse(HandshakeResponse::proceed()));
        reply(&channel, MessageBody::AuthenticateResponse(AuthenticateResponse::rejected(7)));

        let err = ProtocolSession::connect_with_factory(channel.clone(), config(), server())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Authentication(_)));
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_connect_failure_survives_close_error() {
        init_tracing();
        let channel = ScriptedChannel::new();
        channel.fail_close();
        reply(&channel, MessageBody::HandshakeResponse(HandshakeResponse::accept(ProductVersion::CLIENT)));
        reply(&channel, MessageBody::HandshakeResponse(HandshakeResponse::proceed()));
        reply(&channel, MessageBody::AuthenticateResponse(AuthenticateResponse::rejected(7)));

        let err = ProtocolSession::connect_with_factory(channel.clone(), config(), server())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Authentication(_)));
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_connect_version_mismatch() {
        let channel = ScriptedChannel::new();
        let mut version = ProductVersion::CLIENT;
        version.major = 2;
        reply(&channel, MessageBody::HandshakeResponse(HandshakeResponse::accept(version)));

        let err = ProtocolSession::connect_with_factory(channel.clone(), config(), server())
            .await
            .unwrap_err();
        assert!(matches!(err.as_exception(), Some(TgException::VersionMismatch(_))));
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_connect_round_cap() {
        let channel = ScriptedChannel::new();
        for _ in 0..2 {
            reply(&channel, MessageBody::HandshakeResponse(HandshakeResponse::accept(ProductVersion::CLIENT)));
        }
        let mut config = config();
        config.max_handshake_rounds = 1;

        let err = ProtocolSession::connect_with_factory(channel.clone(), config, server())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Handshake(_)));
    }

    #[tokio::test]
    async fn test_connect_requires_user_name() {
        let err = ProtocolSession::connect_with_factory(
            ScriptedChannel::new(),
            ConnectionConfig::default(),
            server(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DriverError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_begin_and_commit() {
        let (mut session, channel) = connected().await;
        reply(
            &channel,
            MessageBody::BeginTransactionResponse(BeginTransactionResponse { transaction_id: 9 }),
        );
        let mut remap = CommitRemap::default();
        remap.updated.insert(100, 2);
        reply(
            &channel,
            MessageBody::CommitTransactionResponse(CommitTransactionResponse::succeeded(remap.clone())),
        );

        assert_eq!(session.begin_transaction().await.unwrap(), 9);
        assert_eq!(session.transaction_state(), TransactionState::Active);

        let response = session.commit(CommitSet::new()).await.unwrap();
        assert_eq!(response.remap, remap);
        assert_eq!(session.transaction_state(), TransactionState::Committed);

        let commit = sent_message(&channel, 4);
        assert_eq!(commit.verb(), Verb::CommitTransactionRequest);
        assert_eq!(commit.auth_token(), 5);
        assert_eq!(commit.session_id(), 6);
    }

    #[tokio::test]
    async fn test_commit_without_begin() {
        let (mut session, channel) = connected().await;
        let err = session.commit(CommitSet::new()).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidState(_)));
        assert_eq!(channel.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_refused_commit_fails_transaction() {
        let (mut session, channel) = connected().await;
        reply(
            &channel,
            MessageBody::BeginTransactionResponse(BeginTransactionResponse { transaction_id: 1 }),
        );
        reply(
            &channel,
            MessageBody::CommitTransactionResponse(CommitTransactionResponse::failed(8008, "stale")),
        );

        session.begin_transaction().await.unwrap();
        let err = session.commit(CommitSet::new()).await.unwrap_err();
        assert!(matches!(err.as_exception(), Some(TgException::Transaction(_))));
        assert_eq!(session.transaction_state(), TransactionState::Failed);

        let err = session.commit(CommitSet::new()).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_rollback() {
        let (mut session, channel) = connected().await;
        reply(
            &channel,
            MessageBody::BeginTransactionResponse(BeginTransactionResponse { transaction_id: 3 }),
        );
        reply(&channel, MessageBody::RollbackTransactionResponse(EmptyPayload));

        session.begin_transaction().await.unwrap();
        session.rollback().await.unwrap();
        assert_eq!(session.transaction_state(), TransactionState::RolledBack);
        assert!(matches!(session.rollback().await, Err(DriverError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_query_success_and_failure() {
        let (mut session, channel) = connected().await;
        reply(
            &channel,
            MessageBody::QueryResponse(QueryResponse::succeeded(77, 0, 0, EntityStream::new(Bytes::new()))),
        );
        reply(
            &channel,
            MessageBody::QueryResponse(QueryResponse::failed(3, Some("syntax error".to_string()))),
        );

        let response = session.query(QueryRequest::execute("g.V()")).await.unwrap();
        assert_eq!(response.query_hash_id, 77);
        assert!(!response.has_result);

        let err = session.query(QueryRequest::execute("g.V(")).await.unwrap_err();
        assert!(matches!(err.as_exception(), Some(TgException::General(_))));
    }

    #[tokio::test]
    async fn test_large_object_and_decrypt() {
        let (mut session, channel) = connected().await;
        reply(
            &channel,
            MessageBody::GetLargeObjectResponse(GetLargeObjectResponse::new(Bytes::from_static(b"blob"))),
        );
        reply(
            &channel,
            MessageBody::DecryptBufferResponse(DecryptBufferResponse::new(Bytes::from_static(b"plain"))),
        );

        assert_eq!(&session.get_large_object(12, false).await.unwrap()[..], b"blob");
        assert_eq!(&session.decrypt_buffer(Bytes::from_static(b"xyz")).await.unwrap()[..], b"plain");
    }

    #[tokio::test]
    async fn test_empty_decrypt_buffer_never_sent() {
        let (mut session, channel) = connected().await;
        let err = session.decrypt_buffer(Bytes::new()).await.unwrap_err();
        assert!(matches!(err.as_exception(), Some(TgException::Io(_))));
        assert_eq!(channel.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_server_exception_becomes_error() {
        let (mut session, channel) = connected().await;
        reply(&channel, MessageBody::ExceptionMessage(ExceptionPayload::new(0, "boom")));

        let err = session.metadata().await.unwrap_err();
        assert_eq!(err.as_exception().map(|e| e.message()), Some("boom"));
        assert!(session.is_open());
    }

    #[tokio::test]
    async fn test_forced_termination_closes_session() {
        let (mut session, channel) = connected().await;
        reply(
            &channel,
            MessageBody::SessionForcefullyTerminated(ExceptionPayload::new(0, "killed by admin")),
        );

        let err = session.metadata().await.unwrap_err();
        assert!(matches!(err, DriverError::SessionTerminated(ref m) if m == "killed by admin"));
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(channel.is_closed());
        assert!(matches!(session.ping().await, Err(DriverError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_forced_termination_with_failing_close() {
        let (mut session, channel) = connected().await;
        channel.fail_close();
        reply(
            &channel,
            MessageBody::SessionForcefullyTerminated(ExceptionPayload::new(0, "shutdown")),
        );

        let err = session.query(QueryRequest::gremlin("g.V()")).await.unwrap_err();
        assert!(matches!(err, DriverError::SessionTerminated(_)));
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[tokio::test]
    async fn test_unexpected_response_verb() {
        let (mut session, channel) = connected().await;
        reply(
            &channel,
            MessageBody::BeginTransactionResponse(BeginTransactionResponse { transaction_id: 1 }),
        );

        let err = session.metadata().await.unwrap_err();
        assert!(matches!(err.as_exception(), Some(TgException::BadVerb(_))));
    }

    #[tokio::test]
    async fn test_ping_and_disconnect() {
        let (mut session, channel) = connected().await;

        session.ping().await.unwrap();
        session.disconnect().await.unwrap();
        session.disconnect().await.unwrap();

        assert_eq!(sent_message(&channel, 3).verb(), Verb::Ping);
        let disconnect = sent_message(&channel, 4);
        assert_eq!(disconnect.verb(), Verb::DisconnectChannelRequest);
        assert_eq!(disconnect.session_id(), 6);
        assert_eq!(channel.sent().len(), 5);
        assert!(channel.is_closed());
        assert!(!session.is_open());
    }
}
