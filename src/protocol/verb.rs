//! Verb table.
//!
//! The numeric ids are part of the wire format. Renumbering any of them breaks
//! compatibility with the server.

use std::fmt;

/// Message kind identifier carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i16)]
pub enum Verb {
    /// Heartbeat
    Ping = 0,
    /// Handshake request
    HandshakeRequest = 1,
    /// Handshake response
    HandshakeResponse = 2,
    /// Authenticate request
    AuthenticateRequest = 3,
    /// Authenticate response
    AuthenticateResponse = 4,
    /// Begin transaction request
    BeginTransactionRequest = 5,
    /// Begin transaction response
    BeginTransactionResponse = 6,
    /// Commit transaction request
    CommitTransactionRequest = 7,
    /// Commit transaction response
    CommitTransactionResponse = 8,
    /// Rollback transaction request
    RollbackTransactionRequest = 9,
    /// Rollback transaction response
    RollbackTransactionResponse = 10,
    /// Query request
    QueryRequest = 11,
    /// Query response
    QueryResponse = 12,
    /// Traverse request
    TraverseRequest = 13,
    /// Traverse response
    TraverseResponse = 14,
    /// Admin request
    AdminRequest = 15,
    /// Admin response
    AdminResponse = 16,
    /// Metadata request
    MetadataRequest = 19,
    /// Metadata response
    MetadataResponse = 20,
    /// Get entity request
    GetEntityRequest = 21,
    /// Get entity response
    GetEntityResponse = 22,
    /// Get large object request
    GetLargeObjectRequest = 23,
    /// Get large object response
    GetLargeObjectResponse = 24,
    /// Begin export request
    BeginExportRequest = 25,
    /// Begin export response
    BeginExportResponse = 26,
    /// Partial export request
    PartialExportRequest = 27,
    /// Partial export response
    PartialExportResponse = 28,
    /// Cancel export request
    CancelExportRequest = 29,
    /// Begin import request
    BeginImportRequest = 31,
    /// Begin import response
    BeginImportResponse = 32,
    /// Partial import request
    PartialImportRequest = 33,
    /// Partial import response
    PartialImportResponse = 34,
    /// Dump stacktrace request
    DumpStacktraceRequest = 39,
    /// Disconnect channel request
    DisconnectChannelRequest = 40,
    /// Session forcefully terminated by the server
    SessionForcefullyTerminated = 41,
    /// Decrypt buffer request
    DecryptBufferRequest = 44,
    /// Decrypt buffer response
    DecryptBufferResponse = 45,
    /// Generic exception raised by the server
    ExceptionMessage = 100,
    /// Invalid message
    InvalidMessage = -1,
}

/// Immutable catalog entry for a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerbDescriptor {
    /// Wire id
    pub id: i16,
    /// Display name
    pub name: &'static str,
}

impl Verb {
    /// Every verb in the catalog, ordered by id with `InvalidMessage` first.
    pub const ALL: [Verb; 39] = [
        Verb::InvalidMessage,
        Verb::Ping,
        Verb::HandshakeRequest,
        Verb::HandshakeResponse,
        Verb::AuthenticateRequest,
        Verb::AuthenticateResponse,
        Verb::BeginTransactionRequest,
        Verb::BeginTransactionResponse,
        Verb::CommitTransactionRequest,
        Verb::CommitTransactionResponse,
        Verb::RollbackTransactionRequest,
        Verb::RollbackTransactionResponse,
        Verb::QueryRequest,
        Verb::QueryResponse,
        Verb::TraverseRequest,
        Verb::TraverseResponse,
        Verb::AdminRequest,
        Verb::AdminResponse,
        Verb::MetadataRequest,
        Verb::MetadataResponse,
        Verb::GetEntityRequest,
        Verb::GetEntityResponse,
        Verb::GetLargeObjectRequest,
        Verb::GetLargeObjectResponse,
        Verb::BeginExportRequest,
        Verb::BeginExportResponse,
        Verb::PartialExportRequest,
        Verb::PartialExportResponse,
        Verb::CancelExportRequest,
        Verb::BeginImportRequest,
        Verb::BeginImportResponse,
        Verb::PartialImportRequest,
        Verb::PartialImportResponse,
        Verb::DumpStacktraceRequest,
        Verb::DisconnectChannelRequest,
        Verb::SessionForcefullyTerminated,
        Verb::DecryptBufferRequest,
        Verb::DecryptBufferResponse,
        Verb::ExceptionMessage,
    ];

    /// Look up a verb by wire id, returning `None` for unknown ids.
    pub fn try_from_id(id: i16) -> Option<Self> {
        let verb = match id {
            -1 => Verb::InvalidMessage,
            0 => Verb::Ping,
            1 => Verb::HandshakeRequest,
            2 => Verb::HandshakeResponse,
            3 => Verb::AuthenticateRequest,
            4 => Verb::AuthenticateResponse,
            5 => Verb::BeginTransactionRequest,
            6 => Verb::BeginTransactionResponse,
            7 => Verb::CommitTransactionRequest,
            8 => Verb::CommitTransactionResponse,
            9 => Verb::RollbackTransactionRequest,
            10 => Verb::RollbackTransactionResponse,
            11 => Verb::QueryRequest,
            12 => Verb::QueryResponse,
            13 => Verb::TraverseRequest,
            14 => Verb::TraverseResponse,
            15 => Verb::AdminRequest,
            16 => Verb::AdminResponse,
            19 => Verb::MetadataRequest,
            20 => Verb::MetadataResponse,
            21 => Verb::GetEntityRequest,
            22 => Verb::GetEntityResponse,
            23 => Verb::GetLargeObjectRequest,
            24 => Verb::GetLargeObjectResponse,
            25 => Verb::BeginExportRequest,
            26 => Verb::BeginExportResponse,
            27 => Verb::PartialExportRequest,
            28 => Verb::PartialExportResponse,
            29 => Verb::CancelExportRequest,
            31 => Verb::BeginImportRequest,
            32 => Verb::BeginImportResponse,
            33 => Verb::PartialImportRequest,
            34 => Verb::PartialImportResponse,
            39 => Verb::DumpStacktraceRequest,
            40 => Verb::DisconnectChannelRequest,
            41 => Verb::SessionForcefullyTerminated,
            44 => Verb::DecryptBufferRequest,
            45 => Verb::DecryptBufferResponse,
            100 => Verb::ExceptionMessage,
            _ => return None,
        };
        Some(verb)
    }

    /// Look up a verb by wire id. Unknown ids map to [`Verb::InvalidMessage`].
    pub fn from_id(id: i16) -> Self {
        Self::try_from_id(id).unwrap_or(Verb::InvalidMessage)
    }

    /// Wire id.
    pub fn id(self) -> i16 {
        self as i16
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Verb::Ping => "VerbPingMessage",
            Verb::HandshakeRequest => "VerbHandShakeRequest",
            Verb::HandshakeResponse => "VerbHandShakeResponse",
            Verb::AuthenticateRequest => "VerbAuthenticateRequest",
            Verb::AuthenticateResponse => "VerbAuthenticateResponse",
            Verb::BeginTransactionRequest => "VerbBeginTransactionRequest",
            Verb::BeginTransactionResponse => "VerbBeginTransactionResponse",
            Verb::CommitTransactionRequest => "VerbCommitTransactionRequest",
            Verb::CommitTransactionResponse => "VerbCommitTransactionResponse",
            Verb::RollbackTransactionRequest => "VerbRollbackTransactionRequest",
            Verb::RollbackTransactionResponse => "VerbRollbackTransactionResponse",
            Verb::QueryRequest => "VerbQueryRequest",
            Verb::QueryResponse => "VerbQueryResponse",
            Verb::TraverseRequest => "VerbTraverseRequest",
            Verb::TraverseResponse => "VerbTraverseResponse",
            Verb::AdminRequest => "VerbAdminRequest",
            Verb::AdminResponse => "VerbAdminResponse",
            Verb::MetadataRequest => "VerbMetadataRequest",
            Verb::MetadataResponse => "VerbMetadataResponse",
            Verb::GetEntityRequest => "VerbGetEntityRequest",
            Verb::GetEntityResponse => "VerbGetEntityResponse",
            Verb::GetLargeObjectRequest => "VerbGetLargeObjectRequest",
            Verb::GetLargeObjectResponse => "VerbGetLargeObjectResponse",
            Verb::BeginExportRequest => "VerbBeginExportRequest",
            Verb::BeginExportResponse => "VerbBeginExportResponse",
            Verb::PartialExportRequest => "VerbPartialExportRequest",
            Verb::PartialExportResponse => "VerbPartialExportResponse",
            Verb::CancelExportRequest => "VerbCancelExportRequest",
            Verb::BeginImportRequest => "VerbBeginImportRequest",
            Verb::BeginImportResponse => "VerbBeginImportResponse",
            Verb::PartialImportRequest => "VerbPartialImportRequest",
            Verb::PartialImportResponse => "VerbPartialImportResponse",
            Verb::DumpStacktraceRequest => "VerbDumpStacktraceRequest",
            Verb::DisconnectChannelRequest => "VerbDisconnectChannelRequest",
            Verb::SessionForcefullyTerminated => "VerbSessionForcefullyTerminated",
            Verb::DecryptBufferRequest => "VerbDecryptBufferRequest",
            Verb::DecryptBufferResponse => "VerbDecryptBufferResponse",
            Verb::ExceptionMessage => "VerbExceptionMessage",
            Verb::InvalidMessage => "VerbInvalidMessage",
        }
    }

    /// Catalog entry for this verb.
    pub fn descriptor(self) -> VerbDescriptor {
        VerbDescriptor {
            id: self.id(),
            name: self.name(),
        }
    }

    /// Whether this client implements a message type for the verb.
    ///
    /// Admin and bulk export/import verbs are catalogued but not implemented.
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            Verb::AdminRequest
                | Verb::AdminResponse
                | Verb::BeginExportRequest
                | Verb::BeginExportResponse
                | Verb::PartialExportRequest
                | Verb::PartialExportResponse
                | Verb::CancelExportRequest
                | Verb::BeginImportRequest
                | Verb::BeginImportResponse
                | Verb::PartialImportRequest
                | Verb::PartialImportResponse
        )
    }

    /// Whether the verb is sent by the client.
    pub fn is_request(self) -> bool {
        matches!(
            self,
            Verb::Ping
                | Verb::HandshakeRequest
                | Verb::AuthenticateRequest
                | Verb::BeginTransactionRequest
                | Verb::CommitTransactionRequest
                | Verb::RollbackTransactionRequest
                | Verb::QueryRequest
                | Verb::TraverseRequest
                | Verb::AdminRequest
                | Verb::MetadataRequest
                | Verb::GetEntityRequest
                | Verb::GetLargeObjectRequest
                | Verb::BeginExportRequest
                | Verb::PartialExportRequest
                | Verb::CancelExportRequest
                | Verb::BeginImportRequest
                | Verb::PartialImportRequest
                | Verb::DumpStacktraceRequest
                | Verb::DisconnectChannelRequest
                | Verb::DecryptBufferRequest
        )
    }

    /// Whether the verb may only be sent once a session is authenticated.
    pub fn requires_authentication(self) -> bool {
        matches!(
            self,
            Verb::BeginTransactionRequest
                | Verb::CommitTransactionRequest
                | Verb::RollbackTransactionRequest
                | Verb::QueryRequest
                | Verb::TraverseRequest
                | Verb::MetadataRequest
                | Verb::GetEntityRequest
                | Verb::GetLargeObjectRequest
                | Verb::DecryptBufferRequest
                | Verb::DisconnectChannelRequest
        )
    }

    /// Verb the server answers a request with, if any.
    pub fn response_verb(self) -> Option<Verb> {
        match self {
            Verb::HandshakeRequest => Some(Verb::HandshakeResponse),
            Verb::AuthenticateRequest => Some(Verb::AuthenticateResponse),
            Verb::BeginTransactionRequest => Some(Verb::BeginTransactionResponse),
            Verb::CommitTransactionRequest => Some(Verb::CommitTransactionResponse),
            Verb::RollbackTransactionRequest => Some(Verb::RollbackTransactionResponse),
            Verb::QueryRequest => Some(Verb::QueryResponse),
            Verb::TraverseRequest => Some(Verb::TraverseResponse),
            Verb::AdminRequest => Some(Verb::AdminResponse),
            Verb::MetadataRequest => Some(Verb::MetadataResponse),
            Verb::GetEntityRequest => Some(Verb::GetEntityResponse),
            Verb::GetLargeObjectRequest => Some(Verb::GetLargeObjectResponse),
            Verb::DecryptBufferRequest => Some(Verb::DecryptBufferResponse),
            Verb::BeginExportRequest => Some(Verb::BeginExportResponse),
            Verb::PartialExportRequest => Some(Verb::PartialExportResponse),
            Verb::BeginImportRequest => Some(Verb::BeginImportResponse),
            Verb::PartialImportRequest => Some(Verb::PartialImportResponse),
            _ => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}

/// Iterate the full verb catalog.
pub fn catalog() -> impl Iterator<Item = VerbDescriptor> {
    Verb::ALL.iter().map(|v| v.descriptor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_unique_and_round_trip() {
        let mut seen = HashSet::new();
        for verb in Verb::ALL {
            assert!(seen.insert(verb.id()), "duplicate id {}", verb.id());
            assert_eq!(Verb::try_from_id(verb.id()), Some(verb));
        }
        assert_eq!(seen.len(), Verb::ALL.len());
    }

    #[test]
    fn test_wire_ids() {
        assert_eq!(Verb::Ping.id(), 0);
        assert_eq!(Verb::CommitTransactionResponse.id(), 8);
        assert_eq!(Verb::GetLargeObjectResponse.id(), 24);
        assert_eq!(Verb::DumpStacktraceRequest.id(), 39);
        assert_eq!(Verb::SessionForcefullyTerminated.id(), 41);
        assert_eq!(Verb::ExceptionMessage.id(), 100);
        assert_eq!(Verb::InvalidMessage.id(), -1);
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(Verb::try_from_id(17), None);
        assert_eq!(Verb::try_from_id(30), None);
        assert_eq!(Verb::from_id(999), Verb::InvalidMessage);
    }

    #[test]
    fn test_names() {
        assert_eq!(Verb::Ping.name(), "VerbPingMessage");
        assert_eq!(Verb::HandshakeRequest.name(), "VerbHandShakeRequest");
        assert_eq!(Verb::QueryResponse.to_string(), "VerbQueryResponse(12)");
    }

    #[test]
    fn test_catalog_covers_all() {
        assert_eq!(catalog().count(), Verb::ALL.len());
        assert!(catalog().any(|d| d.id == 45 && d.name == "VerbDecryptBufferResponse"));
    }

    #[test]
    fn test_unsupported_verbs() {
        assert!(!Verb::AdminRequest.is_supported());
        assert!(!Verb::PartialImportResponse.is_supported());
        assert!(Verb::DumpStacktraceRequest.is_supported());
        assert!(Verb::InvalidMessage.is_supported());
    }

    #[test]
    fn test_response_pairs() {
        for verb in Verb::ALL {
            if let Some(response) = verb.response_verb() {
                assert!(verb.is_request());
                assert!(!response.is_request());
                assert_eq!(response.id(), verb.id() + 1);
            }
        }
    }
}
