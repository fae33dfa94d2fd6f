//! Error records and the exception taxonomy.

use std::fmt;

use super::error_type::ErrorType;
use super::transaction::{TransactionErrorKind, TransactionException, TransactionStatus};

/// Result type for protocol operations.
pub type TgResult<T> = Result<T, TgException>;

/// Common payload of every error in the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Code name (e.g. `"TGErrorBadMagic"`)
    pub code: String,
    /// Numeric error type
    pub error_type: ErrorType,
    /// Human readable message
    pub message: String,
    /// Additional details
    pub details: String,
}

impl ErrorRecord {
    /// Create a record from its parts.
    pub fn new(
        code: impl Into<String>,
        error_type: ErrorType,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            error_type,
            message: message.into(),
            details: details.into(),
        }
    }

    /// Predefined record for an error type: code name set, message and details empty.
    pub fn predefined(error_type: ErrorType) -> Self {
        Self::new(error_type.code(), error_type, "", "")
    }

    /// Predefined record looked up by code name. Unknown names yield the
    /// `InvalidErrorCode` record.
    pub fn predefined_by_code(code: &str) -> Self {
        Self::predefined(ErrorType::from_code(code))
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ErrorCode: {}, ErrorType: {}, ErrorMessage: {}, ErrorDetails: {}",
            self.code,
            self.error_type.as_i32(),
            self.message,
            self.details
        )
    }
}

/// Protocol exception taxonomy.
///
/// One variant per error type; every variant carries an [`ErrorRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TgException {
    /// Not an error; only produced when a caller asks for type 0
    Success(ErrorRecord),
    /// Credentials were rejected
    BadAuthentication {
        /// Error record
        record: ErrorRecord,
        /// Authentication realm
        realm: String,
    },
    /// Envelope magic mismatch
    BadMagic(ErrorRecord),
    /// Envelope verb mismatch
    BadVerb(ErrorRecord),
    /// Channel disconnected
    ChannelDisconnected(ErrorRecord),
    /// Connection timed out
    ConnectionTimeout(ErrorRecord),
    /// General failure
    General(ErrorRecord),
    /// Envelope length mismatch
    InvalidMessageLength(ErrorRecord),
    /// Stream failure
    Io(ErrorRecord),
    /// Unsupported protocol version
    ProtocolNotSupported(ErrorRecord),
    /// Retryable stream failure
    RetryIo(ErrorRecord),
    /// Security failure
    Security(ErrorRecord),
    /// Transaction failure, refined by kind
    Transaction(TransactionException),
    /// Type coercion not supported
    TypeCoercionNotSupported(ErrorRecord),
    /// Type not supported
    TypeNotSupported(ErrorRecord),
    /// Client/server version mismatch
    VersionMismatch(ErrorRecord),
    /// Unknown error code
    InvalidErrorCode(ErrorRecord),
}

impl TgException {
    /// Default exception for a numeric error type. Unknown codes produce
    /// [`TgException::InvalidErrorCode`].
    pub fn create_by_type(error_type: i32) -> Self {
        Self::from_record(ErrorRecord::predefined(ErrorType::from_i32(error_type)))
    }

    /// Fully parameterized exception for a numeric error type.
    ///
    /// Unknown codes produce the predefined `InvalidErrorCode` record and the
    /// caller's fields are dropped.
    pub fn by_type(
        error_type: i32,
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        match ErrorType::from_i32(error_type) {
            ErrorType::InvalidErrorCode => {
                Self::InvalidErrorCode(ErrorRecord::predefined(ErrorType::InvalidErrorCode))
            }
            known => Self::from_record(ErrorRecord::new(code, known, message, details)),
        }
    }

    /// Predefined exception looked up by code name.
    pub fn predefined(code: &str) -> Self {
        Self::from_record(ErrorRecord::predefined_by_code(code))
    }

    /// Wrap a record in the variant matching its error type.
    pub fn from_record(record: ErrorRecord) -> Self {
        match record.error_type {
            ErrorType::Success => Self::Success(record),
            ErrorType::BadAuthentication => Self::BadAuthentication {
                record,
                realm: String::new(),
            },
            ErrorType::BadMagic => Self::BadMagic(record),
            ErrorType::BadVerb => Self::BadVerb(record),
            ErrorType::ChannelDisconnected => Self::ChannelDisconnected(record),
            ErrorType::ConnectionTimeout => Self::ConnectionTimeout(record),
            ErrorType::GeneralException => Self::General(record),
            ErrorType::InvalidMessageLength => Self::InvalidMessageLength(record),
            ErrorType::IOException => Self::Io(record),
            ErrorType::ProtocolNotSupported => Self::ProtocolNotSupported(record),
            ErrorType::RetryIOException => Self::RetryIo(record),
            ErrorType::SecurityException => Self::Security(record),
            ErrorType::TransactionException => Self::Transaction(
                TransactionException::with_record(
                    TransactionErrorKind::Base,
                    TransactionStatus::Invalid,
                    record,
                ),
            ),
            ErrorType::TypeCoercionNotSupported => Self::TypeCoercionNotSupported(record),
            ErrorType::TypeNotSupported => Self::TypeNotSupported(record),
            ErrorType::VersionMismatchException => Self::VersionMismatch(record),
            ErrorType::InvalidErrorCode => Self::InvalidErrorCode(record),
        }
    }

    fn with_message(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self::from_record(ErrorRecord::new(error_type.code(), error_type, message, ""))
    }

    /// Bad authentication with a realm.
    pub fn bad_authentication(message: impl Into<String>, realm: impl Into<String>) -> Self {
        Self::BadAuthentication {
            record: ErrorRecord::new(
                ErrorType::BadAuthentication.code(),
                ErrorType::BadAuthentication,
                message,
                "",
            ),
            realm: realm.into(),
        }
    }

    /// Bad magic.
    pub fn bad_magic(message: impl Into<String>) -> Self {
        Self::with_message(ErrorType::BadMagic, message)
    }

    /// Bad verb.
    pub fn bad_verb(message: impl Into<String>) -> Self {
        Self::with_message(ErrorType::BadVerb, message)
    }

    /// Channel disconnected.
    pub fn channel_disconnected(message: impl Into<String>) -> Self {
        Self::with_message(ErrorType::ChannelDisconnected, message)
    }

    /// General exception.
    pub fn general(message: impl Into<String>) -> Self {
        Self::with_message(ErrorType::GeneralException, message)
    }

    /// Invalid message length.
    pub fn invalid_message_length(message: impl Into<String>) -> Self {
        Self::with_message(ErrorType::InvalidMessageLength, message)
    }

    /// I/O exception.
    pub fn io(message: impl Into<String>) -> Self {
        Self::with_message(ErrorType::IOException, message)
    }

    /// Unsupported protocol version.
    pub fn protocol_not_supported(message: impl Into<String>) -> Self {
        Self::with_message(ErrorType::ProtocolNotSupported, message)
    }

    /// Retryable I/O exception.
    pub fn retry_io(message: impl Into<String>) -> Self {
        Self::with_message(ErrorType::RetryIOException, message)
    }

    /// Version mismatch.
    pub fn version_mismatch(message: impl Into<String>) -> Self {
        Self::with_message(ErrorType::VersionMismatchException, message)
    }

    /// Attach details to the record.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.record_mut().details = details.into();
        self
    }

    /// The error record.
    pub fn record(&self) -> &ErrorRecord {
        match self {
            Self::BadAuthentication { record, .. } => record,
            Self::Transaction(e) => e.record(),
            Self::Success(r)
            | Self::BadMagic(r)
            | Self::BadVerb(r)
            | Self::ChannelDisconnected(r)
            | Self::ConnectionTimeout(r)
            | Self::General(r)
            | Self::InvalidMessageLength(r)
            | Self::Io(r)
            | Self::ProtocolNotSupported(r)
            | Self::RetryIo(r)
            | Self::Security(r)
            | Self::TypeCoercionNotSupported(r)
            | Self::TypeNotSupported(r)
            | Self::VersionMismatch(r)
            | Self::InvalidErrorCode(r) => r,
        }
    }

    fn record_mut(&mut self) -> &mut ErrorRecord {
        match self {
            Self::BadAuthentication { record, .. } => record,
            Self::Transaction(e) => e.record_mut(),
            Self::Success(r)
            | Self::BadMagic(r)
            | Self::BadVerb(r)
            | Self::ChannelDisconnected(r)
            | Self::ConnectionTimeout(r)
            | Self::General(r)
            | Self::InvalidMessageLength(r)
            | Self::Io(r)
            | Self::ProtocolNotSupported(r)
            | Self::RetryIo(r)
            | Self::Security(r)
            | Self::TypeCoercionNotSupported(r)
            | Self::TypeNotSupported(r)
            | Self::VersionMismatch(r)
            | Self::InvalidErrorCode(r) => r,
        }
    }

    /// Error type of the record.
    pub fn error_type(&self) -> ErrorType {
        self.record().error_type
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.record().message
    }

    /// Authentication realm, for bad authentication errors.
    pub fn realm(&self) -> Option<&str> {
        match self {
            Self::BadAuthentication { realm, .. } => Some(realm),
            _ => None,
        }
    }

    /// Transaction exception, if this is one.
    pub fn as_transaction(&self) -> Option<&TransactionException> {
        match self {
            Self::Transaction(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the caller may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryIo(_))
    }
}

impl fmt::Display for TgException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction(e) => fmt::Display::fmt(e, f),
            other => fmt::Display::fmt(other.record(), f),
        }
    }
}

impl std::error::Error for TgException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transaction(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransactionException> for TgException {
    fn from(err: TransactionException) -> Self {
        Self::Transaction(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_display() {
        let record = ErrorRecord::new("TGErrorBadMagic", ErrorType::BadMagic, "Bad Magic id", "x");
        assert_eq!(
            record.to_string(),
            "ErrorCode: TGErrorBadMagic, ErrorType: 2, ErrorMessage: Bad Magic id, ErrorDetails: x"
        );
    }

    #[test]
    fn test_create_by_type_every_code() {
        for error_type in ErrorType::ALL {
            let exception = TgException::create_by_type(error_type.as_i32());
            assert_eq!(exception.error_type(), error_type);
            assert_eq!(exception.record().code, error_type.code());
            assert!(exception.message().is_empty());
        }
    }

    #[test]
    fn test_create_by_type_unknown() {
        let exception = TgException::create_by_type(42);
        assert!(matches!(exception, TgException::InvalidErrorCode(_)));
    }

    #[test]
    fn test_by_type_parameterized() {
        let exception = TgException::by_type(8, "IO-1", "broken pipe", "socket");
        assert!(matches!(exception, TgException::Io(_)));
        assert_eq!(exception.record().code, "IO-1");
        assert_eq!(exception.message(), "broken pipe");
        assert_eq!(exception.record().details, "socket");
    }

    #[test]
    fn test_by_type_unknown_drops_fields() {
        let exception = TgException::by_type(99, "X", "msg", "details");
        assert!(matches!(exception, TgException::InvalidErrorCode(_)));
        assert_eq!(exception.record().code, "TGErrorInvalidErrorCode");
        assert!(exception.message().is_empty());
    }

    #[test]
    fn test_transaction_type_is_base_kind() {
        let exception = TgException::create_by_type(12);
        let tx = exception.as_transaction().unwrap();
        assert_eq!(tx.kind(), TransactionErrorKind::Base);
    }

    #[test]
    fn test_bad_authentication_realm() {
        let exception = TgException::bad_authentication("denied", "tgdb");
        assert_eq!(exception.realm(), Some("tgdb"));
        assert_eq!(exception.error_type(), ErrorType::BadAuthentication);
        assert_eq!(TgException::bad_magic("m").realm(), None);
    }

    #[test]
    fn test_predefined_by_code() {
        assert!(matches!(
            TgException::predefined("TGErrorRetryIOException"),
            TgException::RetryIo(_)
        ));
        assert!(matches!(
            TgException::predefined("nope"),
            TgException::InvalidErrorCode(_)
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(TgException::retry_io("again").is_retryable());
        assert!(!TgException::io("fatal").is_retryable());
        assert!(!TgException::channel_disconnected("gone").is_retryable());
    }

    #[test]
    fn test_with_details() {
        let exception = TgException::general("oops").with_details("context");
        assert_eq!(exception.record().details, "context");
    }
}
