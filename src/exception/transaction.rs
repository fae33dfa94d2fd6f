//! Transaction status codes and transaction exceptions.

use std::fmt;

use super::error::ErrorRecord;
use super::error_type::ErrorType;

const LAST_STATUS: i32 = 8000;

/// Status code returned by the server in a commit response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// Unrecognized status
    Invalid,
    /// Commit applied
    Success,
    /// Another transaction is already in progress
    AlreadyInProgress,
    /// Client went away mid-transaction
    ClientDisconnected,
    /// Commit payload was malformed
    MalFormed,
    /// Generic server-side failure
    GeneralError,
    /// Verification of the commit set failed
    VerificationError,
    /// Transaction is in a bad state
    InBadState,
    /// A unique constraint was violated
    UniqueConstraintViolation,
    /// Optimistic lock check failed
    OptimisticLockFailed,
    /// A server resource limit was exceeded
    ResourceExceeded,
    /// The calling thread is not in a transaction
    CurrentThreadNotInTransaction,
    /// A unique index key attribute was null
    UniqueIndexKeyAttributeNullError,
}

impl TransactionStatus {
    /// Decode a wire status code. Unknown codes map to [`TransactionStatus::Invalid`].
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            c if c == LAST_STATUS + 1 => Self::AlreadyInProgress,
            c if c == LAST_STATUS + 2 => Self::ClientDisconnected,
            c if c == LAST_STATUS + 3 => Self::MalFormed,
            c if c == LAST_STATUS + 4 => Self::GeneralError,
            c if c == LAST_STATUS + 5 => Self::VerificationError,
            c if c == LAST_STATUS + 6 => Self::InBadState,
            c if c == LAST_STATUS + 7 => Self::UniqueConstraintViolation,
            c if c == LAST_STATUS + 8 => Self::OptimisticLockFailed,
            c if c == LAST_STATUS + 9 => Self::ResourceExceeded,
            c if c == LAST_STATUS + 10 => Self::CurrentThreadNotInTransaction,
            c if c == LAST_STATUS + 11 => Self::UniqueIndexKeyAttributeNullError,
            _ => Self::Invalid,
        }
    }

    /// Wire status code.
    pub fn code(self) -> i32 {
        match self {
            Self::Invalid => -1,
            Self::Success => 0,
            Self::AlreadyInProgress => LAST_STATUS + 1,
            Self::ClientDisconnected => LAST_STATUS + 2,
            Self::MalFormed => LAST_STATUS + 3,
            Self::GeneralError => LAST_STATUS + 4,
            Self::VerificationError => LAST_STATUS + 5,
            Self::InBadState => LAST_STATUS + 6,
            Self::UniqueConstraintViolation => LAST_STATUS + 7,
            Self::OptimisticLockFailed => LAST_STATUS + 8,
            Self::ResourceExceeded => LAST_STATUS + 9,
            Self::CurrentThreadNotInTransaction => LAST_STATUS + 10,
            Self::UniqueIndexKeyAttributeNullError => LAST_STATUS + 11,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Invalid => "TransactionInvalid",
            Self::Success => "TransactionSuccess",
            Self::AlreadyInProgress => "TransactionAlreadyInProgress",
            Self::ClientDisconnected => "TransactionClientDisconnected",
            Self::MalFormed => "TransactionMalFormed",
            Self::GeneralError => "TransactionGeneralError",
            Self::VerificationError => "TransactionVerificationError",
            Self::InBadState => "TransactionInBadState",
            Self::UniqueConstraintViolation => "TransactionUniqueConstraintViolation",
            Self::OptimisticLockFailed => "TransactionOptimisticLockFailed",
            Self::ResourceExceeded => "TransactionResourceExceeded",
            Self::CurrentThreadNotInTransaction => "CurrentThreadNotInTransaction",
            Self::UniqueIndexKeyAttributeNullError => "TransactionUniqueIndexKeyAttributeNullError",
        }
    }

    /// Whether the status reports a successful commit.
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

/// Refinement of a transaction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionErrorKind {
    /// Status code not covered by a specific kind
    Base,
    /// Another transaction is already in progress
    AlreadyInProgress,
    /// Commit payload was malformed
    MalFormed,
    /// Generic server-side failure
    GeneralError,
    /// Verification of the commit set failed
    VerificationError,
    /// Transaction is in a bad state
    InBadState,
    /// A unique constraint was violated
    UniqueConstraintViolation,
    /// Optimistic lock check failed
    OptimisticLockFailed,
    /// A server resource limit was exceeded
    ResourceExceeded,
    /// A unique index key attribute was null
    UniqueIndexKeyAttributeNullError,
}

impl TransactionErrorKind {
    /// Select the kind for a status. Statuses without a dedicated kind map to `Base`.
    pub fn for_status(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::AlreadyInProgress => Self::AlreadyInProgress,
            TransactionStatus::MalFormed => Self::MalFormed,
            TransactionStatus::GeneralError => Self::GeneralError,
            TransactionStatus::VerificationError => Self::VerificationError,
            TransactionStatus::InBadState => Self::InBadState,
            TransactionStatus::UniqueConstraintViolation => Self::UniqueConstraintViolation,
            TransactionStatus::OptimisticLockFailed => Self::OptimisticLockFailed,
            TransactionStatus::ResourceExceeded => Self::ResourceExceeded,
            TransactionStatus::UniqueIndexKeyAttributeNullError => {
                Self::UniqueIndexKeyAttributeNullError
            }
            _ => Self::Base,
        }
    }
}

/// A failed transaction as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionException {
    kind: TransactionErrorKind,
    status: TransactionStatus,
    record: ErrorRecord,
}

impl TransactionException {
    /// Base transaction exception with a message and no status.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_record(
            TransactionErrorKind::Base,
            TransactionStatus::Invalid,
            ErrorRecord::new("", ErrorType::TransactionException, message, ""),
        )
    }

    /// Build the exception variant matching a status code.
    pub fn from_status(status: TransactionStatus, message: impl Into<String>) -> Self {
        Self::with_record(
            TransactionErrorKind::for_status(status),
            status,
            ErrorRecord::new("", ErrorType::TransactionException, message, ""),
        )
    }

    /// Build from a raw wire status code.
    pub fn from_status_code(code: i32, message: impl Into<String>) -> Self {
        let mut exception = Self::from_status(TransactionStatus::from_code(code), message);
        exception.record.details = format!("status={}", code);
        exception
    }

    pub(crate) fn with_record(
        kind: TransactionErrorKind,
        status: TransactionStatus,
        record: ErrorRecord,
    ) -> Self {
        Self { kind, status, record }
    }

    /// Failure kind.
    pub fn kind(&self) -> TransactionErrorKind {
        self.kind
    }

    /// Status reported by the server.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Error record.
    pub fn record(&self) -> &ErrorRecord {
        &self.record
    }

    pub(crate) fn record_mut(&mut self) -> &mut ErrorRecord {
        &mut self.record
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.record.message
    }
}

impl fmt::Display for TransactionException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.record, f)
    }
}

impl std::error::Error for TransactionException {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TransactionStatus::from_code(0), TransactionStatus::Success);
        assert_eq!(TransactionStatus::from_code(8001), TransactionStatus::AlreadyInProgress);
        assert_eq!(
            TransactionStatus::from_code(8011),
            TransactionStatus::UniqueIndexKeyAttributeNullError
        );
        assert_eq!(TransactionStatus::from_code(8012), TransactionStatus::Invalid);
        assert_eq!(TransactionStatus::Invalid.code(), -1);
        assert_eq!(TransactionStatus::ResourceExceeded.code(), 8009);
    }

    #[test]
    fn test_nine_named_kinds() {
        let cases = [
            (8001, TransactionErrorKind::AlreadyInProgress),
            (8003, TransactionErrorKind::MalFormed),
            (8004, TransactionErrorKind::GeneralError),
            (8005, TransactionErrorKind::VerificationError),
            (8006, TransactionErrorKind::InBadState),
            (8007, TransactionErrorKind::UniqueConstraintViolation),
            (8008, TransactionErrorKind::OptimisticLockFailed),
            (8009, TransactionErrorKind::ResourceExceeded),
            (8011, TransactionErrorKind::UniqueIndexKeyAttributeNullError),
        ];
        for (code, kind) in cases {
            let exception = TransactionException::from_status_code(code, "failed");
            assert_eq!(exception.kind(), kind, "status {}", code);
            assert_eq!(exception.status().code(), code);
        }
    }

    #[test]
    fn test_unrecognized_status_is_base() {
        for code in [8002, 8010, 9999, -7] {
            let exception = TransactionException::from_status_code(code, "failed");
            assert_eq!(exception.kind(), TransactionErrorKind::Base);
        }
    }

    #[test]
    fn test_display_uses_record_format() {
        let exception = TransactionException::from_status(TransactionStatus::InBadState, "bad");
        assert_eq!(
            exception.to_string(),
            "ErrorCode: , ErrorType: 12, ErrorMessage: bad, ErrorDetails: "
        );
    }
}
