//! Error type codes.
//!
//! Every error record carries one of these small integers. The numbering is
//! shared with the server and must not change.

use std::fmt;

/// Error type code carried by every error record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorType {
    /// No error
    Success = 0,
    /// Credentials were rejected
    BadAuthentication = 1,
    /// Envelope magic did not match
    BadMagic = 2,
    /// Envelope verb did not match the target message
    BadVerb = 3,
    /// Channel was disconnected
    ChannelDisconnected = 4,
    /// Connection attempt timed out
    ConnectionTimeout = 5,
    /// Catch-all failure
    GeneralException = 6,
    /// Envelope length did not match the buffer
    InvalidMessageLength = 7,
    /// Read or write failure on a stream
    IOException = 8,
    /// Envelope protocol version is not supported
    ProtocolNotSupported = 9,
    /// Transient I/O failure, the operation may be retried
    RetryIOException = 10,
    /// Security failure
    SecurityException = 11,
    /// Transaction failure
    TransactionException = 12,
    /// Value cannot be coerced to the requested type
    TypeCoercionNotSupported = 13,
    /// Type is not supported
    TypeNotSupported = 14,
    /// Client and server versions are incompatible
    VersionMismatchException = 15,
    /// Sentinel for codes outside the table
    InvalidErrorCode = 16,
}

impl ErrorType {
    /// All error types in wire order.
    pub const ALL: [ErrorType; 17] = [
        ErrorType::Success,
        ErrorType::BadAuthentication,
        ErrorType::BadMagic,
        ErrorType::BadVerb,
        ErrorType::ChannelDisconnected,
        ErrorType::ConnectionTimeout,
        ErrorType::GeneralException,
        ErrorType::InvalidMessageLength,
        ErrorType::IOException,
        ErrorType::ProtocolNotSupported,
        ErrorType::RetryIOException,
        ErrorType::SecurityException,
        ErrorType::TransactionException,
        ErrorType::TypeCoercionNotSupported,
        ErrorType::TypeNotSupported,
        ErrorType::VersionMismatchException,
        ErrorType::InvalidErrorCode,
    ];

    /// Look up an error type by its numeric code.
    ///
    /// Codes outside the table degrade to [`ErrorType::InvalidErrorCode`].
    pub fn from_i32(value: i32) -> Self {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .unwrap_or(ErrorType::InvalidErrorCode)
    }

    /// Look up an error type by its code name (e.g. `"TGErrorBadMagic"`).
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .unwrap_or(ErrorType::InvalidErrorCode)
    }

    /// Numeric wire value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Code name used in error records.
    pub fn code(self) -> &'static str {
        match self {
            ErrorType::Success => "TGSuccess",
            ErrorType::BadAuthentication => "TGErrorBadAuthentication",
            ErrorType::BadMagic => "TGErrorBadMagic",
            ErrorType::BadVerb => "TGErrorBadVerb",
            ErrorType::ChannelDisconnected => "TGErrorChannelDisconnected",
            ErrorType::ConnectionTimeout => "TGErrorConnectionTimeout",
            ErrorType::GeneralException => "TGErrorGeneralException",
            ErrorType::InvalidMessageLength => "TGErrorInvalidMessageLength",
            ErrorType::IOException => "TGErrorIOException",
            ErrorType::ProtocolNotSupported => "TGErrorProtocolNotSupported",
            ErrorType::RetryIOException => "TGErrorRetryIOException",
            ErrorType::SecurityException => "TGErrorSecurityException",
            ErrorType::TransactionException => "TGErrorTransactionException",
            ErrorType::TypeCoercionNotSupported => "TGErrorTypeCoercionNotSupported",
            ErrorType::TypeNotSupported => "TGErrorTypeNotSupported",
            ErrorType::VersionMismatchException => "TGErrorVersionMismatchException",
            ErrorType::InvalidErrorCode => "TGErrorInvalidErrorCode",
        }
    }

    /// Whether the caller may retry the failed operation.
    pub fn is_retryable(self) -> bool {
        self == ErrorType::RetryIOException
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<i32> for ErrorType {
    fn from(value: i32) -> Self {
        Self::from_i32(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_numbering() {
        for (index, error_type) in ErrorType::ALL.iter().enumerate() {
            assert_eq!(error_type.as_i32(), index as i32);
            assert_eq!(ErrorType::from_i32(index as i32), *error_type);
        }
    }

    #[test]
    fn test_unknown_code_degrades() {
        assert_eq!(ErrorType::from_i32(17), ErrorType::InvalidErrorCode);
        assert_eq!(ErrorType::from_i32(-3), ErrorType::InvalidErrorCode);
        assert_eq!(ErrorType::from_code("TGErrorNope"), ErrorType::InvalidErrorCode);
    }

    #[test]
    fn test_code_lookup() {
        assert_eq!(ErrorType::from_code("TGErrorBadMagic"), ErrorType::BadMagic);
        assert_eq!(ErrorType::BadVerb.to_string(), "TGErrorBadVerb");
    }

    #[test]
    fn test_only_retry_io_is_retryable() {
        let retryable: Vec<_> = ErrorType::ALL.iter().filter(|t| t.is_retryable()).collect();
        assert_eq!(retryable, vec![&ErrorType::RetryIOException]);
    }
}
