//! Driver Error Types

use std::io;

use thiserror::Error;

use crate::exception::TgException;
use crate::protocol::FrameError;

// ============================================================================
// DriverError
// ============================================================================

/// Driver error
#[derive(Error, Debug)]
pub enum DriverError {
    /// Protocol-level failure, including server-raised exceptions
    #[error("Protocol error: {0}")]
    Protocol(#[from] TgException),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Handshake error
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Server terminated the session
    #[error("Session terminated: {0}")]
    SessionTerminated(String),

    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl DriverError {
    /// Connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Authentication error
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Handshake error
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// Transaction error
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Underlying protocol exception, if any.
    pub fn as_exception(&self) -> Option<&TgException> {
        match self {
            Self::Protocol(e) => Some(e),
            _ => None,
        }
    }

    /// Whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Protocol(e) => e.is_retryable(),
            Self::Connection(_) | Self::Timeout(_) => true,
            _ => false,
        }
    }
}

impl From<FrameError> for DriverError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(e) => Self::Io(e),
            other => Self::Protocol(TgException::invalid_message_length(other.to_string())),
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// Driver result type
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Tests
// ============================================================================
