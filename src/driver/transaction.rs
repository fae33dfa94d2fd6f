//! Transaction state tracking.
//!
//! The server knows a transaction only by the id it hands back from
//! `BeginTransaction`; the client keeps the lifecycle here so misuse is
//! rejected before anything reaches the wire.

use tracing::debug;

use super::error::{DriverError, DriverResult};

// ============================================================================
// TransactionState
// ============================================================================

/// Transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction begun
    NoTransaction,
    /// Begun and not yet finished
    Active,
    /// Committed
    Committed,
    /// Rolled back
    RolledBack,
    /// Commit failed on the server
    Failed,
}

impl TransactionState {
    /// Check if the transaction has finished
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack | Self::Failed)
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// Client-side view of one transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    state: TransactionState,
    transaction_id: Option<i64>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    /// No transaction yet
    pub fn new() -> Self {
        Self {
            state: TransactionState::NoTransaction,
            transaction_id: None,
        }
    }

    /// Current state
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Server-assigned id of the current or last transaction
    pub fn transaction_id(&self) -> Option<i64> {
        self.transaction_id
    }

    /// Check if a transaction is open
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Fail unless a new transaction may begin.
    ///
    /// A finished transaction may be followed by a new one.
    pub fn ensure_can_begin(&self) -> DriverResult<()> {
        match self.state {
            TransactionState::Active => Err(DriverError::invalid_state(format!(
                "Transaction {} is already active",
                self.transaction_id.unwrap_or(-1)
            ))),
            _ => Ok(()),
        }
    }

    /// Fail unless a transaction is open.
    pub fn ensure_active(&self) -> DriverResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::NoTransaction => Err(DriverError::invalid_state("No transaction has begun")),
            state => Err(DriverError::invalid_state(format!(
                "Transaction is already {:?}",
                state
            ))),
        }
    }

    /// Record a begun transaction.
    pub fn begin(&mut self, transaction_id: i64) -> DriverResult<()> {
        self.ensure_can_begin()?;
        self.state = TransactionState::Active;
        self.transaction_id = Some(transaction_id);
        debug!(transaction_id, "Transaction begun");
        Ok(())
    }

    /// Record a successful commit.
    pub fn mark_committed(&mut self) -> DriverResult<()> {
        self.finish(TransactionState::Committed)
    }

    /// Record a rollback.
    pub fn mark_rolled_back(&mut self) -> DriverResult<()> {
        self.finish(TransactionState::RolledBack)
    }

    /// Record a commit the server refused.
    pub fn mark_failed(&mut self) -> DriverResult<()> {
        self.finish(TransactionState::Failed)
    }

    fn finish(&mut self, state: TransactionState) -> DriverResult<()> {
        self.ensure_active()?;
        debug!(transaction_id = ?self.transaction_id, ?state, "Transaction finished");
        self.state = state;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
