//! Sequence number generation.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

/// Monotonic sequence number source shared by everything that builds
/// outbound messages.
///
/// Cloning shares the counter. Each [`MessageFactory`](super::MessageFactory)
/// owns one; [`SequenceGenerator::global`] is the process-wide default.
#[derive(Debug, Clone, Default)]
pub struct SequenceGenerator {
    counter: Arc<AtomicI64>,
}

impl SequenceGenerator {
    /// Create a generator whose first issued number is 1.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a generator whose first issued number is `value + 1`.
    pub fn starting_at(value: i64) -> Self {
        Self {
            counter: Arc::new(AtomicI64::new(value)),
        }
    }

    /// Shared process-wide generator.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<SequenceGenerator> = OnceLock::new();
        GLOBAL.get_or_init(SequenceGenerator::new).clone()
    }

    /// Issue the next sequence number.
    pub fn next(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last issued number.
    pub fn current(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Reset the counter so the next issued number is `value + 1`.
    pub fn reset(&self, value: i64) {
        self.counter.store(value, Ordering::SeqCst);
    }
}
