//! Error taxonomy.
//!
//! Every failure surfaced by the protocol layer is a [`TgException`]. Each
//! variant carries an [`ErrorRecord`] of code name, numeric [`ErrorType`],
//! message and details. Transaction failures are refined further by
//! [`TransactionErrorKind`], selected from the server's [`TransactionStatus`].
//!
//! Two constructors mirror the wire usage:
//!
//! - [`TgException::create_by_type`] builds the default exception for a code
//! - [`TgException::by_type`] builds a fully parameterized one
//!
//! Unknown codes degrade to [`TgException::InvalidErrorCode`] instead of
//! failing the lookup.

mod error;
mod error_type;
mod transaction;

pub use error::{ErrorRecord, TgException, TgResult};
pub use error_type::ErrorType;
pub use transaction::{TransactionErrorKind, TransactionException, TransactionStatus};
