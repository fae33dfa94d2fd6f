//! Driver Module
//!
//! Async layer that runs the protocol state machines over a channel.
//!
//! - [`Channel`]: frame transport, [`TcpChannel`] in production
//! - [`ConnectionConfig`]: server address, credentials, timeouts and limits
//! - [`ProtocolSession`]: handshake, authentication and request round trips
//! - [`Transaction`]: client-side transaction lifecycle
//!
//! # Example
//!
//! ```ignore
//! use tgdb_driver::driver::{ConnectionConfig, ProtocolSession};
//! use tgdb_driver::protocol::message::{CommitSet, QueryRequest};
//!
//! let config = ConnectionConfig::builder("tcp://localhost:8222")?
//!     .with_credentials("scott", "tiger")
//!     .build();
//! let mut session = ProtocolSession::open(config).await?;
//!
//! session.begin_transaction().await?;
//! session.commit(CommitSet::new()).await?;
//!
//! let result = session.query(QueryRequest::gremlin("g.V().count()")).await?;
//! println!("{} results", result.result_count);
//!
//! session.disconnect().await?;
//! ```

mod channel;
mod config;
mod connection;
mod error;
mod session;
mod transaction;

// Re-exports
pub use channel::Channel;
pub use config::{ConnectionConfig, ConnectionConfigBuilder, ServerAddress, DEFAULT_PORT};
pub use connection::{ChannelState, TcpChannel};
pub use error::{DriverError, DriverResult};
pub use session::{ProtocolSession, SessionState};
pub use transaction::{Transaction, TransactionState};
