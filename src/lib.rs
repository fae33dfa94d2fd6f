//! # TGDB Driver
//!
//! Client side of the TGDB graph database wire protocol.
//!
//! ## Layers
//!
//! - [`exception`] - The error taxonomy shared by client and server
//! - [`protocol`] - Synchronous encoding and decoding of protocol messages,
//!   plus the handshake and authentication state machines
//! - [`driver`] - Async sessions that run those state machines over a channel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tgdb_driver::{ConnectionConfig, ProtocolSession, QueryRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::builder("tcp://localhost:8222")?
//!         .with_credentials("scott", "tiger")
//!         .build();
//!
//!     let mut session = ProtocolSession::open(config).await?;
//!     let result = session.query(QueryRequest::gremlin("g.V().count()")).await?;
//!     println!("{} results", result.result_count);
//!
//!     session.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! ```rust,no_run
//! # use tgdb_driver::{CommitSet, ConnectionConfig, ProtocolSession};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let config = ConnectionConfig::builder("tcp://localhost:8222")?.with_credentials("u", "p").build();
//! # let mut session = ProtocolSession::open(config).await?;
//! session.begin_transaction().await?;
//! let response = session.commit(CommitSet::new()).await?;
//! println!("{} entities remapped", response.remap.added.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Encoding Without I/O
//!
//! ```rust
//! use tgdb_driver::protocol::{MessageBody, MessageFactory, SequenceGenerator, Verb};
//! use tgdb_driver::protocol::message::EmptyPayload;
//!
//! let factory = MessageFactory::with_sequence(SequenceGenerator::new());
//! let ping = factory.create(MessageBody::Ping(EmptyPayload));
//! let bytes = ping.to_bytes().unwrap();
//!
//! let decoded = factory.create_from_buffer(&bytes).unwrap();
//! assert_eq!(decoded.verb(), Verb::Ping);
//! ```
//!
//! ## Logging
//!
//! Events are emitted through `tracing`; install a subscriber to see them.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod driver;
pub mod exception;
pub mod protocol;

// Re-exports for convenience
pub use driver::{
    Channel, ConnectionConfig, ConnectionConfigBuilder, DriverError, DriverResult,
    ProtocolSession, ServerAddress, TcpChannel, Transaction, TransactionState,
};

pub use exception::{ErrorType, TgException, TgResult, TransactionException, TransactionStatus};

pub use protocol::message::{CommitSet, FetchOptions, GetEntityRequest, QueryRequest};
pub use protocol::{MessageFactory, ProtocolMessage, Verb};
