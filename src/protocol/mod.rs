//! Wire protocol layer.
//!
//! Everything here is synchronous and performs no I/O:
//!
//! - [`stream`]: big-endian primitives
//! - [`header`]: the 54-byte message envelope
//! - [`verb`]: the verb table
//! - [`message`]: typed payloads and [`ProtocolMessage`]
//! - [`factory`]: message construction and inbound dispatch
//! - [`codec`]: length-prefixed framing for tokio_util
//! - [`handshake`] and [`auth`]: the connection state machines
//! - [`model`]: seams to the graph object model

pub mod auth;
pub mod codec;
pub mod factory;
pub mod handshake;
pub mod header;
pub mod message;
pub mod model;
pub mod sequence;
pub mod stream;
pub mod verb;

pub use auth::{AuthContext, Authenticator, Credentials};
pub use codec::{FrameCodec, FrameError};
pub use factory::MessageFactory;
pub use handshake::{Handshake, HandshakeStep, ProductVersion};
pub use header::{MessageHeader, HEADER_LENGTH};
pub use message::{MessageBody, Payload, ProtocolMessage};
pub use model::{EntityDecoder, EntityStream, SectionReader, WireAttributeDescriptor, WireEntity};
pub use sequence::SequenceGenerator;
pub use stream::{InputStream, OutputStream, StreamError};
pub use verb::Verb;

/// Magic number at offset 4 of every message.
pub const MAGIC: i32 = 0x0db2_d1e4;

/// Protocol version: major 3, minor 0.
pub const PROTOCOL_VERSION: i16 = 0x0300;
