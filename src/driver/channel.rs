//! Channel abstraction.
//!
//! A channel moves whole frames. Production uses [`TcpChannel`], tests use
//! a scripted in-memory double.
//!
//! [`TcpChannel`]: super::connection::TcpChannel

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use super::error::DriverResult;

/// Frame transport between the client and one server.
#[async_trait]
pub trait Channel: Send {
    /// Send one encoded message.
    async fn send(&mut self, frame: Bytes) -> DriverResult<()>;

    /// Receive one complete message, length prefix included.
    async fn receive(&mut self) -> DriverResult<BytesMut>;

    /// Whether the channel can still carry frames.
    fn is_open(&self) -> bool;

    /// Close the channel. Closing twice is a no-op.
    async fn close(&mut self) -> DriverResult<()>;
}
