//! TCP channel.
//!
//! Handles the TCP connection and message framing.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, warn};

use async_trait::async_trait;

use super::channel::Channel;
use super::config::ConnectionConfig;
use super::error::{DriverError, DriverResult};
use crate::protocol::FrameCodec;

/// TCP channel state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Connected and usable
    Open,
    /// Closed locally or by the server
    Closed,
}

/// Frame channel over a TCP stream.
pub struct TcpChannel {
    stream: TcpStream,
    codec: FrameCodec,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    state: ChannelState,
    address: String,
}

impl TcpChannel {
    /// Connect to the configured server within the connect timeout.
    pub async fn connect(config: &ConnectionConfig) -> DriverResult<Self> {
        let address = config.address.to_socket_addr();
        let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(&address))
            .await
            .map_err(|_| DriverError::timeout(format!("Connecting to {}", address)))?
            .map_err(|e| DriverError::connection(format!("Failed to connect to {}: {}", address, e)))?;

        stream.set_nodelay(true).ok();
        debug!(%address, "Connected");

        Ok(Self::from_stream(stream, address, FrameCodec::with_max_size(config.max_message_size)))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, address: impl Into<String>, codec: FrameCodec) -> Self {
        Self {
            stream,
            codec,
            read_buffer: BytesMut::with_capacity(8192),
            write_buffer: BytesMut::with_capacity(8192),
            state: ChannelState::Open,
            address: address.into(),
        }
    }

    /// Channel state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Server address.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn ensure_open(&self) -> DriverResult<()> {
        match self.state {
            ChannelState::Open => Ok(()),
            ChannelState::Closed => Err(DriverError::connection("Channel closed")),
        }
    }
}

#[async_trait]
impl Channel for TcpChannel {
    async fn send(&mut self, frame: Bytes) -> DriverResult<()> {
        self.ensure_open()?;

        self.write_buffer.clear();
        self.codec.encode(frame, &mut self.write_buffer)?;

        self.stream
            .write_all(&self.write_buffer)
            .await
            .map_err(|e| DriverError::connection(format!("Send failed: {}", e)))?;
        self.stream
            .flush()
            .await
            .map_err(|e| DriverError::connection(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    async fn receive(&mut self) -> DriverResult<BytesMut> {
        self.ensure_open()?;

        loop {
            match self.codec.decode(&mut self.read_buffer) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {}
                Err(e) => {
                    error!(address = %self.address, error = %e, "Invalid frame");
                    self.state = ChannelState::Closed;
                    return Err(e.into());
                }
            }

            let n = self
                .stream
                .read_buf(&mut self.read_buffer)
                .await
                .map_err(|e| DriverError::connection(format!("Read failed: {}", e)))?;

            if n == 0 {
                self.state = ChannelState::Closed;
                return Err(DriverError::connection("Connection closed by server"));
            }
        }
    }

    fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.state == ChannelState::Closed {
            return Ok(());
        }
        self.state = ChannelState::Closed;
        if let Err(e) = self.stream.shutdown().await {
            warn!(address = %self.address, error = %e, "Socket shutdown failed");
        }
        debug!(address = %self.address, "Channel closed");
        Ok(())
    }
}

impl std::fmt::Debug for TcpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpChannel")
            .field("address", &self.address)
            .field("state", &self.state)
            .finish()
    }
}
