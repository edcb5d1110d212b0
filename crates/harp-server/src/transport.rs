//! IPC transport layer
//!
//! Length-prefixed frames over a Unix socket: a big-endian `u32` byte count
//! followed by one JSON-encoded message.

use crate::error::{Result, ServerError};
use crate::protocol::{EndpointMessage, HostMessage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

/// Default upper bound on a single frame.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Message transport for IPC
pub struct MessageTransport {
    stream: UnixStream,
    max_frame_len: usize,
}

impl MessageTransport {
    /// Create transport from existing Unix stream
    pub fn new(stream: UnixStream) -> Self {
        Self {
            stream,
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Connect to socket path
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        Ok(Self::new(stream))
    }

    pub fn with_max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max;
        self
    }

    async fn send<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let data = serde_json::to_vec(msg)?;
        if data.len() > self.max_frame_len {
            return Err(ServerError::FrameTooLarge {
                len: data.len(),
                max: self.max_frame_len,
            });
        }
        self.stream.write_u32(data.len() as u32).await?;
        self.stream.write_all(&data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        let len = self.stream.read_u32().await? as usize;
        if len > self.max_frame_len {
            return Err(ServerError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }
        let mut data = vec![0u8; len];
        self.stream.read_exact(&mut data).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Send a host message
    pub async fn send_host_message(&mut self, msg: &HostMessage) -> Result<()> {
        self.send(msg).await
    }

    /// Receive an endpoint message
    pub async fn recv_endpoint_message(&mut self) -> Result<EndpointMessage> {
        self.recv().await
    }

    /// Send an endpoint message
    pub async fn send_endpoint_message(&mut self, msg: &EndpointMessage) -> Result<()> {
        self.send(msg).await
    }

    /// Receive a host message
    pub async fn recv_host_message(&mut self) -> Result<HostMessage> {
        self.recv().await
    }

    /// Send a host message and wait for the reply.
    pub async fn request(&mut self, msg: &HostMessage) -> Result<EndpointMessage> {
        self.send_host_message(msg).await?;
        self.recv_endpoint_message().await
    }
}

/// Server-side transport listener
pub struct TransportListener {
    listener: UnixListener,
    max_frame_len: usize,
}

impl TransportListener {
    /// Bind to socket path
    pub async fn bind(socket_path: &Path) -> Result<Self> {
        // Remove a stale socket left by a previous run
        let _ = std::fs::remove_file(socket_path);
        let listener = UnixListener::bind(socket_path)?;
        Ok(Self {
            listener,
            max_frame_len: MAX_FRAME_LEN,
        })
    }

    pub fn with_max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max;
        self
    }

    /// Accept a connection
    pub async fn accept(&self) -> Result<MessageTransport> {
        let (stream, _) = self.listener.accept().await?;
        Ok(MessageTransport::new(stream).with_max_frame_len(self.max_frame_len))
    }
}

/// True when the peer closed the connection between frames.
pub fn is_disconnect(err: &ServerError) -> bool {
    matches!(
        err,
        ServerError::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
        )
    )
}
