//! Framed Peer Streams
//!
//! Length-prefixed bincode frames over a TCP stream: `[length:4][frame]`,
//! length big-endian. One connection carries one direction of one peer
//! relationship; the writer owns the client side, the reader owns accepted
//! streams. Connect and write failures map to `Unavailable` so the caller's
//! retry policy applies; malformed or oversize frames are protocol errors.

use crate::error::{NetError, Result};
use bytes::BytesMut;
use lattice_types::RemoteFrame;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

#[derive(Debug)]
pub(crate) struct FramedConnection {
    stream: TcpStream,
    peer: String,
    write_buffer: BytesMut,
    bytes_sent: u64,
    bytes_received: u64,
    max_frame_size: usize,
}

impl FramedConnection {
    /// Dial `address` with a timeout and send nothing yet.
    pub(crate) async fn connect(
        address: &str,
        timeout: Duration,
        max_frame_size: usize,
    ) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| NetError::unavailable(address, "connect timed out"))?
            .map_err(|e| NetError::unavailable(address, e.to_string()))?;
        Ok(Self::new(stream, address.to_string(), max_frame_size))
    }

    /// Wrap an accepted stream.
    pub(crate) fn from_stream(stream: TcpStream, max_frame_size: usize) -> Self {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self::new(stream, peer, max_frame_size)
    }

    fn new(stream: TcpStream, peer: String, max_frame_size: usize) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
        }
        Self {
            stream,
            peer,
            write_buffer: BytesMut::with_capacity(64 * 1024),
            bytes_sent: 0,
            bytes_received: 0,
            max_frame_size,
        }
    }

    pub(crate) async fn write_frame(&mut self, frame: &RemoteFrame) -> Result<()> {
        let data = bincode::serialize(frame)
            .map_err(|e| NetError::frame(format!("frame encode failed: {e}")))?;
        if data.len() > self.max_frame_size {
            return Err(NetError::frame(format!(
                "frame size {} exceeds maximum {}",
                data.len(),
                self.max_frame_size
            )));
        }

        self.write_buffer.clear();
        self.write_buffer
            .extend_from_slice(&(data.len() as u32).to_be_bytes());
        self.write_buffer.extend_from_slice(&data);

        self.stream
            .write_all(&self.write_buffer)
            .await
            .map_err(|e| NetError::unavailable(&self.peer, format!("write failed: {e}")))?;
        self.stream
            .flush()
            .await
            .map_err(|e| NetError::unavailable(&self.peer, format!("flush failed: {e}")))?;

        self.bytes_sent += 4 + data.len() as u64;
        debug!(
            peer = %self.peer,
            bytes = data.len(),
            total_sent = self.bytes_sent,
            "sent frame"
        );
        Ok(())
    }

    pub(crate) async fn read_frame(&mut self) -> Result<RemoteFrame> {
        let mut len_bytes = [0u8; 4];
        self.stream
            .read_exact(&mut len_bytes)
            .await
            .map_err(|e| NetError::unavailable(&self.peer, format!("read failed: {e}")))?;

        let frame_len = u32::from_be_bytes(len_bytes) as usize;
        if frame_len > self.max_frame_size {
            return Err(NetError::frame(format!(
                "frame size {} exceeds maximum {}",
                frame_len, self.max_frame_size
            )));
        }

        let mut data = vec![0u8; frame_len];
        self.stream
            .read_exact(&mut data)
            .await
            .map_err(|e| NetError::unavailable(&self.peer, format!("read failed: {e}")))?;

        self.bytes_received += 4 + frame_len as u64;
        debug!(
            peer = %self.peer,
            bytes = frame_len,
            total_received = self.bytes_received,
            "received frame"
        );

        bincode::deserialize(&data).map_err(|e| NetError::frame(format!("frame decode failed: {e}")))
    }

    pub(crate) async fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "error shutting down stream");
        }
    }
}
