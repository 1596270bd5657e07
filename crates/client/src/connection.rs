//! Message framing, buffered sends, and timed receives over a WebSocket.
//!
//! Outbound frames are queued in memory and only hit the socket on an
//! explicit `flush`, so many small writes per tick batch into one burst.

use crate::transport::WsStream;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use gatesim_config::CompressFormat;
use gatesim_proto::{call_entity_method_from_client, EntityId, Frame, WireError};
use std::io::{Read, Write};
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::trace;

/// How long a single receive waits before reporting a timeout.
const RECV_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Errors surfaced by the framed connection.
#[derive(Debug, Error)]
pub enum ConnError {
    /// No frame arrived within the poll window; the caller should retry.
    #[error("receive timed out")]
    Timeout,
    /// The peer closed the connection or the stream ended.
    #[error("connection closed")]
    Closed,
    /// Transport-level failure.
    #[error("websocket error: {0}")]
    Ws(#[from] tungstenite::Error),
    /// A received message could not be decoded as a frame.
    #[error("frame decode failed: {0}")]
    Decode(#[from] WireError),
    /// Compressed payload could not be deflated or inflated.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),
}

/// A live WebSocket wrapped with frame encoding and explicit flush control.
pub struct FramedConnection {
    sender: FrameSender,
    receiver: FrameReceiver,
}

impl FramedConnection {
    /// Wrap an established stream.
    pub fn new(ws: WsStream, compress: CompressFormat) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sender: FrameSender {
                sink,
                pending: Vec::new(),
                compress,
            },
            receiver: FrameReceiver { stream, compress },
        }
    }

    /// Split into independently-owned send and receive halves, one per bot
    /// task.
    pub fn split(self) -> (FrameSender, FrameReceiver) {
        (self.sender, self.receiver)
    }
}

/// Outbound half: buffers frames until flushed.
pub struct FrameSender {
    sink: SplitSink<WsStream, Message>,
    pending: Vec<Message>,
    compress: CompressFormat,
}

impl FrameSender {
    /// Queue a frame for the next flush. Does not touch the socket.
    pub fn send(&mut self, frame: &Frame) -> Result<(), ConnError> {
        let bytes = encode_message(frame, self.compress)?;
        self.pending.push(Message::Binary(bytes));
        Ok(())
    }

    /// Queue an outbound entity method call addressed to the server.
    pub fn send_call_entity_method(
        &mut self,
        entity_id: EntityId,
        method: &str,
        args: &[Vec<u8>],
    ) -> Result<(), ConnError> {
        self.send(&call_entity_method_from_client(entity_id, method, args))
    }

    /// Number of frames queued and not yet flushed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Write all buffered frames to the socket.
    ///
    /// `label` identifies the flushing loop in trace output.
    pub async fn flush(&mut self, label: &str) -> Result<(), ConnError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        trace!(label, frames = self.pending.len(), "flushing outbound frames");
        for msg in self.pending.drain(..) {
            self.sink.feed(msg).await?;
        }
        self.sink.flush().await?;
        Ok(())
    }

    /// Close the outbound half of the connection.
    pub async fn close(&mut self) -> Result<(), ConnError> {
        self.sink.close().await?;
        Ok(())
    }
}

/// Inbound half: yields frames in arrival order.
pub struct FrameReceiver {
    stream: SplitStream<WsStream>,
    compress: CompressFormat,
}

impl FrameReceiver {
    /// Wait for the next frame, up to the poll timeout.
    ///
    /// `ConnError::Timeout` means "nothing yet, try again"; any other error
    /// is terminal for this connection.
    pub async fn recv(&mut self) -> Result<Frame, ConnError> {
        loop {
            let msg = match tokio::time::timeout(RECV_POLL_TIMEOUT, self.stream.next()).await {
                Err(_) => return Err(ConnError::Timeout),
                Ok(None) => return Err(ConnError::Closed),
                Ok(Some(Err(err))) => return Err(err.into()),
                Ok(Some(Ok(msg))) => msg,
            };
            match msg {
                Message::Binary(data) => return decode_message(&data, self.compress),
                Message::Close(_) => return Err(ConnError::Closed),
                // Control frames and stray text are not protocol frames.
                other => {
                    trace!(len = other.len(), "skipping non-frame message");
                }
            }
        }
    }
}

fn encode_message(frame: &Frame, compress: CompressFormat) -> Result<Vec<u8>, ConnError> {
    let raw = frame.encode();
    match compress {
        CompressFormat::None => Ok(raw),
        CompressFormat::Deflate => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::fast());
            encoder.write_all(&raw)?;
            Ok(encoder.finish()?)
        }
    }
}

fn decode_message(data: &[u8], compress: CompressFormat) -> Result<Frame, ConnError> {
    match compress {
        CompressFormat::None => Ok(Frame::decode(data)?),
        CompressFormat::Deflate => {
            let mut raw = Vec::new();
            flate2::read::DeflateDecoder::new(data).read_to_end(&mut raw)?;
            Ok(Frame::decode(&raw)?)
        }
    }
}
