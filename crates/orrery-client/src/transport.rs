//! Transport seam between the controller and the wire.
//!
//! The controller only needs one capability: deliver a [`ClientMessage`] to
//! the authority, in the order given. Opening, retrying, and multiplexing the
//! actual channel is the embedding application's concern. The trait is
//! `?Send` because the whole sync engine runs on one cooperative thread.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::messages::ClientMessage;

/// Error delivering a message to the authority.
///
/// A transport failure never rolls back local state — the authority is
/// expected to re-synchronize through its own diff stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("channel to authority closed")]
    Closed,
    #[error("send failed: {0}")]
    Send(String),
}

/// Ordered, at-most-once delivery of client messages to the authority.
#[async_trait(?Send)]
pub trait NotebookTransport {
    async fn send(&self, message: ClientMessage) -> Result<(), TransportError>;
}

/// Transport that forwards messages into an in-process channel.
///
/// The receiving half is handed to whatever task owns the real connection
/// (websocket writer, test harness, ...). Sending never blocks; ordering is
/// the channel's FIFO ordering.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl ChannelTransport {
    /// Create a transport plus the receiver for the wire-owning task.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait(?Send)]
impl NotebookTransport for ChannelTransport {
    async fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        self.tx.send(message).map_err(|_| TransportError::Closed)
    }
}

// ============================================================================
// Tests
// ============================================================================
