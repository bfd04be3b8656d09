//! Collaborator boundary: the byte-stream transport.
//!
//! Connection establishment, reconnection policy, byte framing and the
//! codec all live behind this seam. A transport hands the session
//! already-decoded generic values and accepts classified messages to
//! encode and send.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use osprey_wire::{Message, TransportError, Value};

/// A connected, framed, codec-equipped byte-stream transport.
pub trait Transport: Send + Sync + 'static {
    /// Encode and send one message.
    fn send(&self, message: Message)
        -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receive the next inbound frame, decoded to a generic value but
    /// not yet classified. Resolves to [`TransportError::Closed`] once
    /// the connection is gone.
    fn recv(&self) -> impl Future<Output = Result<Value, TransportError>> + Send;

    /// Tear the connection down. Idempotent.
    fn close(&self);
}

/// Object-safe sending half of a transport, used by reply handles.
pub trait MessageSink: Send + Sync {
    fn send_message<'a>(
        &'a self,
        message: Message,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;
}

impl<T: Transport> MessageSink for T {
    fn send_message<'a>(
        &'a self,
        message: Message,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>> {
        Box::pin(self.send(message))
    }
}

/// Clone-friendly sink handle.
pub(crate) type SharedSink = Arc<dyn MessageSink>;
