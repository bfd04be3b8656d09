//! Inbound request handling: the at-most-once reply handle and the
//! service seam the demux loop dispatches into.

use parking_lot::Mutex;

use osprey_wire::{Message, Value};

use crate::transport::SharedSink;
use crate::BoxFuture;

/// The service side of a session: invoked by the demux loop for every
/// inbound request and notification.
///
/// Implementations must not block; they return futures that the
/// session spawns onto the worker pool, so the demux loop never runs
/// user code. A request handler owns its [`InboundRequest`] and is
/// responsible for replying through it (directly or via automatic
/// response generation in the binding layer); a notification produces
/// no reply even on failure, since there is no correlation id to
/// address one to.
pub trait ServiceHandler: Send + Sync + 'static {
    fn handle_request(&self, request: InboundRequest) -> BoxFuture<()>;
    fn handle_notify(&self, method: String, args: Vec<Value>) -> BoxFuture<()>;
}

/// One inbound request, wrapping the means to send exactly one
/// response for it.
///
/// The reply channel is consumed by the first `send_*` call; the
/// handle is inert afterwards and further sends are no-ops. This is
/// what enforces the at-most-once reply property even when user code
/// and automatic error responses race.
pub struct InboundRequest {
    call_id: u32,
    method: String,
    args: Vec<Value>,
    sink: Mutex<Option<SharedSink>>,
}

impl InboundRequest {
    pub(crate) fn new(sink: SharedSink, call_id: u32, method: String, args: Vec<Value>) -> Self {
        Self {
            call_id,
            method,
            args,
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Correlation id of the request this handle answers.
    pub fn call_id(&self) -> u32 {
        self.call_id
    }

    /// Wire method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Positional wire arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Whether a response was already sent.
    pub fn is_replied(&self) -> bool {
        self.sink.lock().is_none()
    }

    /// Send a successful result. No-op if already replied.
    pub async fn send_result(&self, result: Value) {
        self.send_response(Value::Null, result).await;
    }

    /// Send an error payload. No-op if already replied.
    pub async fn send_error(&self, error: Value) {
        self.send_response(error, Value::Null).await;
    }

    /// Send the response, consuming the reply channel.
    pub async fn send_response(&self, error: Value, result: Value) {
        let Some(sink) = self.sink.lock().take() else {
            tracing::debug!(
                call_id = self.call_id,
                method = %self.method,
                "duplicate response suppressed"
            );
            return;
        };
        let message = Message::Response {
            call_id: self.call_id,
            error,
            result,
        };
        if let Err(err) = sink.send_message(message).await {
            tracing::debug!(
                call_id = self.call_id,
                error = %err,
                "failed to send response"
            );
        }
    }
}

impl std::fmt::Debug for InboundRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundRequest")
            .field("call_id", &self.call_id)
            .field("method", &self.method)
            .field("replied", &self.is_replied())
            .finish()
    }
}
