//! The session: correlation ids, the call APIs, response
//! reconciliation, the timeout sweep, and the inbound demux loop.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use osprey_wire::{Message, RpcError, TransportError, Value};

use crate::config::SessionConfig;
use crate::future::CallFuture;
use crate::inbound::{InboundRequest, ServiceHandler};
use crate::pending::PendingCalls;
use crate::transport::Transport;

use parking_lot::Mutex;

/// Interval at which [`spawn_timeout_sweeper`] drives the sweep.
/// One tick of a call's countdown corresponds to one interval, so the
/// configured request timeout is measured in these units.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// A client/server endpoint multiplexed over one transport.
///
/// Outbound: [`call`](Session::call), [`call_async`](Session::call_async)
/// and [`notify`](Session::notify). Inbound: [`run`](Session::run)
/// demultiplexes frames, reconciling responses against the pending
/// table and routing requests/notifications to the bound
/// [`ServiceHandler`].
pub struct Session<T: Transport> {
    transport: Arc<T>,
    next_call_id: AtomicU32,
    /// Seconds; zero disables sweep-based expiry.
    request_timeout: AtomicU32,
    pending: PendingCalls,
    handler: Mutex<Option<Arc<dyn ServiceHandler>>>,
    closed: AtomicBool,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: SessionConfig) -> Arc<Self> {
        Arc::new(Self {
            transport: Arc::new(transport),
            next_call_id: AtomicU32::new(0),
            request_timeout: AtomicU32::new(config.request_timeout_secs),
            pending: PendingCalls::new(),
            handler: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Bind the service that answers inbound requests and
    /// notifications on this session.
    pub fn bind(&self, handler: Arc<dyn ServiceHandler>) {
        *self.handler.lock() = Some(handler);
    }

    /// Configured request timeout in seconds. Zero means calls are
    /// exempt from sweep-based expiry.
    pub fn request_timeout(&self) -> u32 {
        self.request_timeout.load(Ordering::Relaxed)
    }

    /// Adjust the request timeout. Affects calls issued afterwards.
    pub fn set_request_timeout(&self, secs: u32) {
        self.request_timeout.store(secs, Ordering::Relaxed);
    }

    /// Number of in-flight calls.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Issue a call and wait for its outcome, using the configured
    /// request timeout as a wall-clock deadline (no deadline when the
    /// timeout is zero).
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        let timeout = self.request_timeout();
        let future = self.call_async(method, args).await;
        if timeout > 0 {
            future.wait_deadline(Duration::from_secs(u64::from(timeout))).await
        } else {
            future.wait().await
        }
    }

    /// Issue a call and return its future without waiting.
    ///
    /// The pending-table entry is inserted before the request is
    /// handed to the transport, so a reply can never arrive for an id
    /// the table does not know yet. A transport send failure completes
    /// the future immediately.
    pub async fn call_async(&self, method: &str, args: Vec<Value>) -> CallFuture {
        let timeout = self.request_timeout();
        let future = CallFuture::new((timeout > 0).then_some(timeout));

        if self.is_closed() {
            future.complete(Err(RpcError::SessionClosed));
            return future;
        }

        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(call_id, future.clone());

        let message = Message::Request {
            call_id,
            method: method.to_owned(),
            args,
        };
        if let Err(err) = self.transport.send(message).await {
            self.pending.remove(call_id);
            future.complete(Err(err.into()));
        }
        future
    }

    /// Send a notification: no table entry, no future, no reply.
    pub async fn notify(&self, method: &str, args: Vec<Value>) -> Result<(), RpcError> {
        let message = Message::Notify {
            method: method.to_owned(),
            args,
        };
        self.transport.send(message).await?;
        Ok(())
    }

    /// Reconcile an inbound response against the pending table.
    ///
    /// An unknown call id (already swept, duplicate, or spurious) is
    /// dropped silently; not an error condition for the session.
    pub fn on_response(&self, call_id: u32, error: Value, result: Value) {
        let Some(future) = self.pending.remove(call_id) else {
            tracing::debug!(call_id, "dropping response for unknown call id");
            return;
        };
        let outcome = if error.is_null() {
            Ok(result)
        } else {
            Err(RpcError::Remote(error))
        };
        future.complete(outcome);
    }

    /// Step every pending call's countdown and force-complete the
    /// expired ones with [`RpcError::Timeout`].
    ///
    /// Safe to run concurrently with `call`, `on_response` and
    /// `close`: expiry is decided under the table lock, completion
    /// happens outside it, and the futures' one-shot transition breaks
    /// any tie with a racing genuine response.
    pub fn sweep_timeouts(&self) {
        for (call_id, future) in self.pending.sweep() {
            tracing::debug!(call_id, "call expired by timeout sweep");
            future.complete(Err(RpcError::Timeout));
        }
    }

    /// Close the transport and fail every remaining pending call with
    /// [`RpcError::SessionClosed`]. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.transport.close();
        for future in self.pending.drain() {
            future.complete(Err(RpcError::SessionClosed));
        }
    }

    fn current_handler(&self) -> Option<Arc<dyn ServiceHandler>> {
        self.handler.lock().clone()
    }

    /// Demux loop. Pulls decoded frames from the transport until the
    /// connection closes; a malformed frame is a protocol violation
    /// that fails the connection.
    ///
    /// Handler invocations are spawned onto the worker pool so this
    /// loop never runs user code; response reconciliation happens
    /// inline (completion callbacks are themselves spawned).
    pub async fn run(self: Arc<Self>) -> Result<(), RpcError> {
        loop {
            let value = match self.transport.recv().await {
                Ok(value) => value,
                Err(TransportError::Closed) => {
                    self.close();
                    return Ok(());
                }
                Err(err) => {
                    self.close();
                    return Err(err.into());
                }
            };

            let message = match Message::from_value(value) {
                Ok(message) => message,
                Err(err) => {
                    tracing::error!(error = %err, "protocol violation, failing connection");
                    self.close();
                    return Err(err);
                }
            };

            match message {
                Message::Response {
                    call_id,
                    error,
                    result,
                } => self.on_response(call_id, error, result),

                Message::Request {
                    call_id,
                    method,
                    args,
                } => {
                    let request = InboundRequest::new(
                        self.transport.clone(),
                        call_id,
                        method,
                        args,
                    );
                    match self.current_handler() {
                        Some(handler) => {
                            tokio::spawn(handler.handle_request(request));
                        }
                        None => {
                            tracing::warn!(
                                call_id,
                                method = request.method(),
                                "inbound request but no service bound"
                            );
                            tokio::spawn(async move {
                                request
                                    .send_error(no_service_payload(request.method()))
                                    .await;
                            });
                        }
                    }
                }

                Message::Notify { method, args } => match self.current_handler() {
                    Some(handler) => {
                        tokio::spawn(handler.handle_notify(method, args));
                    }
                    None => {
                        tracing::warn!(method = %method, "inbound notify but no service bound");
                    }
                },
            }
        }
    }
}

fn no_service_payload(method: &str) -> Value {
    RpcError::NoSuchMethod(method.to_owned()).to_payload()
}

/// Drive [`Session::sweep_timeouts`] at a fixed interval until the
/// session closes. The interval is the tick unit of every call's
/// countdown; [`DEFAULT_SWEEP_INTERVAL`] is one second.
pub fn spawn_timeout_sweeper<T: Transport>(
    session: Arc<Session<T>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick of a tokio interval fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if session.is_closed() {
                return;
            }
            session.sweep_timeouts();
        }
    })
}
