//! Session engine for osprey RPC.
//!
//! A [`Session`] multiplexes correlated request/response exchanges and
//! fire-and-forget notifications over one transport. The key invariant
//! is that only [`Session::run`] pulls frames off the transport: all
//! inbound routing happens in that demux loop, which never runs user
//! code itself: handler invocations and completion callbacks are
//! always spawned onto the runtime's worker pool.
//!
//! ```text
//!                      ┌───────────────────────────────┐
//!                      │            Session            │
//!                      ├───────────────────────────────┤
//!                      │  transport: Arc<T>            │
//!                      │  pending: call_id →           │
//!                      │           CallFuture          │
//!                      │  handler: Option<ServiceHandler>│
//!                      └──────────────┬────────────────┘
//!                                     │
//!                                demux loop
//!                                     │
//!          ┌──────────────────────────┼──────────────────────────┐
//!          │                          │                          │
//!    response frame             request frame              notify frame
//!          │                          │                          │
//! ┌────────▼─────────┐   ┌────────────▼────────────┐  ┌──────────▼─────────┐
//! │ reconcile by id, │   │ spawn handler with an   │  │ spawn handler,     │
//! │ complete future  │   │ at-most-once reply      │  │ no reply, failures │
//! │                  │   │ handle                  │  │ only logged        │
//! └──────────────────┘   └─────────────────────────┘  └────────────────────┘
//! ```
//!
//! Two timeout paths exist independently: a caller can impose its own
//! wall-clock deadline when waiting on a [`CallFuture`], and the
//! session age-expires stale table entries through a tick-based sweep
//! ([`Session::sweep_timeouts`], normally driven by
//! [`spawn_timeout_sweeper`]) so memory cannot grow unbounded even for
//! calls nobody waits on.

mod config;
mod future;
mod inbound;
mod pending;
mod session;
mod transport;

pub use config::SessionConfig;
pub use future::CallFuture;
pub use inbound::{InboundRequest, ServiceHandler};
pub use session::{spawn_timeout_sweeper, Session, DEFAULT_SWEEP_INTERVAL};
pub use transport::{MessageSink, Transport};

use std::future::Future;
use std::pin::Pin;

/// Boxed future used at the object-safe seams (handler dispatch,
/// reply sinks).
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
