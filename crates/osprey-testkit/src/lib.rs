//! Test support for osprey RPC: an in-memory paired transport and
//! session wiring helpers.
//!
//! The in-memory transport is the semantic reference for the
//! transport seam: the "codec" is the identity on generic values, so
//! everything above the byte layer (classification, correlation,
//! timeouts, binding) behaves exactly as it would over a socket.

mod mem;

pub use mem::{pair, MemTransport};

use std::sync::Arc;

use osprey_session::{Session, SessionConfig};

/// Install a tracing subscriber honoring `RUST_LOG`, writing through
/// the test capture. Safe to call from every test; the first call
/// wins and later ones are no-ops.
pub fn install_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Two sessions linked back-to-back over an in-memory transport pair,
/// with their demux loops already spawned.
pub fn linked_sessions(
    left: SessionConfig,
    right: SessionConfig,
) -> (Arc<Session<MemTransport>>, Arc<Session<MemTransport>>) {
    let (a, b) = pair();
    let left = Session::new(a, left);
    let right = Session::new(b, right);
    tokio::spawn(left.clone().run());
    tokio::spawn(right.clone().run());
    (left, right)
}
