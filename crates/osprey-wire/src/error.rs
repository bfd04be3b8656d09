//! Error taxonomy for calls and transports.

use thiserror::Error;

use crate::message::Value;

/// Error payload codes used for failures raised by the runtime itself
/// (as opposed to application errors surfaced by user handlers).
///
/// Runtime-generated error payloads are two-element arrays
/// `[code, message]` so a caller can tell them apart from application
/// payloads, which pass through verbatim.
pub mod code {
    pub const NO_SUCH_METHOD: &str = "NoSuchMethod";
    pub const INVALID_ARGUMENTS: &str = "InvalidArguments";
    pub const CALL_ERROR: &str = "CallError";
}

/// The outcome of a failed call, or a session-level failure.
///
/// Everything except `Protocol` and `Transport` is delivered as the
/// outcome of a specific call's future; those two are fatal to the
/// connection that produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    /// The call's future was force-completed, either by the waiter's
    /// wall-clock deadline or by the session's tick-based sweep.
    #[error("call timed out")]
    Timeout,

    /// The pending call was invalidated by explicit session shutdown.
    #[error("session closed")]
    SessionClosed,

    /// Wire argument count or type mismatch against a bound method
    /// signature.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The inbound request named a method not present in the bound
    /// service.
    #[error("no such method: {0}")]
    NoSuchMethod(String),

    /// The peer's handler raised an application-level error. Carries
    /// the peer-supplied payload verbatim for inspection.
    #[error("remote error: {0}")]
    Remote(Value),

    /// Malformed or unrecognized message shape or tag. Fatal to the
    /// connection, never retried.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The transport failed while sending or receiving.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl RpcError {
    /// Build the wire error payload for this error, as carried in the
    /// `error` slot of a response.
    pub fn to_payload(&self) -> Value {
        match self {
            RpcError::NoSuchMethod(method) => {
                Value::from(vec![Value::from(code::NO_SUCH_METHOD), Value::from(method.as_str())])
            }
            RpcError::InvalidArguments(detail) => Value::from(vec![
                Value::from(code::INVALID_ARGUMENTS),
                Value::from(detail.as_str()),
            ]),
            RpcError::Remote(payload) => payload.clone(),
            other => Value::from(vec![
                Value::from(code::CALL_ERROR),
                Value::from(other.to_string()),
            ]),
        }
    }

    /// The runtime error code of a remote payload, if it carries one.
    ///
    /// Returns `None` for application payloads that don't follow the
    /// `[code, message]` convention.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            RpcError::Remote(Value::Array(elems)) => elems.first().and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Failure at the byte-stream transport boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection is closed; no further frames will flow.
    #[error("transport closed")]
    Closed,

    /// The peer or the OS failed the connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}
