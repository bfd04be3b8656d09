//! Message classification and encoding.

use serde_json::json;

use crate::error::RpcError;

/// Generic self-describing value exchanged over the wire.
///
/// The codec boundary is value-shaped: transports decode raw bytes into
/// this type before handing frames to the session, and encode it back
/// on the way out.
pub type Value = serde_json::Value;

/// Message type tag for a request frame.
pub const TAG_REQUEST: u64 = 0;
/// Message type tag for a response frame.
pub const TAG_RESPONSE: u64 = 1;
/// Message type tag for a notification frame.
pub const TAG_NOTIFY: u64 = 2;

/// A classified wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Correlated call. The peer must answer with exactly one
    /// `Response` carrying the same `call_id`.
    Request {
        call_id: u32,
        method: String,
        args: Vec<Value>,
    },
    /// Answer to a `Request`. Exactly one of `error`/`result` is
    /// non-null.
    Response {
        call_id: u32,
        error: Value,
        result: Value,
    },
    /// Fire-and-forget call. No correlation id, no reply, ever.
    Notify { method: String, args: Vec<Value> },
}

impl Message {
    /// Classify a decoded generic value into a message.
    ///
    /// Any unknown tag or malformed shape (wrong arity, wrong element
    /// types) is a [`RpcError::Protocol`]: the connection that
    /// delivered it must be reported failed and closed, never retried.
    pub fn from_value(value: Value) -> Result<Message, RpcError> {
        let Value::Array(elems) = value else {
            return Err(RpcError::Protocol("message is not an array".into()));
        };

        let tag = elems
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| RpcError::Protocol("message has no integer type tag".into()))?;

        match tag {
            TAG_REQUEST => {
                let [_, call_id, method, args] = take_elems(elems, "request")?;
                Ok(Message::Request {
                    call_id: parse_call_id(call_id)?,
                    method: parse_method(method)?,
                    args: parse_args(args)?,
                })
            }
            TAG_RESPONSE => {
                let [_, call_id, error, result] = take_elems(elems, "response")?;
                Ok(Message::Response {
                    call_id: parse_call_id(call_id)?,
                    error,
                    result,
                })
            }
            TAG_NOTIFY => {
                let [_, method, args] = take_elems(elems, "notify")?;
                Ok(Message::Notify {
                    method: parse_method(method)?,
                    args: parse_args(args)?,
                })
            }
            other => Err(RpcError::Protocol(format!("unknown message tag: {other}"))),
        }
    }

    /// Encode this message into its wire value shape.
    pub fn into_value(self) -> Value {
        match self {
            Message::Request {
                call_id,
                method,
                args,
            } => json!([TAG_REQUEST, call_id, method, args]),
            Message::Response {
                call_id,
                error,
                result,
            } => json!([TAG_RESPONSE, call_id, error, result]),
            Message::Notify { method, args } => json!([TAG_NOTIFY, method, args]),
        }
    }

    /// The method name carried by a request or notification.
    pub fn method(&self) -> Option<&str> {
        match self {
            Message::Request { method, .. } | Message::Notify { method, .. } => Some(method),
            Message::Response { .. } => None,
        }
    }
}

fn take_elems<const N: usize>(elems: Vec<Value>, kind: &str) -> Result<[Value; N], RpcError> {
    let len = elems.len();
    elems
        .try_into()
        .map_err(|_| RpcError::Protocol(format!("{kind} message has {len} elements, expected {N}")))
}

fn parse_call_id(value: Value) -> Result<u32, RpcError> {
    value
        .as_u64()
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| RpcError::Protocol(format!("call id is not a u32: {value}")))
}

fn parse_method(value: Value) -> Result<String, RpcError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(RpcError::Protocol(format!(
            "method name is not a string: {other}"
        ))),
    }
}

fn parse_args(value: Value) -> Result<Vec<Value>, RpcError> {
    match value {
        Value::Array(args) => Ok(args),
        other => Err(RpcError::Protocol(format!(
            "argument list is not an array: {other}"
        ))),
    }
}
