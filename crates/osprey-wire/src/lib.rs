//! Wire-level message model for osprey RPC.
//!
//! A message travels as an ordered, heterogeneous array of generic
//! values whose first element is a small integer tag:
//!
//! | Kind     | Shape                                        |
//! |----------|----------------------------------------------|
//! | Request  | `[0, call_id:int, method:string, args:array]` |
//! | Response | `[1, call_id:int, error|null, result|null]`   |
//! | Notify   | `[2, method:string, args:array]`              |
//!
//! The byte-level codec is out of scope: transports hand this crate
//! already-decoded values and accept values to encode. Anything that
//! does not classify into one of the three shapes above is a protocol
//! violation and fatal to the connection that produced it.

pub mod error;
pub mod message;

pub use error::{code, RpcError, TransportError};
pub use message::{Message, Value};
