//! Binding layer: maps method signatures to positional wire arguments
//! and back.
//!
//! A [`MethodBinding`] is declared once per method with an explicit
//! builder (there is no runtime reflection): each argument carries a
//! wire-position pin or is assigned the lowest free position in
//! declaration order, a value-kind expectation, and one of four
//! policies: `Ignore`, `Required`, `Optional`, `Nullable`.
//!
//! On the server, [`Service`] caches the bindings, checks and converts
//! inbound positional arguments, invokes the registered handler, and
//! emits exactly one response per request. On the client, [`Proxy`]
//! reorders declaration-ordered arguments into wire order and decodes
//! typed results.

mod args;
mod binding;
mod proxy;
mod service;

pub use args::BoundArgs;
pub use binding::{Arg, ArgBinding, ArgPolicy, BindError, MethodBinding, TypeExpect};
pub use proxy::{Proxy, ProxyBuilder};
pub use service::{HandlerResult, Service, ServiceBuilder};
