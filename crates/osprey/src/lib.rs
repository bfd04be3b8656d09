//! Osprey: a compact asynchronous RPC runtime.
//!
//! Calls are correlated request/response exchanges multiplexed over a
//! byte-stream transport, with per-call timeouts, fire-and-forget
//! notifications, and a declarative binding layer mapping method
//! signatures to positional wire arguments.
//!
//! ```no_run
//! use std::sync::Arc;
//! use osprey::{
//!     Arg, MethodBinding, ProxyBuilder, ServiceBuilder, Session, SessionConfig,
//!     TypeExpect,
//! };
//! # use osprey::Transport;
//! # async fn demo<T: Transport>(client_side: T, server_side: T) -> Result<(), Box<dyn std::error::Error>> {
//! // Server: bind a service to a session.
//! let mut service = ServiceBuilder::new();
//! service.method(
//!     MethodBinding::positional("echo", &[TypeExpect::String]),
//!     |args| async move {
//!         let s: String = args.required(0).map_err(|e| e.to_payload())?;
//!         Ok(s.into())
//!     },
//! )?;
//! let server = Session::new(server_side, SessionConfig::default());
//! server.bind(service.build());
//! tokio::spawn(server.clone().run());
//!
//! // Client: call through a typed proxy.
//! let client = Session::new(client_side, SessionConfig::with_request_timeout(5));
//! tokio::spawn(client.clone().run());
//! let mut proxy = ProxyBuilder::new();
//! proxy.method(MethodBinding::positional("echo", &[TypeExpect::String]))?;
//! let proxy = proxy.build(client);
//! let echoed: String = proxy.call("echo", vec!["hello".into()]).await?;
//! assert_eq!(echoed, "hello");
//! # Ok(())
//! # }
//! ```

pub use osprey_wire::{code, Message, RpcError, TransportError, Value};

pub use osprey_session::{
    spawn_timeout_sweeper, BoxFuture, CallFuture, InboundRequest, MessageSink, ServiceHandler,
    Session, SessionConfig, Transport, DEFAULT_SWEEP_INTERVAL,
};

pub use osprey_bind::{
    Arg, ArgBinding, ArgPolicy, BindError, BoundArgs, HandlerResult, MethodBinding, Proxy,
    ProxyBuilder, Service, ServiceBuilder, TypeExpect,
};
