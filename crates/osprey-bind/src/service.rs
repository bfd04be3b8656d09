//! Server-side invoker: cached method bindings dispatching inbound
//! requests to registered handlers, with exactly one response each.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use osprey_session::{BoxFuture, InboundRequest, ServiceHandler};
use osprey_wire::{RpcError, Value};

use crate::args::BoundArgs;
use crate::binding::{BindError, MethodBinding};

/// Outcome of a user handler. An `Err` payload travels verbatim in
/// the error slot of the response, so handlers control what the
/// remote caller gets to inspect.
pub type HandlerResult = Result<Value, Value>;

type PlainFn = Box<dyn Fn(BoundArgs) -> BoxFuture<HandlerResult> + Send + Sync>;
type HandleFn = Box<dyn Fn(InboundRequest, BoundArgs) -> BoxFuture<()> + Send + Sync>;

enum MethodKind {
    /// The invoker sends the response from the handler's outcome.
    Plain(PlainFn),
    /// The handler owns the request handle and replies itself,
    /// exactly once.
    WithHandle(HandleFn),
}

struct MethodEntry {
    binding: MethodBinding,
    kind: MethodKind,
}

/// Builder registering method bindings and their handlers.
pub struct ServiceBuilder {
    methods: HashMap<String, Arc<MethodEntry>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a method whose response is generated automatically
    /// from the handler's return value.
    pub fn method<F, Fut>(&mut self, binding: MethodBinding, handler: F) -> Result<(), BindError>
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let plain: PlainFn = Box::new(move |args| Box::pin(handler(args)));
        self.insert(binding, MethodKind::Plain(plain))
    }

    /// Register a handle-style method: the handler receives the
    /// inbound request and must reply through it itself.
    pub fn method_with_handle<F, Fut>(
        &mut self,
        binding: MethodBinding,
        handler: F,
    ) -> Result<(), BindError>
    where
        F: Fn(InboundRequest, BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let with_handle: HandleFn =
            Box::new(move |request, args| Box::pin(handler(request, args)));
        self.insert(binding.into_handle_style(), MethodKind::WithHandle(with_handle))
    }

    fn insert(&mut self, binding: MethodBinding, kind: MethodKind) -> Result<(), BindError> {
        let name = binding.wire_name().to_owned();
        if self.methods.contains_key(&name) {
            return Err(BindError::DuplicateMethod(name));
        }
        self.methods
            .insert(name, Arc::new(MethodEntry { binding, kind }));
        Ok(())
    }

    pub fn build(self) -> Arc<Service> {
        Arc::new(Service {
            methods: self.methods,
        })
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound service: immutable method table, shareable across the
/// sessions it is bound to.
pub struct Service {
    methods: HashMap<String, Arc<MethodEntry>>,
}

impl Service {
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    fn lookup(&self, method: &str) -> Option<Arc<MethodEntry>> {
        self.methods.get(method).cloned()
    }
}

impl ServiceHandler for Service {
    fn handle_request(&self, request: InboundRequest) -> BoxFuture<()> {
        // Unknown method fails before any binding logic runs.
        let Some(entry) = self.lookup(request.method()) else {
            return Box::pin(async move {
                let payload =
                    RpcError::NoSuchMethod(request.method().to_owned()).to_payload();
                request.send_error(payload).await;
            });
        };

        Box::pin(async move {
            let bound = match entry.binding.bind(request.args()) {
                Ok(bound) => bound,
                Err(err) => {
                    request.send_error(err.to_payload()).await;
                    return;
                }
            };
            match &entry.kind {
                MethodKind::Plain(handler) => match handler(bound).await {
                    Ok(result) => request.send_result(result).await,
                    Err(payload) => request.send_error(payload).await,
                },
                MethodKind::WithHandle(handler) => handler(request, bound).await,
            }
        })
    }

    fn handle_notify(&self, method: String, args: Vec<Value>) -> BoxFuture<()> {
        let entry = self.lookup(&method);
        Box::pin(async move {
            // Notifications carry no correlation id: failures of any
            // kind are loggable only, never sent back.
            let Some(entry) = entry else {
                tracing::warn!(method = %method, "notify for unknown method dropped");
                return;
            };
            let bound = match entry.binding.bind(&args) {
                Ok(bound) => bound,
                Err(err) => {
                    tracing::warn!(method = %method, error = %err, "notify arguments rejected");
                    return;
                }
            };
            match &entry.kind {
                MethodKind::Plain(handler) => {
                    if let Err(payload) = handler(bound).await {
                        tracing::debug!(method = %method, %payload, "notify handler failed");
                    }
                }
                MethodKind::WithHandle(_) => {
                    tracing::warn!(
                        method = %method,
                        "notify cannot target a handle-style method"
                    );
                }
            }
        })
    }
}
