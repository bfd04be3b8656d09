//! Client-side proxy: cached bindings turning typed calls into wire
//! requests and decoding typed results.

use std::collections::HashMap;
use std::sync::Arc;

use osprey_session::{CallFuture, Session, Transport};
use osprey_wire::{RpcError, Value};
use serde::de::DeserializeOwned;

use crate::binding::{BindError, MethodBinding};

/// Builder collecting the method bindings of one service interface.
pub struct ProxyBuilder {
    methods: HashMap<String, Arc<MethodBinding>>,
}

impl ProxyBuilder {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    pub fn method(&mut self, binding: MethodBinding) -> Result<(), BindError> {
        let name = binding.wire_name().to_owned();
        if self.methods.contains_key(&name) {
            return Err(BindError::DuplicateMethod(name));
        }
        self.methods.insert(name, Arc::new(binding));
        Ok(())
    }

    pub fn build<T: Transport>(self, session: Arc<Session<T>>) -> Proxy<T> {
        Proxy {
            session,
            methods: self.methods,
        }
    }
}

impl Default for ProxyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed client handle over a session. Bindings are built once at
/// construction and immutable afterwards.
pub struct Proxy<T: Transport> {
    session: Arc<Session<T>>,
    methods: HashMap<String, Arc<MethodBinding>>,
}

impl<T: Transport> Proxy<T> {
    pub fn session(&self) -> &Arc<Session<T>> {
        &self.session
    }

    fn binding(&self, method: &str) -> Result<&Arc<MethodBinding>, RpcError> {
        self.methods
            .get(method)
            .ok_or_else(|| RpcError::NoSuchMethod(method.to_owned()))
    }

    /// Call a bound method and decode its typed result.
    ///
    /// Arguments are given in declaration order (one per declared
    /// parameter, ignored ones included) and reordered into wire
    /// positions through the cached binding.
    pub async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> Result<R, RpcError> {
        let binding = self.binding(method)?;
        let wire = binding.wire_args(args)?;
        let result = self.session.call(binding.wire_name(), wire).await?;
        decode_result(result)
    }

    /// Call a bound method without waiting; the returned future
    /// resolves to the raw result value.
    pub async fn call_async(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> Result<CallFuture, RpcError> {
        let binding = self.binding(method)?;
        let wire = binding.wire_args(args)?;
        Ok(self.session.call_async(binding.wire_name(), wire).await)
    }

    /// Send a bound method as a notification.
    pub async fn notify(&self, method: &str, args: Vec<Value>) -> Result<(), RpcError> {
        let binding = self.binding(method)?;
        let wire = binding.wire_args(args)?;
        self.session.notify(binding.wire_name(), wire).await
    }
}

/// Decode a result value into the declared return type.
///
/// A peer that answers with a value the declared type cannot carry
/// (including a null result for a non-nullable type, the null/null
/// response case) is a protocol-level failure, not an application
/// error.
pub fn decode_result<R: DeserializeOwned>(value: Value) -> Result<R, RpcError> {
    serde_json::from_value(value)
        .map_err(|err| RpcError::Protocol(format!("result does not decode: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_typed_results() {
        let s: String = decode_result(json!("hello")).unwrap();
        assert_eq!(s, "hello");

        let opt: Option<String> = decode_result(json!(null)).unwrap();
        assert_eq!(opt, None);
    }

    #[test]
    fn null_result_for_non_nullable_type_is_protocol_error() {
        let err = decode_result::<String>(json!(null)).unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)), "got {err:?}");
    }
}
