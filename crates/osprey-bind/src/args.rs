//! Declaration-ordered argument slots with typed extraction.

use osprey_wire::{RpcError, Value};
use serde::de::DeserializeOwned;

/// Arguments after binding: one slot per declared parameter, in
/// declaration order. `None` means the parameter was left at its
/// default (an `Optional` policy hit, or an `Ignore` parameter).
#[derive(Debug, Clone)]
pub struct BoundArgs {
    slots: Vec<Option<Value>>,
}

impl BoundArgs {
    pub(crate) fn new(slots: Vec<Option<Value>>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Raw slot value by declaration position.
    pub fn value(&self, position: usize) -> Option<&Value> {
        self.slots.get(position).and_then(Option::as_ref)
    }

    /// Extract a parameter that must be present and decode.
    pub fn required<T: DeserializeOwned>(&self, position: usize) -> Result<T, RpcError> {
        match self.value(position) {
            Some(value) => decode(position, value),
            None => Err(RpcError::InvalidArguments(format!(
                "argument at position {position} is missing"
            ))),
        }
    }

    /// Extract a parameter, falling back to `T::default()` for a
    /// defaulted slot.
    pub fn optional<T: DeserializeOwned + Default>(&self, position: usize) -> Result<T, RpcError> {
        match self.value(position) {
            Some(value) if !value.is_null() => decode(position, value),
            _ => Ok(T::default()),
        }
    }

    /// Extract a parameter that may be null.
    pub fn nullable<T: DeserializeOwned>(&self, position: usize) -> Result<Option<T>, RpcError> {
        match self.value(position) {
            Some(value) if !value.is_null() => decode(position, value).map(Some),
            _ => Ok(None),
        }
    }
}

fn decode<T: DeserializeOwned>(position: usize, value: &Value) -> Result<T, RpcError> {
    serde_json::from_value(value.clone()).map_err(|err| {
        RpcError::InvalidArguments(format!(
            "argument at position {position} does not decode: {err}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(slots: Vec<Option<Value>>) -> BoundArgs {
        BoundArgs::new(slots)
    }

    #[test]
    fn required_extraction() {
        let bound = args(vec![Some(json!("hello")), None]);
        let s: String = bound.required(0).unwrap();
        assert_eq!(s, "hello");

        let err = bound.required::<String>(1).unwrap_err();
        assert!(matches!(err, RpcError::InvalidArguments(_)));
    }

    #[test]
    fn optional_falls_back_to_default() {
        let bound = args(vec![None, Some(json!(3))]);
        let n: i64 = bound.optional(0).unwrap();
        assert_eq!(n, 0);
        let n: i64 = bound.optional(1).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn nullable_maps_null_to_none() {
        let bound = args(vec![Some(json!(null)), Some(json!("v")), None]);
        assert_eq!(bound.nullable::<String>(0).unwrap(), None);
        assert_eq!(bound.nullable::<String>(1).unwrap(), Some("v".into()));
        assert_eq!(bound.nullable::<String>(2).unwrap(), None);
    }

    #[test]
    fn decode_failure_is_invalid_arguments() {
        let bound = args(vec![Some(json!("not a number"))]);
        let err = bound.required::<i64>(0).unwrap_err();
        let RpcError::InvalidArguments(detail) = err else {
            panic!("wrong error kind");
        };
        assert!(detail.contains("position 0"), "{detail}");
    }
}
