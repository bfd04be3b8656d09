//! Per-method argument binding: policies, wire-index resolution, and
//! the bind/reorder algorithms.

use osprey_wire::{RpcError, Value};
use thiserror::Error;

use crate::args::BoundArgs;

/// Per-argument binding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPolicy {
    /// The parameter takes no wire position at all; the handler slot
    /// is always left defaulted.
    Ignore,
    /// A null (or missing) wire value fails the call.
    Required,
    /// A null or missing wire value leaves the parameter at its
    /// default.
    Optional,
    /// A null wire value sets the parameter to null.
    Nullable,
}

/// Value-kind expectation for a bound argument, checked before the
/// handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeExpect {
    Any,
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl TypeExpect {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            TypeExpect::Any => true,
            TypeExpect::Bool => value.is_boolean(),
            TypeExpect::Integer => value.is_i64() || value.is_u64(),
            TypeExpect::Float => value.is_number(),
            TypeExpect::String => value.is_string(),
            TypeExpect::Array => value.is_array(),
            TypeExpect::Object => value.is_object(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeExpect::Any => "any",
            TypeExpect::Bool => "bool",
            TypeExpect::Integer => "integer",
            TypeExpect::Float => "number",
            TypeExpect::String => "string",
            TypeExpect::Array => "array",
            TypeExpect::Object => "object",
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declarative argument specification fed to the binding builder.
#[derive(Debug, Clone)]
pub struct Arg {
    expect: TypeExpect,
    policy: ArgPolicy,
    index: Option<usize>,
}

impl Arg {
    /// A nullable argument of the given kind (null on the wire maps to
    /// a null parameter). This is the default policy.
    pub fn of(expect: TypeExpect) -> Self {
        Self {
            expect,
            policy: ArgPolicy::Nullable,
            index: None,
        }
    }

    /// An argument that fails the call when null or missing.
    pub fn required(expect: TypeExpect) -> Self {
        Self {
            expect,
            policy: ArgPolicy::Required,
            index: None,
        }
    }

    /// An argument left at its default when null or missing.
    pub fn optional(expect: TypeExpect) -> Self {
        Self {
            expect,
            policy: ArgPolicy::Optional,
            index: None,
        }
    }

    /// A parameter with no wire representation.
    pub fn ignore() -> Self {
        Self {
            expect: TypeExpect::Any,
            policy: ArgPolicy::Ignore,
            index: None,
        }
    }

    /// Pin this argument to an explicit wire position.
    pub fn at(mut self, wire_index: usize) -> Self {
        self.index = Some(wire_index);
        self
    }
}

/// Binding of one declared parameter to its wire position.
#[derive(Debug, Clone)]
pub struct ArgBinding {
    /// Declaration position of the parameter.
    pub position: usize,
    /// Assigned wire position. Meaningless for `Ignore`.
    pub wire_index: usize,
    pub expect: TypeExpect,
    pub policy: ArgPolicy,
}

/// Binding construction failure: a configuration error, caught when
/// the binding is built rather than at call time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("duplicate wire index {0}")]
    DuplicateWireIndex(usize),

    #[error("wire index {0} is bound to no parameter")]
    UnboundWireIndex(usize),

    #[error("method {0:?} is already registered")]
    DuplicateMethod(String),
}

/// Immutable, cacheable binding for one method: the wire name, the
/// per-argument bindings in declaration order, the wire-order lookup,
/// and the minimum wire argument count.
#[derive(Debug, Clone)]
pub struct MethodBinding {
    wire_name: String,
    takes_handle: bool,
    /// Declaration order.
    args: Vec<ArgBinding>,
    /// wire index → declaration position.
    by_wire: Vec<usize>,
    /// 1 + highest wire index among non-`Optional`, non-`Ignore`
    /// bindings. Calls supplying fewer wire arguments fail.
    min_args: usize,
}

/// Builder for [`MethodBinding`].
#[derive(Debug, Clone)]
pub struct MethodBindingBuilder {
    wire_name: String,
    takes_handle: bool,
    args: Vec<Arg>,
}

impl MethodBinding {
    pub fn builder(wire_name: impl Into<String>) -> MethodBindingBuilder {
        MethodBindingBuilder {
            wire_name: wire_name.into(),
            takes_handle: false,
            args: Vec::new(),
        }
    }

    /// Shorthand for a binding whose arguments are all required, in
    /// declaration order. Nothing is pinned, so construction cannot
    /// fail.
    pub fn positional(
        wire_name: impl Into<String>,
        expects: &[TypeExpect],
    ) -> MethodBinding {
        let args: Vec<ArgBinding> = expects
            .iter()
            .enumerate()
            .map(|(position, &expect)| ArgBinding {
                position,
                wire_index: position,
                expect,
                policy: ArgPolicy::Required,
            })
            .collect();
        let by_wire = (0..args.len()).collect();
        let min_args = args.len();
        MethodBinding {
            wire_name: wire_name.into(),
            takes_handle: false,
            args,
            by_wire,
            min_args,
        }
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Whether the handler takes the inbound-request handle and sends
    /// its own response.
    pub fn takes_handle(&self) -> bool {
        self.takes_handle
    }

    pub(crate) fn into_handle_style(mut self) -> Self {
        self.takes_handle = true;
        self
    }

    /// Declaration-ordered argument bindings.
    pub fn args(&self) -> &[ArgBinding] {
        &self.args
    }

    /// Minimum number of wire arguments a call must supply.
    pub fn min_args(&self) -> usize {
        self.min_args
    }

    /// Number of wire positions this binding spans.
    pub fn wire_len(&self) -> usize {
        self.by_wire.len()
    }

    /// Bind inbound positional wire arguments to declaration-ordered
    /// slots, applying each argument's policy and kind check.
    ///
    /// Positions beyond the supplied count are treated as null, which
    /// by construction only reaches non-`Required` bindings.
    pub fn bind(&self, supplied: &[Value]) -> Result<BoundArgs, RpcError> {
        if supplied.len() < self.min_args {
            return Err(RpcError::InvalidArguments(format!(
                "method {:?} needs at least {} argument(s), got {}",
                self.wire_name,
                self.min_args,
                supplied.len()
            )));
        }

        let mut slots: Vec<Option<Value>> = vec![None; self.args.len()];
        for (wire_index, &position) in self.by_wire.iter().enumerate() {
            let binding = &self.args[position];
            let value = supplied.get(wire_index).cloned().unwrap_or(Value::Null);
            if value.is_null() {
                match binding.policy {
                    ArgPolicy::Required => {
                        return Err(RpcError::InvalidArguments(format!(
                            "argument {wire_index} of {:?} is required but null",
                            self.wire_name
                        )));
                    }
                    // Left at the handler's default.
                    ArgPolicy::Optional => {}
                    ArgPolicy::Nullable => slots[position] = Some(Value::Null),
                    ArgPolicy::Ignore => unreachable!("ignored args take no wire position"),
                }
            } else {
                if !binding.expect.matches(&value) {
                    return Err(RpcError::InvalidArguments(format!(
                        "argument {wire_index} of {:?} expected {}, got {}",
                        self.wire_name,
                        binding.expect.name(),
                        kind_of(&value)
                    )));
                }
                slots[position] = Some(value);
            }
        }
        Ok(BoundArgs::new(slots))
    }

    /// Reorder declaration-ordered call arguments into wire order,
    /// the inverse of [`bind`](Self::bind). Used by the client proxy.
    ///
    /// A `Required` parameter with a null value is rejected here, at
    /// call-build time, before anything reaches the wire.
    pub fn wire_args(&self, declared: Vec<Value>) -> Result<Vec<Value>, RpcError> {
        if declared.len() != self.args.len() {
            return Err(RpcError::InvalidArguments(format!(
                "method {:?} declares {} argument(s), got {}",
                self.wire_name,
                self.args.len(),
                declared.len()
            )));
        }

        let mut wire = vec![Value::Null; self.by_wire.len()];
        for (binding, value) in self.args.iter().zip(declared) {
            match binding.policy {
                ArgPolicy::Ignore => continue,
                ArgPolicy::Required if value.is_null() => {
                    return Err(RpcError::InvalidArguments(format!(
                        "argument {} of {:?} is required",
                        binding.position, self.wire_name
                    )));
                }
                _ => wire[binding.wire_index] = value,
            }
        }
        Ok(wire)
    }
}

impl MethodBindingBuilder {
    /// Declare the next parameter.
    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    /// Mark the method handle-style: the handler receives the inbound
    /// request and is responsible for replying exactly once itself.
    pub fn with_handle(mut self) -> Self {
        self.takes_handle = true;
        self
    }

    /// Resolve wire positions and build the immutable binding.
    ///
    /// Pinned arguments take their wire position first; unpinned
    /// arguments then fill the lowest free positions in declaration
    /// order. Non-ignored positions must come out unique and
    /// contiguous from zero.
    pub fn build(self) -> Result<MethodBinding, BindError> {
        let mut resolved: Vec<ArgBinding> = Vec::with_capacity(self.args.len());
        let mut used: Vec<Option<usize>> = Vec::new();

        let mut claim = |wire_index: usize, position: usize, used: &mut Vec<Option<usize>>| {
            if used.len() <= wire_index {
                used.resize(wire_index + 1, None);
            }
            if used[wire_index].is_some() {
                return Err(BindError::DuplicateWireIndex(wire_index));
            }
            used[wire_index] = Some(position);
            Ok(())
        };

        // Pinned arguments first.
        for (position, arg) in self.args.iter().enumerate() {
            if arg.policy == ArgPolicy::Ignore {
                continue;
            }
            if let Some(wire_index) = arg.index {
                claim(wire_index, position, &mut used)?;
            }
        }

        // Unpinned arguments fill the lowest free positions in
        // declaration order.
        let mut next_free = 0usize;
        for (position, arg) in self.args.iter().enumerate() {
            let wire_index = match (arg.policy, arg.index) {
                (ArgPolicy::Ignore, _) => usize::MAX,
                (_, Some(pinned)) => pinned,
                (_, None) => {
                    while used.get(next_free).is_some_and(Option::is_some) {
                        next_free += 1;
                    }
                    claim(next_free, position, &mut used)?;
                    next_free
                }
            };
            resolved.push(ArgBinding {
                position,
                wire_index,
                expect: arg.expect,
                policy: arg.policy,
            });
        }

        let mut by_wire = Vec::with_capacity(used.len());
        for (wire_index, position) in used.iter().enumerate() {
            match position {
                Some(position) => by_wire.push(*position),
                None => return Err(BindError::UnboundWireIndex(wire_index)),
            }
        }

        let min_args = resolved
            .iter()
            .filter(|b| !matches!(b.policy, ArgPolicy::Optional | ArgPolicy::Ignore))
            .map(|b| b.wire_index + 1)
            .max()
            .unwrap_or(0);

        Ok(MethodBinding {
            wire_name: self.wire_name,
            takes_handle: self.takes_handle,
            args: resolved,
            by_wire,
            min_args,
        })
    }
}
