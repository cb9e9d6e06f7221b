//! Stand-in for "an arbitrary live value drawn from the kernel namespace".
//!
//! The real planner this crate is modeled on sits behind a Python kernel: it
//! never executes user code and never constructs values itself, it only
//! walks whatever object a `Namespace` hands it. Since nothing here runs a
//! real interpreter, [`Value`] is a closed enum covering the nine dispatch
//! categories from the IdGraph builder one-for-one, so the rest of the crate
//! (and its tests) have something concrete to walk.
//!
//! Mutable containers are `Rc<RefCell<_>>` so two variable bindings can alias
//! the same allocation — exactly the aliasing the AHG's co-variable groups
//! exist to track — and so a test can mutate a list in place without
//! rebinding it (the in-place-mutation scenario in the design doc).

use std::cell::RefCell;
use std::rc::Rc;

/// A process-stable identity token for a non-primitive value. Derived from
/// the address of the `Rc` allocation backing it, which is stable for the
/// lifetime of that allocation and distinct across independently-created
/// objects — exactly the contract the IdGraph builder needs.
pub type Identity = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    NotImplemented,
    Ellipsis,
}

/// A qualified type or class object (dispatch category 6).
#[derive(Debug)]
pub struct TypeHandle {
    pub qualified_name: String,
}

/// A function or method value (dispatch category 7). `code_digest` models
/// "if available, code-object digest"; when absent the callable fingerprints
/// by name alone. `reducer` models whether the store can actually persist
/// this callable (most closures/builtins can't — see the unserializable
/// scenario in the design doc).
#[derive(Debug)]
pub struct CallableInfo {
    pub qualified_name: String,
    pub code_digest: Option<[u8; 32]>,
    pub has_reducer: bool,
}

/// The `(constructor, args, state)` triple a custom object's reducer
/// produces (dispatch category 8).
#[derive(Debug)]
pub struct CustomObject {
    pub constructor: String,
    pub args: Vec<Value>,
    pub state: Vec<(String, Value)>,
}

/// Anything that doesn't fit another category (dispatch category 9). Carries
/// only a type name — the builder supplies the identity token.
#[derive(Debug)]
pub struct OpaqueObject {
    pub type_name: String,
}

/// A live value from the namespace. Exactly one of the nine IdGraph dispatch
/// categories applies to any given variant.
#[derive(Clone)]
pub enum Value {
    // --- category 1: primitive ---
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Sentinel(Sentinel),

    // --- category 2: ordered collection ---
    /// Immutable ordered sequence ("tuple").
    Tuple(Rc<Vec<Value>>),
    /// Mutable ordered sequence ("list"). The only container a test can
    /// mutate in place without rebinding the variable.
    List(Rc<RefCell<Vec<Value>>>),

    // --- category 3: unordered collection of hashable elements ---
    Set(Rc<RefCell<Vec<Value>>>),

    // --- category 4: keyed mapping ---
    Map(Rc<RefCell<Vec<(Value, Value)>>>),

    // --- category 5: byte buffer ---
    Bytes(Rc<Vec<u8>>),

    // --- category 6: type / class object ---
    TypeObject(Rc<TypeHandle>),

    // --- category 7: callable ---
    Callable(Rc<CallableInfo>),

    // --- category 8: custom object exposing a reducer ---
    Custom(Rc<RefCell<CustomObject>>),

    // --- category 9: opaque object ---
    Opaque(Rc<OpaqueObject>),
}

impl Value {
    /// Returns the process-stable identity token for non-primitive values,
    /// or `None` for primitives (which the comparator never treats as
    /// contributing to `overlap`).
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Value::Null
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Str(_)
            | Value::Sentinel(_) => None,
            Value::Tuple(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::List(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::Set(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::Map(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::Bytes(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::TypeObject(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::Callable(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::Custom(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::Opaque(rc) => Some(Rc::as_ptr(rc) as usize),
        }
    }

    /// Stable type tag used by the comparator's "same type" checks and by
    /// the IdGraph node's `type_tag` field.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Sentinel(_) => "sentinel",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Bytes(_) => "bytes",
            Value::TypeObject(_) => "type",
            Value::Callable(_) => "callable",
            Value::Custom(_) => "custom",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Whether the IdGraph built from this value's current shape could be
    /// persisted by a value store. Only reachable for leaf categories that
    /// refuse serialization outright: an opaque object, or a callable with
    /// no reducer. Containers are serializable iff every element is.
    pub fn is_serializable(&self) -> bool {
        match self {
            Value::Opaque(_) => false,
            Value::Callable(info) => info.has_reducer,
            Value::Tuple(items) => items.iter().all(Value::is_serializable),
            Value::List(items) => items.borrow().iter().all(Value::is_serializable),
            Value::Set(items) => items.borrow().iter().all(Value::is_serializable),
            Value::Map(pairs) => pairs
                .borrow()
                .iter()
                .all(|(k, v)| k.is_serializable() && v.is_serializable()),
            Value::Custom(obj) => {
                let obj = obj.borrow();
                obj.args.iter().all(Value::is_serializable)
                    && obj.state.iter().all(|(_, v)| v.is_serializable())
            }
            _ => true,
        }
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(items))
    }

    pub fn str(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn opaque_callable(qualified_name: impl Into<String>) -> Value {
        Value::Callable(Rc::new(CallableInfo {
            qualified_name: qualified_name.into(),
            code_digest: None,
            has_reducer: false,
        }))
    }
}
