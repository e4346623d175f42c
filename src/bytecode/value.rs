//! Runtime values for the bytecode VM.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::bytecode::builtins::BuiltinFn;

/// A runtime value. Aggregates are `Rc`-shared; all operations that
/// "modify" an array, hash or string build a fresh value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// String value
    String(Rc<String>),
    /// Null value
    Null,
    /// Array value
    Array(Rc<Vec<Value>>),
    /// Hash value; insertion order is preserved for display
    Hash(Rc<IndexMap<HashKey, Value>>),
    /// A compiled function, as stored in the constant pool
    Function(Rc<CompiledFunction>),
    /// A callable: compiled function plus captured values
    Closure(Rc<Closure>),
    /// Host-provided builtin function
    Builtin(&'static BuiltinFn),
    /// Runtime error produced by a builtin; flows through the stack as
    /// an ordinary value rather than aborting the VM
    Error(Rc<String>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(Rc::new(s.into()))
    }

    pub fn error(message: impl Into<String>) -> Value {
        Value::Error(Rc::new(message.into()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Null => "Null",
            Value::Array(_) => "Array",
            Value::Hash(_) => "Hash",
            Value::Function(_) => "Function",
            Value::Closure(_) => "Function",
            Value::Builtin(_) => "Builtin",
            Value::Error(_) => "Error",
        }
    }

    /// Only `false` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Null)
    }

    /// Convert to a hash key, if this type admits one.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Int(n) => Some(HashKey::Int(*n)),
            Value::Bool(b) => Some(HashKey::Bool(*b)),
            Value::String(s) => Some(HashKey::String(Rc::clone(s))),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Null => write!(f, "null"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, value) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Function(_) => write!(f, "<fn>"),
            Value::Closure(_) => write!(f, "<fn>"),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

/// Keys admissible in a hash: integers, booleans and strings. Equality
/// combines the type tag and the payload, so `1`, `true` and `"1"` are
/// three distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Int(i64),
    Bool(bool),
    String(Rc<String>),
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKey::Int(n) => write!(f, "{}", n),
            HashKey::Bool(b) => write!(f, "{}", b),
            HashKey::String(s) => write!(f, "{}", s),
        }
    }
}

/// A function compiled to bytecode. Lives in the constant pool; the VM
/// only ever executes it wrapped in a [`Closure`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    /// The function body's instruction stream
    pub instructions: Vec<u8>,
    /// Number of local slots to reserve (parameters included)
    pub num_locals: usize,
    /// Declared parameter count, checked at call time
    pub num_parameters: usize,
}

/// Runtime representation of a closure: a compiled function plus the
/// values captured from enclosing scopes, in free-symbol order.
#[derive(Debug, Clone)]
pub struct Closure {
    pub function: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}

impl Closure {
    pub fn new(function: Rc<CompiledFunction>) -> Self {
        Self {
            function,
            free: Vec::new(),
        }
    }
}
