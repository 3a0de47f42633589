use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use super::class::{LoxClass, LoxFunction, LoxInstance};
use super::http::HttpClient;

pub type LoxArray = Rc<RefCell<Vec<Value>>>;
pub type LoxHash = Rc<RefCell<Vec<(Value, Value)>>>;

pub type BuiltinFn = dyn Fn(&mut crate::interpreter::Interpreter, &[Value]) -> Result<Value, crate::error::LoxError>;

pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub func: Box<BuiltinFn>,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

/// The interpreter's polymorphic runtime value.
///
/// Heap-shaped variants (`Array`, `Hash`, `Instance`, ...) hold an `Rc` so
/// aliases observe each other's mutations, matching the reference
/// implementation's reference semantics for containers and instances.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(Rc<str>),
    Array(LoxArray),
    Hash(LoxHash),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(LoxInstance),
    Builtin(Rc<Builtin>),
    HttpClient(HttpClient),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn hash() -> Self {
        Value::Hash(Rc::new(RefCell::new(Vec::new())))
    }

    /// Lox truthiness: only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::HttpClient(_) => "Request",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Value equality. Distinct runtime types are never equal, even when
    /// the underlying numbers coincide (`1 == 1.0` is `false`) — the data
    /// model treats integers and floats as distinct types.
    pub fn lox_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || a.borrow().eq(&*b.borrow()),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => a.is_same(b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.lox_eq(other)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Hash(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "<fn {}>", func.name),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => write!(f, "{instance}"),
            Value::Builtin(builtin) => write!(f, "<native fn {}>", builtin.name),
            Value::HttpClient(_) => write!(f, "<Request>"),
        }
    }
}
