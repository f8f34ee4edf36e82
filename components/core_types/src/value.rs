//! Runtime value representation.
//!
//! This module provides the core `Value` enum passed over the operand stack,
//! stored in attribute slots and handed to native methods.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of an object or array on the engine heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeapId(pub usize);

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Represents any runtime value.
///
/// Primitive values are stored inline, while objects and arrays are
/// referenced by heap handle.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let number = Value::Int(42);
/// let text = Value::String("hi".to_string());
///
/// assert!(Value::Null.is_null());
/// assert_eq!(number.as_f64(), Some(42.0));
/// assert_eq!(text.type_name(), "String");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The null reference
    Null,
    /// boolean
    Boolean(bool),
    /// int (32 bit)
    Int(i32),
    /// long (64 bit)
    Long(i64),
    /// double
    Double(f64),
    /// char
    Char(char),
    /// String (immutable, value semantics)
    String(String),
    /// Reference to a class instance
    Object(HeapId),
    /// Reference to an array
    Array(HeapId),
}

impl Value {
    /// Whether this is the null reference
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean content, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral content widened to i64 (int, long and char)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n as i64),
            Value::Long(n) => Some(*n),
            Value::Char(c) => Some(*c as i64),
            _ => None,
        }
    }

    /// Numeric content widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            other => other.as_i64().map(|n| n as f64),
        }
    }

    /// Heap handle for object and array references
    pub fn heap_id(&self) -> Option<HeapId> {
        match self {
            Value::Object(id) | Value::Array(id) => Some(*id),
            _ => None,
        }
    }

    /// Name of the runtime tag, as shown in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::String(_) => "String",
            Value::Object(_) => "Object",
            Value::Array(_) => "array",
        }
    }
}

/// Conversion used by string concatenation and `print`.
///
/// Doubles always show a fractional part, as in Java.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}", n),
            Value::Double(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Char(c) => write!(f, "{}", c),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(id) => write!(f, "Object{}", id),
            Value::Array(id) => write!(f, "Array{}", id),
        }
    }
}
