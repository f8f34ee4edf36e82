//! Method descriptors and the native-method contract.

use crate::types::Visibility;
use bytecode_system::Program;
use core_types::{MethodId, SourcePosition, TypeId, Value};
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

/// Result of a native method: no value for `void`, else exactly one value.
/// An `Err` is a runtime fault message.
pub type NativeResult = Result<Option<Value>, String>;

/// Engine services available to native method bodies.
///
/// The engine implements this trait; natives never see the heap or the
/// stacks directly.
pub trait NativeContext {
    /// Write to the console
    fn print(&mut self, text: &str, newline: bool);

    /// Read an attribute slot of an object
    fn attribute(&self, object: &Value, index: usize) -> Result<Value, String>;

    /// Write an attribute slot of an object
    fn set_attribute(&mut self, object: &Value, index: usize, value: Value) -> Result<(), String>;

    /// Display name of the object's runtime class
    fn class_name(&self, object: &Value) -> Result<String, String>;

    /// Name and ordinal of an enum constant
    fn enum_constant(&self, object: &Value) -> Result<(String, usize), String>;

    /// The ordinal-indexed array of an enum's constants
    fn enum_values(&mut self, enum_type: TypeId) -> Result<Value, String>;

    /// Serialize the non-transient instance attributes of an object
    fn object_to_json(&self, object: &Value) -> Result<String, String>;

    /// Create an instance of `class` from JSON produced by `object_to_json`
    fn object_from_json(&mut self, class: TypeId, json: &str) -> Result<Value, String>;
}

/// An intrinsic method body: receives receiver-first arguments.
#[derive(Clone)]
pub struct NativeMethod(Rc<dyn Fn(&mut dyn NativeContext, &[Value]) -> NativeResult>);

impl NativeMethod {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut dyn NativeContext, &[Value]) -> NativeResult + 'static,
    {
        Self(Rc::new(f))
    }

    /// Invoke the closure synchronously
    pub fn invoke(&self, context: &mut dyn NativeContext, arguments: &[Value]) -> NativeResult {
        (self.0)(context, arguments)
    }
}

/// Argument `index` of a native call, or an error when the caller passed
/// fewer values
pub fn native_argument(arguments: &[Value], index: usize) -> Result<&Value, String> {
    arguments
        .get(index)
        .ok_or_else(|| format!("native method expects at least {} argument(s)", index + 1))
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeMethod {{ ... }}")
    }
}

/// How a method is executed
#[derive(Debug, Clone)]
pub enum MethodBody {
    /// Interpreted statement program
    Interpreted(Rc<Program>),
    /// Host closure
    Native(NativeMethod),
    /// Abstract or interface method
    Abstract,
}

/// A formal parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub identifier: String,
    /// Declared type; the array type for an ellipsis parameter
    pub type_id: TypeId,
}

/// Method descriptor
#[derive(Debug, Clone)]
pub struct Method {
    /// Method name; constructors carry the class name
    pub identifier: String,
    /// Type the method is declared in
    pub declaring_type: TypeId,
    /// Ordered formal parameters
    pub parameters: SmallVec<[Parameter; 4]>,
    /// Last parameter is `T...`
    pub has_ellipsis: bool,
    /// Return type, `None` for void
    pub return_type: Option<TypeId>,
    /// Constructor
    pub is_constructor: bool,
    /// Abstract (no body)
    pub is_abstract: bool,
    /// Static method, lives in the static twin
    pub is_static: bool,
    /// Dispatched on the receiver's runtime class
    pub is_virtual: bool,
    /// Declared visibility
    pub visibility: Visibility,
    /// Body
    pub body: MethodBody,
    /// Declaration position
    pub position: Option<SourcePosition>,
    /// Method this one was substituted from in a generic variant
    pub is_generic_variant_from: Option<MethodId>,
}

impl Method {
    /// A method skeleton with no parameters and an abstract body
    pub fn new(identifier: impl Into<String>, declaring_type: TypeId) -> Self {
        Self {
            identifier: identifier.into(),
            declaring_type,
            parameters: SmallVec::new(),
            has_ellipsis: false,
            return_type: None,
            is_constructor: false,
            is_abstract: false,
            is_static: false,
            is_virtual: true,
            visibility: Visibility::Public,
            body: MethodBody::Abstract,
            position: None,
            is_generic_variant_from: None,
        }
    }

    /// Number of declared parameters, not counting the receiver
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Declared type of parameter `index`
    pub fn parameter_type(&self, index: usize) -> Option<TypeId> {
        self.parameters.get(index).map(|p| p.type_id)
    }

    /// Operand stack slots consumed by a call: receiver plus parameters
    pub fn stack_slots(&self) -> usize {
        self.parameters.len() + usize::from(!self.is_static)
    }

    /// Interpreted program, if any
    pub fn program(&self) -> Option<&Rc<Program>> {
        match &self.body {
            MethodBody::Interpreted(p) => Some(p),
            _ => None,
        }
    }

    /// Native body, if any
    pub fn native(&self) -> Option<&NativeMethod> {
        match &self.body {
            MethodBody::Native(n) => Some(n),
            _ => None,
        }
    }

    /// Whether any parameter or the return type is one of `types`
    pub fn mentions_any(&self, types: &[TypeId]) -> bool {
        self.return_type.is_some_and(|t| types.contains(&t))
            || self.parameters.iter().any(|p| types.contains(&p.type_id))
    }
}
