//! Declaration tree consumed by the resolver.
//!
//! The parser produces one [`ModuleDecl`] per compilation unit. Only the
//! parts relevant to type resolution are modelled: type headers, member
//! signatures, and the already generated bodies.

use bytecode_system::Program;
use core_types::SourcePosition;
use serde::{Deserialize, Serialize};
use type_model::Visibility;

/// A compilation unit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleDecl {
    /// File name shown in diagnostics and stack traces
    pub name: String,
    /// Top-level type declarations in source order
    #[serde(default)]
    pub declarations: Vec<TypeDecl>,
}

/// A (possibly generic, possibly array) type as written in source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeRef {
    /// Referenced name
    pub name: String,
    /// Generic arguments (`List<String>`)
    #[serde(default)]
    pub arguments: Vec<TypeRef>,
    /// Number of trailing `[]`
    #[serde(default)]
    pub array_dimensions: usize,
    /// Position of the name
    #[serde(default)]
    pub position: SourcePosition,
}

impl TypeRef {
    /// A plain named reference
    pub fn named(name: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            name: name.into(),
            position,
            ..Self::default()
        }
    }

    /// Add generic arguments
    pub fn with_arguments(mut self, arguments: Vec<TypeRef>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Add array dimensions
    pub fn with_array_dimensions(mut self, dimensions: usize) -> Self {
        self.array_dimensions = dimensions;
        self
    }
}

/// Kind of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    /// `class`
    #[default]
    Class,
    /// `interface`
    Interface,
    /// `enum`
    Enum,
}

/// Declared visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityDecl {
    /// `public` or no modifier
    #[default]
    Public,
    /// `protected`
    Protected,
    /// `private`
    Private,
}

impl From<VisibilityDecl> for Visibility {
    fn from(v: VisibilityDecl) -> Self {
        match v {
            VisibilityDecl::Public => Visibility::Public,
            VisibilityDecl::Protected => Visibility::Protected,
            VisibilityDecl::Private => Visibility::Private,
        }
    }
}

/// `<T extends Base & Iface>`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeParameterDecl {
    /// Parameter name
    pub identifier: String,
    /// Class bound
    #[serde(default)]
    pub extends: Option<TypeRef>,
    /// Interface bounds
    #[serde(default)]
    pub implements: Vec<TypeRef>,
    /// Position of the name
    #[serde(default)]
    pub position: SourcePosition,
}

/// A class, interface or enum declaration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeDecl {
    /// class / interface / enum
    #[serde(default)]
    pub kind: DeclKind,
    /// Declared name
    pub identifier: String,
    /// Position of the name
    #[serde(default)]
    pub position: SourcePosition,
    /// End of the declaration body; bounds the type parameters' scope
    #[serde(default)]
    pub end_position: SourcePosition,
    /// Declared type parameters
    #[serde(default)]
    pub type_parameters: Vec<TypeParameterDecl>,
    /// Base class for classes, extended interfaces for interfaces
    #[serde(default)]
    pub extends: Vec<TypeRef>,
    /// Implemented interfaces
    #[serde(default)]
    pub implements: Vec<TypeRef>,
    /// `abstract class`
    #[serde(default)]
    pub is_abstract: bool,
    /// Declared visibility
    #[serde(default)]
    pub visibility: VisibilityDecl,
    /// Fields
    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
    /// Methods and constructors
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    /// Enum constants, in declaration order
    #[serde(default)]
    pub enum_constants: Vec<EnumConstantDecl>,
    /// Instance field initializers
    #[serde(default)]
    pub attribute_initializer: Option<Program>,
    /// Static field initializers
    #[serde(default)]
    pub static_initializer: Option<Program>,
}

/// A field declaration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeDecl {
    /// Field name
    pub identifier: String,
    /// Declared type
    pub type_ref: TypeRef,
    /// Declared visibility
    #[serde(default)]
    pub visibility: VisibilityDecl,
    /// `static`
    #[serde(default)]
    pub is_static: bool,
    /// `transient`
    #[serde(default)]
    pub is_transient: bool,
    /// `final`
    #[serde(default)]
    pub is_final: bool,
    /// Position of the name
    #[serde(default)]
    pub position: SourcePosition,
}

/// A formal parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterDecl {
    /// Parameter name
    pub identifier: String,
    /// Declared type; for an ellipsis parameter the element type
    pub type_ref: TypeRef,
}

/// A method or constructor declaration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Method name; ignored for constructors
    pub identifier: String,
    /// Formal parameters
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    /// Last parameter is `T...`
    #[serde(default)]
    pub has_ellipsis: bool,
    /// `None` for void and constructors
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    /// Constructor
    #[serde(default)]
    pub is_constructor: bool,
    /// `abstract`; implied for interface methods
    #[serde(default)]
    pub is_abstract: bool,
    /// `static`
    #[serde(default)]
    pub is_static: bool,
    /// Declared visibility
    #[serde(default)]
    pub visibility: VisibilityDecl,
    /// Generated body
    #[serde(default)]
    pub body: Option<Program>,
    /// Position of the name
    #[serde(default)]
    pub position: SourcePosition,
}

/// An enum constant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnumConstantDecl {
    /// Constant name
    pub identifier: String,
    /// Position of the name
    #[serde(default)]
    pub position: SourcePosition,
    /// Pushes constructor arguments and calls the enum constructor; the
    /// constant itself is on the stack when it starts
    #[serde(default)]
    pub constructor_call: Option<Program>,
}
