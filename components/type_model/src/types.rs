//! Type descriptors.
//!
//! A generic instantiation is a structural clone of its canonical
//! declaration: a new [`Klass`] or [`Interface`] record with its own
//! [`TypeVariable`] bindings and an `is_generic_variant_from` back-reference.
//! Member lists are `Rc`-shared between the canonical declaration and its
//! variants unless substitution changed a member's type.

use bytecode_system::Program;
use core_types::{AttributeId, MethodId, ModuleId, SourcePosition, TypeId};
use std::rc::Rc;

/// Member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Visible everywhere
    #[default]
    Public,
    /// Visible in the class and its subclasses
    Protected,
    /// Visible in the declaring class only
    Private,
}

/// Primitive types; `String` is a primitive with value semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// No value
    Void,
    /// Type of the `null` literal
    Null,
    /// boolean
    Boolean,
    /// char
    Char,
    /// int
    Int,
    /// long
    Long,
    /// double
    Double,
    /// String
    String,
}

impl PrimitiveKind {
    /// Source-level name
    pub fn identifier(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Null => "null",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Double => "double",
            PrimitiveKind::String => "String",
        }
    }

    /// Whether a value of `self` implicitly widens to `target`
    pub fn widens_to(self, target: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        match (self, target) {
            (a, b) if a == b => true,
            (Void, _) | (_, Void) => false,
            (_, String) => true,
            (Char, Int | Long | Double) => true,
            (Int, Long | Double) => true,
            (Long, Double) => true,
            _ => false,
        }
    }
}

/// A generic parameter binding.
///
/// On a canonical declaration `type_id` is the [`TypeParameter`] placeholder;
/// on a generic variant it is the concrete argument.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeVariable {
    /// Name of the parameter (`T`)
    pub identifier: String,
    /// Bound type
    pub type_id: TypeId,
    /// Start of the lexical scope
    pub scope_from: SourcePosition,
    /// End of the lexical scope
    pub scope_to: SourcePosition,
}

/// Placeholder type standing for a declared type parameter inside its
/// declaration's member types
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParameter {
    /// Declaration that owns the parameter
    pub owner: TypeId,
    /// Position in the owner's parameter list
    pub index: usize,
    /// `extends` bound; `Object` until resolved
    pub bound_class: TypeId,
    /// `implements` bounds
    pub bound_interfaces: Vec<TypeId>,
    /// Whether all bound expressions are resolved
    pub ready: bool,
}

/// One declared enum constant
#[derive(Debug, Clone)]
pub struct EnumConstant {
    /// Name of the constant
    pub identifier: String,
    /// Zero-based declaration index
    pub ordinal: usize,
    /// Declaration position
    pub position: Option<SourcePosition>,
    /// Program that loads the constant and calls its constructor
    pub constructor_call: Option<Rc<Program>>,
}

/// Enum-specific part of a class descriptor
#[derive(Debug, Clone, Default)]
pub struct EnumInfo {
    /// Constants in declaration order
    pub constants: Vec<EnumConstant>,
}

/// Class descriptor, also used for enums
#[derive(Debug, Clone, Default)]
pub struct Klass {
    /// Single inheritance; `None` only for `Object`
    pub base_class: Option<TypeId>,
    /// Implemented interfaces
    pub implements: Vec<TypeId>,
    /// Static twin holding static members
    pub static_class: Option<TypeId>,
    /// Declared or bound type variables
    pub type_variables: Vec<TypeVariable>,
    /// Whether every type variable bound is resolved
    pub type_variables_ready: bool,
    /// Instance methods and constructors
    pub methods: Rc<Vec<MethodId>>,
    /// Instance attributes declared in this class
    pub attributes: Rc<Vec<AttributeId>>,
    /// Field initializers, run before the constructor
    pub attribute_initializer: Option<Rc<Program>>,
    /// Canonical declaration this variant was cloned from
    pub is_generic_variant_from: Option<TypeId>,
    /// `abstract class`
    pub is_abstract: bool,
    /// Declared visibility
    pub visibility: Visibility,
    /// Slot count including base classes; set by `setup_attribute_indices`
    pub number_of_attributes_including_base_class: Option<usize>,
    /// Enum constants, for enums only
    pub enum_info: Option<EnumInfo>,
    /// Member lists still have to be derived from the canonical declaration
    pub members_pending: bool,
}

/// Interface descriptor
#[derive(Debug, Clone, Default)]
pub struct Interface {
    /// Extended interfaces
    pub extends: Vec<TypeId>,
    /// Declared (abstract) methods
    pub methods: Rc<Vec<MethodId>>,
    /// Declared or bound type variables
    pub type_variables: Vec<TypeVariable>,
    /// Whether every type variable bound is resolved
    pub type_variables_ready: bool,
    /// Canonical declaration this variant was cloned from
    pub is_generic_variant_from: Option<TypeId>,
    /// Member lists still have to be derived from the canonical declaration
    pub members_pending: bool,
}

/// Static twin of a class
#[derive(Debug, Clone)]
pub struct StaticClass {
    /// The class this twin belongs to
    pub klass: TypeId,
    /// Static twin of the base class
    pub base: Option<TypeId>,
    /// Static methods
    pub methods: Rc<Vec<MethodId>>,
    /// Static attributes
    pub attributes: Rc<Vec<AttributeId>>,
    /// Static field initializers
    pub static_initializer: Option<Rc<Program>>,
    /// Number of static slots; set by `setup_attribute_indices`
    pub number_of_attributes: usize,
}

/// Array descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    /// Element type, itself an array for multi-dimensional arrays
    pub element: TypeId,
}

/// The closed set of type variants
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// int, double, String, ...
    Primitive(PrimitiveKind),
    /// Class
    Klass(Klass),
    /// Interface
    Interface(Interface),
    /// Static twin of a class
    StaticClass(StaticClass),
    /// Enum, a class with `enum_info`
    Enum(Klass),
    /// Array
    Array(ArrayType),
    /// Placeholder for a declared type parameter
    TypeParameter(TypeParameter),
}

/// A type descriptor
#[derive(Debug, Clone)]
pub struct Type {
    /// Display name; generic variants show their arguments (`List<String>`)
    pub identifier: String,
    /// Variant payload
    pub kind: TypeKind,
    /// Declaring module, `None` for builtins
    pub module: Option<ModuleId>,
    /// Declaration position
    pub position: Option<SourcePosition>,
}

impl Type {
    /// Class payload for classes and enums
    pub fn as_klass(&self) -> Option<&Klass> {
        match &self.kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => Some(k),
            _ => None,
        }
    }

    /// Mutable class payload for classes and enums
    pub fn as_klass_mut(&mut self) -> Option<&mut Klass> {
        match &mut self.kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => Some(k),
            _ => None,
        }
    }

    /// Interface payload
    pub fn as_interface(&self) -> Option<&Interface> {
        match &self.kind {
            TypeKind::Interface(i) => Some(i),
            _ => None,
        }
    }

    /// Static twin payload
    pub fn as_static_class(&self) -> Option<&StaticClass> {
        match &self.kind {
            TypeKind::StaticClass(s) => Some(s),
            _ => None,
        }
    }

    /// Primitive kind, for primitives
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match &self.kind {
            TypeKind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Whether values of this type are heap references
    pub fn is_reference(&self) -> bool {
        !matches!(self.kind, TypeKind::Primitive(_) | TypeKind::StaticClass(_))
    }

    /// Declared or bound type variables of classes and interfaces
    pub fn type_variables(&self) -> &[TypeVariable] {
        match &self.kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => &k.type_variables,
            TypeKind::Interface(i) => &i.type_variables,
            _ => &[],
        }
    }

    /// Canonical declaration, for generic variants
    pub fn generic_origin(&self) -> Option<TypeId> {
        match &self.kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => k.is_generic_variant_from,
            TypeKind::Interface(i) => i.is_generic_variant_from,
            _ => None,
        }
    }
}
