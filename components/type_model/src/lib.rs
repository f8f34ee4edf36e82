//! Type model for the teaching language.
//!
//! All descriptors live in one arena, the [`TypeTable`], and reference each
//! other through [`TypeId`], [`MethodId`] and [`AttributeId`] handles.
//!
//! # Overview
//!
//! - [`Type`] / [`TypeKind`] - the closed set of type variants
//! - [`Klass`], [`Interface`], [`StaticClass`], [`ArrayType`] - descriptors
//! - [`TypeVariable`] / [`TypeParameter`] - generic parameter bindings
//! - [`Method`] / [`MethodBody`] - interpreted or native method bodies
//! - [`Attribute`] - fields with their slot index
//! - [`NativeMethod`] / [`NativeContext`] - the native-method contract
//!
//! # Examples
//!
//! ```
//! use type_model::TypeTable;
//!
//! let table = TypeTable::new();
//! assert!(table.can_cast_to(TypeTable::INT, TypeTable::DOUBLE));
//! assert!(!table.can_cast_to(TypeTable::DOUBLE, TypeTable::INT));
//! assert_eq!(table.identifier(TypeTable::OBJECT), "Object");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod casting;
pub mod method;
pub mod type_table;
pub mod types;

pub use attribute::Attribute;
pub use method::{
    native_argument, Method, MethodBody, NativeContext, NativeMethod, NativeResult, Parameter,
};
pub use type_table::TypeTable;
pub use types::{
    ArrayType, EnumConstant, EnumInfo, Interface, Klass, PrimitiveKind, StaticClass, Type,
    TypeKind, TypeParameter, TypeVariable, Visibility,
};

pub use core_types::{AttributeId, MethodId, TypeId};
