//! Type resolution for the teaching language.
//!
//! Turns the parser's declaration tree into a fully linked [`TypeTable`]:
//! named references are bound across modules, generic variants are
//! instantiated and substituted, members are set up, and attribute slots are
//! laid out.
//!
//! # Overview
//!
//! - [`resolve`] / [`Resolver`] - run all passes over a module set
//! - [`Resolution`] - the resulting table, diagnostics and usage positions
//! - [`find_suitable_methods`] / [`find_constructor`] - overload selection
//! - [`ast`] - declaration input types
//!
//! # Example
//!
//! ```
//! use resolver::ast::{ModuleDecl, TypeDecl, TypeRef};
//! use core_types::SourcePosition;
//!
//! let module = ModuleDecl {
//!     name: "Main.java".to_string(),
//!     declarations: vec![TypeDecl {
//!         identifier: "Dog".to_string(),
//!         extends: vec![TypeRef::named("Animal", SourcePosition::new(1, 19, 6))],
//!         ..TypeDecl::default()
//!     }],
//! };
//!
//! let resolution = resolver::resolve(vec![module]);
//! assert_eq!(resolution.diagnostics.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod diagnostics;
mod generics;
pub mod overload;
pub mod resolver;
mod synthesize;

pub use diagnostics::Diagnostics;
pub use overload::{find_constructor, find_suitable_methods, resolve_method_call};
pub use resolver::{resolve, Resolution, Resolver, Usage};

pub use type_model::TypeTable;
