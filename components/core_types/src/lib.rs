//! Core value types, identifiers and error reporting.
//!
//! This crate provides the foundational types shared by the type model, the
//! resolver and the execution engine.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of runtime values
//! - [`HeapId`] - Handle of a heap-allocated object or array
//! - [`TypeId`], [`MethodId`], [`AttributeId`], [`ModuleId`] - Arena handles
//! - [`Diagnostic`] - Resolution-time diagnostic with severity and position
//! - [`RuntimeError`] - Fatal runtime error with an assembled call stack
//! - [`SourcePosition`] - Source code location
//! - [`StackFrame`] - Call stack frame information
//!
//! # Examples
//!
//! ```
//! use core_types::{Diagnostic, Severity, SourcePosition, Value};
//!
//! let value = Value::Int(42);
//! assert_eq!(value.type_name(), "int");
//!
//! let diagnostic = Diagnostic::error("Type Foo unknown", SourcePosition::new(3, 5, 3));
//! assert_eq!(diagnostic.severity, Severity::Error);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod ids;
mod source;
mod value;

pub use error::{Diagnostic, DiagnosticBucket, QuickFix, RuntimeError, Severity};
pub use ids::{AttributeId, MethodId, ModuleId, TypeId};
pub use source::{SourcePosition, StackFrame};
pub use value::{HeapId, Value};
