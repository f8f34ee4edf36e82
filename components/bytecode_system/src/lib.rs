//! Statement programs for the execution engine
//!
//! A [`Program`] is the body of a method or initializer: a flat array of
//! [`Statement`]s whose jump targets are absolute indices into that array.
//! Programs are the only artifact handed from the front end to the engine.
//!
//! # Example
//!
//! ```
//! use bytecode_system::{BinaryOperator, Program, StatementKind};
//! use core_types::{SourcePosition, Value};
//!
//! let mut program = Program::new("main");
//! program.emit(StatementKind::PushConstant(Value::Int(1)));
//! program.emit(StatementKind::PushConstant(Value::Int(2)));
//! program.emit_at(
//!     StatementKind::Binary(BinaryOperator::Add),
//!     SourcePosition::new(1, 1, 5),
//! );
//! program.mark_step_finished();
//!
//! assert_eq!(program.len(), 3);
//! assert!(program.validate().is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod opcode;
pub mod program;
pub mod statement;

// Re-export main types at crate root
pub use opcode::{BinaryOperator, PrimitiveCast, StatementKind, UnaryOperator};
pub use program::{Program, ProgramError};
pub use statement::Statement;
