//! Execution engine for the teaching language
//!
//! This crate runs resolved programs on a stack machine with:
//! - One operand stack shared by all frames, addressed relative to a frame base
//! - A program stack of suspended and scheduled activations
//! - Object, static and enum initialization sequencing
//! - Breakpoints, stepping and reentrant expression evaluation
//! - Cooperative scheduling of timer and listener callbacks
//! - Suspension while the host supplies input or completes external calls
//!
//! # Overview
//!
//! - [`VM`] - state machine and run loop
//! - [`ExecutionContext`] - operand stack and program stack
//! - [`Activation`] / [`ProgramStackElement`] - call frames
//! - [`Heap`] - object and array storage
//! - [`Host`] - console, program pointer and input hooks
//! - [`EngineConfig`] - tick, budget and speed settings
//! - [`Fault`] - runtime faults
//!
//! # Example
//!
//! ```
//! use bytecode_system::{BinaryOperator, Program, StatementKind};
//! use core_types::Value;
//! use interpreter::{EngineConfig, EngineState, RecordingHost, VM};
//! use type_model::TypeTable;
//!
//! let mut main = Program::new("main");
//! main.emit(StatementKind::PushConstant(Value::Int(40)));
//! main.emit(StatementKind::PushConstant(Value::Int(2)));
//! main.emit(StatementKind::Binary(BinaryOperator::Add));
//! main.emit(StatementKind::Print { newline: true, with_value: true });
//!
//! let mut vm = VM::new(TypeTable::new(), RecordingHost::new(), EngineConfig::default());
//! vm.load_main(main).unwrap();
//! vm.start().unwrap();
//!
//! assert_eq!(vm.run_until_halt(100), EngineState::Done);
//! assert_eq!(vm.host().lines(), vec!["42"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_frame;
pub mod config;
pub mod context;
pub mod debugger;
pub mod dispatch;
pub mod error;
pub mod heap;
pub mod host;
pub mod natives;
pub mod vm;

// Re-export main types at crate root
pub use call_frame::{Activation, AfterReturn, CallOrigin, ProgramStackElement};
pub use config::EngineConfig;
pub use context::ExecutionContext;
pub use error::{EngineError, Fault, FaultResult};
pub use heap::{Heap, HeapEntry, RuntimeArray, RuntimeObject};
pub use host::{Host, RecordingHost, StdoutHost};
pub use natives::{HeapView, NativeBridge};
pub use scheduler::{ListenerId, TimerId};
pub use vm::{Callback, EngineState, VM};
