//! Runtime faults and engine API errors

use crate::vm::EngineState;
use bytecode_system::ProgramError;
use core_types::HeapId;

/// A fault raised while executing a statement.
///
/// Faults are turned into a [`core_types::RuntimeError`] carrying the user
/// stack trace; the engine then enters the error state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Fault {
    /// Dereferenced a null reference
    #[error("NullPointerException: {0}")]
    NullPointer(String),

    /// Array access outside `0..length`
    #[error("ArrayIndexOutOfBoundsException: Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Array length
        length: usize,
    },

    /// `new T[n]` with a negative length
    #[error("NegativeArraySizeException: {0}")]
    NegativeArraySize(i64),

    /// Reference cast to an incompatible type
    #[error("ClassCastException: class {from} cannot be cast to class {to}")]
    ClassCast {
        /// Runtime type of the value
        from: String,
        /// Target type
        to: String,
    },

    /// Integer division or remainder by zero
    #[error("ArithmeticException: / by zero")]
    DivisionByZero,

    /// Called a method without a body
    #[error("AbstractMethodError: {0}")]
    AbstractMethod(String),

    /// Too many nested activations
    #[error("StackOverflowError: more than {0} nested calls")]
    StackOverflow(usize),

    /// Operand of the wrong runtime type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Popped from an empty operand stack
    #[error("Operand stack underflow")]
    StackUnderflow,

    /// A heap handle that does not name a live object
    #[error("Invalid reference {0}")]
    InvalidReference(HeapId),

    /// Fault reported by a native method
    #[error("{0}")]
    Native(String),
}

/// Misuse of the engine API
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// `start` without a main program
    #[error("no main program loaded")]
    NoMainProgram,

    /// The main program failed structural validation
    #[error("invalid main program: {0}")]
    InvalidProgram(#[from] ProgramError),

    /// The operation is not allowed in the current state
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// Requested operation
        operation: &'static str,
        /// Current state
        state: EngineState,
    },
}

/// Result type of statement execution
pub type FaultResult<T> = Result<T, Fault>;
