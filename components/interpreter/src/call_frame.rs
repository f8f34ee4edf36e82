//! Program activations and the program stack

use bytecode_system::Program;
use core_types::{MethodId, SourcePosition, Value};
use std::rc::Rc;

/// Who started an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOrigin {
    /// A call or initializer scheduled by interpreted code
    UserCode,
    /// The main program, a callback or a nested evaluation; stack traces
    /// stop here
    Outside,
}

/// Work to do after an activation finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterReturn {
    /// Drop the return value, if any, and free the callback slot
    FinishCallback,
}

/// A program being executed together with its frame
#[derive(Debug, Clone)]
pub struct Activation {
    /// Program
    pub program: Rc<Program>,
    /// Index of the next statement
    pub position: usize,
    /// Method the program belongs to; `None` for main and initializers
    pub method: Option<MethodId>,
    /// Operand stack index of local 0
    pub frame_base: usize,
    /// Position of the statement that started this activation
    pub call_site: Option<SourcePosition>,
    /// Who started it
    pub origin: CallOrigin,
    /// Work after completion
    pub after_return: Option<AfterReturn>,
}

impl Activation {
    /// Activation of `program` from its first statement
    pub fn new(program: Rc<Program>, origin: CallOrigin) -> Self {
        Self {
            program,
            position: 0,
            method: None,
            frame_base: 0,
            call_site: None,
            origin,
            after_return: None,
        }
    }

    /// Source position of the statement at `position`
    pub fn current_position(&self) -> Option<SourcePosition> {
        self.program.position_at(self.position)
    }
}

/// Entry of the program stack.
///
/// Either a suspended activation waiting for a callee to return, or a
/// scheduled program that has not started yet. Scheduled programs carry
/// the values of their frame (`pending_frame`), pushed when they start.
#[derive(Debug, Clone)]
pub struct ProgramStackElement {
    /// Activation to resume or start
    pub activation: Activation,
    /// Initial frame values of a program that has not started yet
    pub pending_frame: Option<Vec<Value>>,
}

impl ProgramStackElement {
    /// A suspended activation
    pub fn suspended(activation: Activation) -> Self {
        Self {
            activation,
            pending_frame: None,
        }
    }

    /// A program scheduled to start with `frame` as its first locals
    pub fn scheduled(activation: Activation, frame: Vec<Value>) -> Self {
        Self {
            activation,
            pending_frame: Some(frame),
        }
    }

    /// Whether the program has not started yet
    pub fn is_scheduled(&self) -> bool {
        self.pending_frame.is_some()
    }
}
