//! Execution context - operand stack and program stack of one run

use crate::call_frame::{Activation, ProgramStackElement};
use crate::error::{Fault, FaultResult};
use core_types::Value;

/// Mutable execution state.
///
/// The operand stack holds every frame: a frame starts at the receiver (or
/// first argument) of its activation and extends to the top of the stack.
/// The context can be swapped out wholesale, which is how nested
/// evaluations run without disturbing a suspended program.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    /// Operand stack
    pub stack: Vec<Value>,
    /// Running activation; `None` when idle
    pub current: Option<Activation>,
    /// Suspended and scheduled activations, innermost last
    pub program_stack: Vec<ProgramStackElement>,
}

impl ExecutionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self {
            stack: Vec::with_capacity(256),
            current: None,
            program_stack: Vec::with_capacity(64),
        }
    }

    /// Push onto the operand stack
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop from the operand stack
    pub fn pop(&mut self) -> FaultResult<Value> {
        self.stack.pop().ok_or(Fault::StackUnderflow)
    }

    /// Top of the operand stack
    pub fn peek(&self) -> FaultResult<&Value> {
        self.stack.last().ok_or(Fault::StackUnderflow)
    }

    /// Frame base of the running activation
    pub fn frame_base(&self) -> usize {
        self.current.as_ref().map_or(0, |a| a.frame_base)
    }

    /// Read the local at `offset` in the current frame
    pub fn local(&self, offset: usize) -> FaultResult<Value> {
        self.stack
            .get(self.frame_base() + offset)
            .cloned()
            .ok_or(Fault::StackUnderflow)
    }

    /// Write the local at `offset` in the current frame
    pub fn set_local(&mut self, offset: usize, value: Value) -> FaultResult<()> {
        let index = self.frame_base() + offset;
        let slot = self.stack.get_mut(index).ok_or(Fault::StackUnderflow)?;
        *slot = value;
        Ok(())
    }

    /// Move the running activation to the next statement
    pub fn advance(&mut self) {
        if let Some(activation) = self.current.as_mut() {
            activation.position += 1;
        }
    }

    /// Set the position of the running activation
    pub fn jump(&mut self, target: usize) {
        if let Some(activation) = self.current.as_mut() {
            activation.position = target;
        }
    }

    /// Whether no activation is running or waiting
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.program_stack.is_empty()
    }

    /// Number of nested activations including the running one
    pub fn depth(&self) -> usize {
        self.program_stack.len() + usize::from(self.current.is_some())
    }
}
