//! Debugger controls: pause, resume, stepping and breakpoints

use core_types::{MethodId, Value};

use crate::error::EngineError;
use crate::host::Host;
use crate::vm::{EngineState, RunMode, VM};

impl<H: Host> VM<H> {
    /// Halt at the next statement boundary
    pub fn pause(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Running => {
                self.halt();
                Ok(())
            }
            EngineState::Paused => Ok(()),
            state => Err(EngineError::InvalidState {
                operation: "pause",
                state,
            }),
        }
    }

    /// Continue after a halt; the statement halted at does not trigger its
    /// breakpoint again
    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.continue_with(RunMode::Continuous, "resume")
    }

    /// Run to the next step boundary, entering calls
    pub fn step_into(&mut self) -> Result<(), EngineError> {
        self.continue_with(RunMode::StepInto, "step into")
    }

    /// Run to the next step boundary at the current call depth or above
    pub fn step_over(&mut self) -> Result<(), EngineError> {
        self.continue_with(RunMode::StepOver { depth: 0 }, "step over")
    }

    /// Run until the current method has returned to its caller
    pub fn step_out(&mut self) -> Result<(), EngineError> {
        self.continue_with(RunMode::StepOver { depth: 1 }, "step out")
    }

    fn continue_with(&mut self, mode: RunMode, operation: &'static str) -> Result<(), EngineError> {
        match self.state {
            EngineState::NotInitialized | EngineState::Done | EngineState::Error
                if mode != RunMode::Continuous =>
            {
                self.start()?;
            }
            EngineState::Paused => {}
            state => return Err(EngineError::InvalidState { operation, state }),
        }
        tracing::debug!(?mode, "debugger continue");
        self.run_mode = mode;
        self.skip_breakpoint_once = true;
        self.set_state(EngineState::Running);
        Ok(())
    }

    /// Set or clear the breakpoint on statement `index` of a method body
    pub fn set_method_breakpoint(&self, method: MethodId, index: usize, enabled: bool) -> bool {
        match self.table.method(method).program().and_then(|p| p.get(index)) {
            Some(statement) => {
                statement.set_breakpoint(enabled);
                true
            }
            None => false,
        }
    }

    /// Set or clear the breakpoint on statement `index` of the main program
    pub fn set_main_breakpoint(&self, index: usize, enabled: bool) -> bool {
        match self.main_program().and_then(|p| p.get(index)) {
            Some(statement) => {
                statement.set_breakpoint(enabled);
                true
            }
            None => false,
        }
    }

    /// Locals of the running activation, starting at the receiver
    pub fn frame(&self) -> &[Value] {
        let base = self.ctx.frame_base().min(self.ctx.stack.len());
        &self.ctx.stack[base..]
    }

    /// Method of the running activation, if any
    pub fn current_method(&self) -> Option<MethodId> {
        self.ctx.current.as_ref().and_then(|a| a.method)
    }

    /// Number of nested activations
    pub fn call_depth(&self) -> usize {
        self.ctx.depth()
    }
}
