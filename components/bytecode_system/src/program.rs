//! Program - a flat, jump-addressed statement array
//!
//! Programs are built once by the front end and then shared (`Rc<Program>`)
//! between method descriptors, generic variants and call frames.

use crate::opcode::StatementKind;
use crate::statement::Statement;
use core_types::{ModuleId, SourcePosition};
use serde::{Deserialize, Serialize};

/// Structural problems found by [`Program::validate`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    /// A jump points outside the statement array
    #[error("statement {at} jumps to {target}, but the program has {len} statements")]
    JumpOutOfRange {
        /// Index of the jump
        at: usize,
        /// Its target
        target: usize,
        /// Program length
        len: usize,
    },
}

/// A method or initializer body
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Label used in stack traces
    pub label: String,
    /// Module the program was generated from
    #[serde(default)]
    pub module: Option<ModuleId>,
    /// Sequence of statements
    #[serde(default)]
    pub statements: Vec<Statement>,
    /// Local variable slots reserved beyond receiver and parameters
    #[serde(default)]
    pub reserved_locals: usize,
}

impl Program {
    /// Create a new empty program
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Set the originating module
    pub fn with_module(mut self, module: ModuleId) -> Self {
        self.module = Some(module);
        self
    }

    /// Set the number of reserved local slots
    pub fn with_reserved_locals(mut self, reserved_locals: usize) -> Self {
        self.reserved_locals = reserved_locals;
        self
    }

    /// Emit a statement without source position; returns its index
    pub fn emit(&mut self, kind: StatementKind) -> usize {
        self.statements.push(Statement::new(kind));
        self.statements.len() - 1
    }

    /// Emit a statement with source position; returns its index
    pub fn emit_at(&mut self, kind: StatementKind, position: SourcePosition) -> usize {
        self.statements.push(Statement::with_position(kind, position));
        self.statements.len() - 1
    }

    /// Mark the last emitted statement as the end of a source-level step
    pub fn mark_step_finished(&mut self) {
        if let Some(last) = self.statements.last_mut() {
            last.step_finished = true;
        }
    }

    /// Rewrite the target of the jump at `at`
    pub fn patch_jump(&mut self, at: usize, target: usize) {
        if let Some(stmt) = self.statements.get_mut(at) {
            if let StatementKind::Jump(t)
            | StatementKind::JumpIfFalse(t)
            | StatementKind::JumpIfTrue(t) = &mut stmt.kind
            {
                *t = target;
            }
        }
    }

    /// Index the next emitted statement will get
    pub fn next_index(&self) -> usize {
        self.statements.len()
    }

    /// Get the number of statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the program has no statements
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statement at `index`
    pub fn get(&self, index: usize) -> Option<&Statement> {
        self.statements.get(index)
    }

    /// Check that every jump target addresses a statement.
    ///
    /// A target equal to the length is allowed: it ends the program.
    pub fn validate(&self) -> Result<(), ProgramError> {
        let len = self.statements.len();
        for (at, stmt) in self.statements.iter().enumerate() {
            if let Some(target) = stmt.kind.jump_target() {
                if target > len {
                    return Err(ProgramError::JumpOutOfRange { at, target, len });
                }
            }
        }
        Ok(())
    }

    /// Source position of the statement at `index`, or of the closest
    /// preceding statement that has one
    pub fn position_at(&self, index: usize) -> Option<SourcePosition> {
        let end = index.min(self.statements.len().saturating_sub(1));
        self.statements
            .get(..=end)?
            .iter()
            .rev()
            .find_map(|s| s.position)
    }

    /// Set or clear the breakpoint on the first statement at `line`.
    ///
    /// Returns whether such a statement exists.
    pub fn set_breakpoint_at_line(&self, line: u32, enabled: bool) -> bool {
        match self
            .statements
            .iter()
            .find(|s| s.position.map(|p| p.line) == Some(line))
        {
            Some(stmt) => {
                stmt.set_breakpoint(enabled);
                true
            }
            None => false,
        }
    }
}
