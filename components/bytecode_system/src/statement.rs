//! A single statement with source mapping and debugger flags

use crate::opcode::StatementKind;
use core_types::SourcePosition;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// A single statement with optional source mapping.
///
/// The breakpoint flag is interior-mutable: programs are shared and
/// immutable once built, but the editor toggles breakpoints at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// What to execute
    pub kind: StatementKind,
    /// Source position for diagnostics and the program pointer
    #[serde(default)]
    pub position: Option<SourcePosition>,
    /// Last statement of a source-level step
    #[serde(default)]
    pub step_finished: bool,
    #[serde(default)]
    breakpoint: Cell<bool>,
}

impl Statement {
    /// Create a new statement without source position
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            position: None,
            step_finished: false,
            breakpoint: Cell::new(false),
        }
    }

    /// Create a new statement with source position
    pub fn with_position(kind: StatementKind, position: SourcePosition) -> Self {
        Self {
            position: Some(position),
            ..Self::new(kind)
        }
    }

    /// Whether execution halts before this statement
    pub fn has_breakpoint(&self) -> bool {
        self.breakpoint.get()
    }

    /// Set or clear the breakpoint
    pub fn set_breakpoint(&self, enabled: bool) {
        self.breakpoint.set(enabled);
    }
}
