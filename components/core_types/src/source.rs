//! Source position and stack frame types for diagnostics and stack traces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a position in source code.
///
/// Used for diagnostics, breakpoints and stack traces. Lines and columns are
/// 1-based; `length` is the number of characters the construct spans.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition::new(10, 5, 3);
/// assert_eq!(pos.line, 10);
/// assert!(pos < SourcePosition::new(10, 6, 1));
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SourcePosition {
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
    /// Length of the marked construct
    #[serde(default)]
    pub length: u32,
}

impl SourcePosition {
    /// Create a new source position
    pub fn new(line: u32, column: u32, length: u32) -> Self {
        Self {
            line,
            column,
            length,
        }
    }

    /// Whether `self` lies within the inclusive range `from..=to`
    pub fn is_within(&self, from: &SourcePosition, to: &SourcePosition) -> bool {
        (from.line, from.column) <= (self.line, self.column)
            && (self.line, self.column) <= (to.line, to.column)
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Represents a single frame in a runtime call stack.
///
/// # Examples
///
/// ```
/// use core_types::{SourcePosition, StackFrame};
///
/// let frame = StackFrame {
///     method_name: Some("Counter.inc".to_string()),
///     module_name: Some("Main.java".to_string()),
///     position: Some(SourcePosition::new(25, 10, 1)),
/// };
///
/// assert_eq!(frame.to_string(), "at Counter.inc (Main.java 25:10)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Name of the method, or None for the main program and initializers
    pub method_name: Option<String>,
    /// Name of the module the code belongs to
    pub module_name: Option<String>,
    /// Position of the statement being executed in this frame
    pub position: Option<SourcePosition>,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at {}",
            self.method_name.as_deref().unwrap_or("<main program>")
        )?;
        match (&self.module_name, &self.position) {
            (Some(module), Some(pos)) => write!(f, " ({} {})", module, pos),
            (None, Some(pos)) => write!(f, " ({})", pos),
            (Some(module), None) => write!(f, " ({})", module),
            (None, None) => Ok(()),
        }
    }
}
