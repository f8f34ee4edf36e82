//! Diagnostics and runtime error types.
//!
//! Errors come in two tiers. Resolution produces non-fatal [`Diagnostic`]s
//! which are accumulated and shown in an error list. Execution produces at
//! most one fatal [`RuntimeError`] per run, carrying the call stack at the
//! point of failure.

use crate::{SourcePosition, StackFrame};
use serde::{Deserialize, Serialize};

/// Severity of a resolution-time diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The program cannot be run as written
    Error,
    /// Suspicious but runnable
    Warning,
}

/// Which front-end stage a diagnostic belongs to.
///
/// Diagnostics are grouped per module into one bucket per stage so that a
/// later stage can clear and refill its own bucket without touching others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticBucket {
    /// Produced by the scanner
    Lexical,
    /// Produced by the parser
    Syntax,
    /// Produced by type resolution
    Type,
    /// Produced by code generation
    Codegen,
}

impl DiagnosticBucket {
    /// All buckets in pipeline order
    pub const ALL: [DiagnosticBucket; 4] = [
        DiagnosticBucket::Lexical,
        DiagnosticBucket::Syntax,
        DiagnosticBucket::Type,
        DiagnosticBucket::Codegen,
    ];
}

/// An automatic edit the editor may offer to fix a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickFix {
    /// Label shown to the user
    pub title: String,
    /// Range to replace
    pub position: SourcePosition,
    /// Replacement text
    pub replacement: String,
}

/// A resolution-time diagnostic.
///
/// # Examples
///
/// ```
/// use core_types::{Diagnostic, QuickFix, Severity, SourcePosition};
///
/// let pos = SourcePosition::new(4, 9, 6);
/// let diagnostic = Diagnostic::warning("Unused import", pos).with_quick_fix(QuickFix {
///     title: "Remove".to_string(),
///     position: pos,
///     replacement: String::new(),
/// });
///
/// assert_eq!(diagnostic.severity, Severity::Warning);
/// assert!(diagnostic.quick_fix.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Human-readable message
    pub message: String,
    /// Where the problem is
    pub position: SourcePosition,
    /// Error or warning
    pub severity: Severity,
    /// Optional automatic fix
    pub quick_fix: Option<QuickFix>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(message: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            message: message.into(),
            position,
            severity: Severity::Error,
            quick_fix: None,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            message: message.into(),
            position,
            severity: Severity::Warning,
            quick_fix: None,
        }
    }

    /// Attach a quick fix
    pub fn with_quick_fix(mut self, quick_fix: QuickFix) -> Self {
        self.quick_fix = Some(quick_fix);
        self
    }

    /// Whether this diagnostic prevents execution
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// A fatal runtime error with the call stack at the time of the fault.
///
/// The `Display` output is the console entry: the message followed by one
/// line per stack frame, innermost first.
///
/// # Examples
///
/// ```
/// use core_types::{RuntimeError, SourcePosition, StackFrame};
///
/// let error = RuntimeError {
///     message: "NullPointerException".to_string(),
///     stack: vec![StackFrame {
///         method_name: None,
///         module_name: None,
///         position: Some(SourcePosition::new(3, 1, 1)),
///     }],
///     source_position: Some(SourcePosition::new(3, 1, 1)),
/// };
///
/// assert_eq!(error.to_string(), "NullPointerException\n  at <main program> (3:1)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{}", .message, render_stack(.stack))]
pub struct RuntimeError {
    /// Human-readable error message
    pub message: String,
    /// Call stack, innermost frame first
    pub stack: Vec<StackFrame>,
    /// Source position of the failing statement
    pub source_position: Option<SourcePosition>,
}

fn render_stack(stack: &[StackFrame]) -> String {
    stack
        .iter()
        .map(|frame| format!("\n  {}", frame))
        .collect()
}
