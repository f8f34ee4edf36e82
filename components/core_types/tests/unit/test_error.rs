//! Unit tests for Diagnostic and RuntimeError

use core_types::{
    Diagnostic, DiagnosticBucket, QuickFix, RuntimeError, Severity, SourcePosition, StackFrame,
};

#[cfg(test)]
mod diagnostic_tests {
    use super::*;

    #[test]
    fn test_error_diagnostic_keeps_position() {
        let pos = SourcePosition::new(5, 12, 3);
        let d = Diagnostic::error("Type Foo unknown", pos);
        assert_eq!(d.position, pos);
        assert_eq!(d.severity, Severity::Error);
        assert!(d.quick_fix.is_none());
    }

    #[test]
    fn test_quick_fix_attached() {
        let pos = SourcePosition::new(1, 1, 1);
        let d = Diagnostic::warning("w", pos).with_quick_fix(QuickFix {
            title: "Insert ;".to_string(),
            position: pos,
            replacement: ";".to_string(),
        });
        assert_eq!(d.quick_fix.unwrap().replacement, ";");
    }

    #[test]
    fn test_bucket_order() {
        assert_eq!(DiagnosticBucket::ALL[0], DiagnosticBucket::Lexical);
        assert!(DiagnosticBucket::Type < DiagnosticBucket::Codegen);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}

#[cfg(test)]
mod runtime_error_tests {
    use super::*;

    #[test]
    fn test_runtime_error_renders_frames_innermost_first() {
        let error = RuntimeError {
            message: "ArrayIndexOutOfBoundsException: Index 5 out of bounds for length 2"
                .to_string(),
            stack: vec![
                StackFrame {
                    method_name: Some("List.get".to_string()),
                    module_name: None,
                    position: Some(SourcePosition::new(10, 4, 1)),
                },
                StackFrame {
                    method_name: None,
                    module_name: None,
                    position: Some(SourcePosition::new(2, 1, 1)),
                },
            ],
            source_position: Some(SourcePosition::new(10, 4, 1)),
        };

        let text = error.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "  at List.get (10:4)");
        assert_eq!(lines[2], "  at <main program> (2:1)");
    }

    #[test]
    fn test_runtime_error_is_std_error() {
        let error: Box<dyn std::error::Error> = Box::new(RuntimeError {
            message: "x".to_string(),
            stack: vec![],
            source_position: None,
        });
        assert_eq!(error.to_string(), "x");
    }
}
