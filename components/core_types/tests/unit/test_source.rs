//! Unit tests for SourcePosition and StackFrame

use core_types::{SourcePosition, StackFrame};

#[cfg(test)]
mod source_position_tests {
    use super::*;

    #[test]
    fn test_source_position_ordering_is_line_then_column() {
        let a = SourcePosition::new(3, 20, 1);
        let b = SourcePosition::new(4, 1, 1);
        assert!(a < b);
        assert!(SourcePosition::new(4, 2, 0) > b);
    }

    #[test]
    fn test_source_position_display() {
        assert_eq!(SourcePosition::new(12, 7, 4).to_string(), "12:7");
    }

    #[test]
    fn test_source_position_scope_bounds_inclusive() {
        let from = SourcePosition::new(1, 10, 0);
        let to = SourcePosition::new(1, 20, 0);
        assert!(from.is_within(&from, &to));
        assert!(to.is_within(&from, &to));
        assert!(!SourcePosition::new(1, 9, 0).is_within(&from, &to));
    }

    #[test]
    fn test_source_position_json_defaults_length() {
        let pos: SourcePosition = serde_json::from_str(r#"{"line": 2, "column": 3}"#).unwrap();
        assert_eq!(pos, SourcePosition::new(2, 3, 0));
    }
}

#[cfg(test)]
mod stack_frame_tests {
    use super::*;

    #[test]
    fn test_stack_frame_display_full() {
        let frame = StackFrame {
            method_name: Some("Main.run".to_string()),
            module_name: Some("Main.java".to_string()),
            position: Some(SourcePosition::new(8, 3, 2)),
        };
        assert_eq!(frame.to_string(), "at Main.run (Main.java 8:3)");
    }

    #[test]
    fn test_stack_frame_display_bare() {
        let frame = StackFrame {
            method_name: Some("f".to_string()),
            module_name: None,
            position: None,
        };
        assert_eq!(frame.to_string(), "at f");
    }
}
