//! Unit tests for the program contract

use bytecode_system::{BinaryOperator, Program, ProgramError, Statement, StatementKind};
use core_types::{MethodId, ModuleId, SourcePosition, TypeId, Value};
use std::rc::Rc;

/// Builds `while (i < 3) i = i + 1;` over local slot 0
fn counting_loop() -> Program {
    let mut program = Program::new("loop").with_reserved_locals(1);
    program.emit(StatementKind::PushConstant(Value::Int(0)));
    program.emit(StatementKind::StoreLocal {
        offset: 0,
        leave_value: false,
    });
    let head = program.next_index();
    program.emit(StatementKind::LoadLocal(0));
    program.emit(StatementKind::PushConstant(Value::Int(3)));
    program.emit(StatementKind::Binary(BinaryOperator::Less));
    let exit = program.emit(StatementKind::JumpIfFalse(0));
    program.emit(StatementKind::LoadLocal(0));
    program.emit(StatementKind::PushConstant(Value::Int(1)));
    program.emit(StatementKind::Binary(BinaryOperator::Add));
    program.emit(StatementKind::StoreLocal {
        offset: 0,
        leave_value: false,
    });
    program.emit(StatementKind::Jump(head));
    let end = program.next_index();
    program.patch_jump(exit, end);
    program
}

#[test]
fn test_program_creation() {
    let program = Program::new("main").with_module(ModuleId::new(2));
    assert_eq!(program.label, "main");
    assert_eq!(program.module, Some(ModuleId::new(2)));
    assert!(program.is_empty());
    assert_eq!(program.reserved_locals, 0);
}

#[test]
fn test_loop_jumps_are_absolute_and_valid() {
    let program = counting_loop();
    assert_eq!(program.statements[5].kind, StatementKind::JumpIfFalse(11));
    assert_eq!(program.statements[10].kind, StatementKind::Jump(2));
    assert!(program.validate().is_ok());
}

#[test]
fn test_jump_to_end_is_valid() {
    let mut program = Program::new("p");
    program.emit(StatementKind::Jump(1));
    assert!(program.validate().is_ok());
}

#[test]
fn test_validate_error_message() {
    let mut program = Program::new("p");
    program.emit(StatementKind::Pop);
    program.emit(StatementKind::JumpIfTrue(7));
    let err = program.validate().unwrap_err();
    assert!(matches!(err, ProgramError::JumpOutOfRange { at: 1, .. }));
    assert_eq!(
        err.to_string(),
        "statement 1 jumps to 7, but the program has 2 statements"
    );
}

#[test]
fn test_step_finished_marks_last_statement() {
    let mut program = Program::new("p");
    program.emit(StatementKind::Pop);
    program.emit(StatementKind::Pop);
    program.mark_step_finished();
    assert!(!program.statements[0].step_finished);
    assert!(program.statements[1].step_finished);
}

#[test]
fn test_breakpoints_toggle_on_shared_program() {
    let mut program = Program::new("p");
    program.emit_at(StatementKind::Pop, SourcePosition::new(3, 1, 1));
    program.emit_at(StatementKind::Pop, SourcePosition::new(4, 1, 1));
    let shared = Rc::new(program);
    let other_owner = Rc::clone(&shared);

    assert!(other_owner.set_breakpoint_at_line(4, true));
    assert!(shared.statements[1].has_breakpoint());
    assert!(!other_owner.set_breakpoint_at_line(9, true));
}

#[test]
fn test_program_json_roundtrip_keeps_ids() {
    let mut program = Program::new("call");
    program.emit(StatementKind::NewObject {
        class: TypeId::new(12),
    });
    program.emit(StatementKind::CallMethod {
        method: MethodId::new(4),
        is_super_call: false,
    });
    let json = serde_json::to_string(&program).unwrap();
    let restored: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, program);
}

#[test]
fn test_statement_defaults_from_json() {
    let stmt: Statement = serde_json::from_str(r#"{"kind": "Pop"}"#).unwrap();
    assert_eq!(stmt.kind, StatementKind::Pop);
    assert!(!stmt.has_breakpoint());
}
