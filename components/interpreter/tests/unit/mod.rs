//! Unit tests for the execution engine
//!
//! Type declarations go through the resolver; bodies are attached afterwards
//! because they reference the ids the resolver assigned.

use bytecode_system::{BinaryOperator, Program, StatementKind as S};
use core_types::{MethodId, SourcePosition, TypeId, Value};
use interpreter::{EngineConfig, EngineState, RecordingHost, VM};
use resolver::ast::{AttributeDecl, DeclKind, EnumConstantDecl, MethodDecl, ModuleDecl, ParameterDecl, TypeDecl, TypeParameterDecl, TypeRef};
use resolver::{resolve, Resolution};
use type_model::TypeTable;

fn pos(line: u32) -> SourcePosition {
    SourcePosition::new(line, 1, 1)
}

fn ty(name: &str) -> TypeRef {
    TypeRef::named(name, pos(1))
}

fn class(name: &str) -> TypeDecl {
    TypeDecl {
        identifier: name.to_string(),
        position: pos(1),
        end_position: pos(100),
        ..TypeDecl::default()
    }
}

fn attribute(name: &str, type_ref: TypeRef) -> AttributeDecl {
    AttributeDecl {
        identifier: name.to_string(),
        type_ref,
        ..AttributeDecl::default()
    }
}

fn method(name: &str, parameters: &[(&str, TypeRef)], return_type: Option<TypeRef>) -> MethodDecl {
    MethodDecl {
        identifier: name.to_string(),
        parameters: parameters
            .iter()
            .map(|(n, t)| ParameterDecl {
                identifier: n.to_string(),
                type_ref: t.clone(),
            })
            .collect(),
        return_type,
        ..MethodDecl::default()
    }
}

fn static_method(name: &str, return_type: Option<TypeRef>) -> MethodDecl {
    MethodDecl {
        is_static: true,
        ..method(name, &[], return_type)
    }
}

fn resolve_one(declarations: Vec<TypeDecl>) -> Resolution {
    let resolution = resolve(vec![ModuleDecl {
        name: "Main.java".to_string(),
        declarations,
    }]);
    assert!(!resolution.has_errors(), "{:?}", resolution.diagnostics);
    resolution
}

/// Emit one source line: every statement at `line`, the last one ending the step
fn line(program: &mut Program, line: u32, statements: impl IntoIterator<Item = S>) {
    for kind in statements {
        program.emit_at(kind, pos(line));
    }
    program.mark_step_finished();
}

fn ret() -> S {
    S::Return {
        copy_return_value: false,
        leave_this_object: false,
    }
}

fn ret_value() -> S {
    S::Return {
        copy_return_value: true,
        leave_this_object: false,
    }
}

fn print() -> S {
    S::Print {
        newline: true,
        with_value: true,
    }
}

fn call(method: MethodId) -> S {
    S::CallMethod {
        method,
        is_super_call: false,
    }
}

fn text(s: &str) -> S {
    S::PushConstant(Value::String(s.to_string()))
}

fn int(n: i32) -> S {
    S::PushConstant(Value::Int(n))
}

fn store(offset: usize) -> S {
    S::StoreLocal {
        offset,
        leave_value: false,
    }
}

fn builtins_only() -> Resolution {
    resolve_one(Vec::new())
}

fn engine_with(resolution: Resolution, main: Program, config: EngineConfig) -> VM<RecordingHost> {
    let mut vm = VM::new(resolution.table, RecordingHost::new(), config);
    vm.set_module_names(resolution.module_names);
    vm.load_main(main).unwrap();
    vm.start().unwrap();
    vm
}

fn engine(resolution: Resolution, main: Program) -> VM<RecordingHost> {
    engine_with(resolution, main, EngineConfig::default())
}

// ============================================================================
// Counter fixture: class Counter { int n; void inc() { n = n + 1; } int plus(int k) { return n + k; } }
// ============================================================================

struct Counter {
    resolution: Resolution,
    class: TypeId,
    n: usize,
    inc: MethodId,
    plus: MethodId,
}

fn counter() -> Counter {
    let decl = TypeDecl {
        attributes: vec![attribute("n", ty("int"))],
        methods: vec![
            method("inc", &[], None),
            method("plus", &[("k", ty("int"))], Some(ty("int"))),
        ],
        ..class("Counter")
    };
    let mut resolution = resolve_one(vec![decl]);
    let class = resolution.lookup("Counter").unwrap();
    let n = resolution.attribute_index(class, "n").unwrap();
    let inc = resolution.find_method(class, "inc", &[]).unwrap();
    let plus = resolution.find_method(class, "plus", &[TypeTable::INT]).unwrap();

    let mut body = Program::new("inc");
    line(
        &mut body,
        3,
        [
            S::LoadLocal(0),
            S::LoadLocal(0),
            S::LoadAttribute { index: n },
            int(1),
            S::Binary(BinaryOperator::Add),
            S::StoreAttribute {
                index: n,
                leave_value: false,
            },
        ],
    );
    line(&mut body, 4, [ret()]);
    resolution.set_method_body(inc, body);

    let mut body = Program::new("plus");
    line(
        &mut body,
        6,
        [
            S::LoadLocal(0),
            S::LoadAttribute { index: n },
            S::LoadLocal(1),
            S::Binary(BinaryOperator::Add),
            ret_value(),
        ],
    );
    resolution.set_method_body(plus, body);

    Counter {
        resolution,
        class,
        n,
        inc,
        plus,
    }
}

/// `c = new Counter(); print(c.n); c.inc(); c.inc(); print(c.n);` on lines 10-14
fn counter_main(c: &Counter) -> Program {
    let mut main = Program::new("main").with_reserved_locals(1);
    line(&mut main, 10, [S::NewObject { class: c.class }, store(0)]);
    line(&mut main, 11, [S::LoadLocal(0), S::LoadAttribute { index: c.n }, print()]);
    line(&mut main, 12, [S::LoadLocal(0), call(c.inc)]);
    line(&mut main, 13, [S::LoadLocal(0), call(c.inc)]);
    line(&mut main, 14, [S::LoadLocal(0), S::LoadAttribute { index: c.n }, print()]);
    main
}

/// Index of the first statement on `line`
fn first_on_line(program: &Program, line: u32) -> usize {
    program
        .statements
        .iter()
        .position(|s| s.position.map(|p| p.line) == Some(line))
        .unwrap()
}

#[test]
fn counter_increments_attribute() {
    let c = counter();
    let main = counter_main(&c);
    let mut vm = engine(c.resolution, main);

    assert_eq!(vm.run_until_halt(1000), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["0", "2"]);
    assert!(vm.stack().is_empty());
    assert!(vm.last_error().is_none());
}

#[test]
fn call_leaves_only_the_return_value() {
    let c = counter();
    let mut main = Program::new("main").with_reserved_locals(1);
    line(&mut main, 1, [S::NewObject { class: c.class }, store(0)]);
    line(&mut main, 2, [int(99), S::LoadLocal(0), int(5), call(c.plus)]);
    line(&mut main, 3, [print()]);
    line(&mut main, 4, [print()]);
    let after_call = first_on_line(&main, 3);
    let mut vm = engine(c.resolution, main);
    assert!(vm.set_main_breakpoint(after_call, true));

    assert_eq!(vm.run_until_halt(1000), EngineState::Paused);
    let object = vm.stack()[0].clone();
    assert!(matches!(object, Value::Object(_)));
    assert_eq!(vm.stack(), &[object, Value::Int(99), Value::Int(5)]);

    vm.resume().unwrap();
    assert_eq!(vm.run_until_halt(1000), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["5", "99"]);
}

#[test]
fn breakpoint_halts_once_per_pass() {
    // for (i = 0; i < 3; i++) print(i);
    let mut main = Program::new("main").with_reserved_locals(1);
    line(&mut main, 1, [int(0), store(0)]);
    line(
        &mut main,
        2,
        [
            S::LoadLocal(0),
            int(3),
            S::Binary(BinaryOperator::Less),
            S::JumpIfFalse(13),
        ],
    );
    line(&mut main, 3, [S::LoadLocal(0), print()]);
    line(
        &mut main,
        4,
        [
            S::LoadLocal(0),
            int(1),
            S::Binary(BinaryOperator::Add),
            store(0),
            S::Jump(2),
        ],
    );
    assert_eq!(main.len(), 13);
    let body = first_on_line(&main, 3);
    let mut vm = engine(builtins_only(), main);
    vm.set_main_breakpoint(body, true);

    let mut halts = 0;
    while vm.run_until_halt(1000) == EngineState::Paused {
        halts += 1;
        assert_eq!(vm.host().lines().len(), halts - 1);
        vm.resume().unwrap();
    }
    assert_eq!(halts, 3);
    assert_eq!(vm.state(), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["0", "1", "2"]);
    assert_eq!(vm.host().pointers, vec![Some(pos(3)); 3]);
}

#[test]
fn step_over_runs_the_call_to_completion() {
    let c = counter();
    let main = counter_main(&c);
    let line_12 = first_on_line(&main, 12);
    let inc = c.inc;
    let mut vm = engine(c.resolution, main);
    vm.set_main_breakpoint(line_12, true);
    assert_eq!(vm.run_until_halt(1000), EngineState::Paused);
    assert_eq!(vm.program_pointer().1, Some(pos(12)));

    vm.step_over().unwrap();
    assert_eq!(vm.run_until_halt(1000), EngineState::Paused);
    assert_eq!(vm.program_pointer().1, Some(pos(13)));
    assert_eq!(vm.current_method(), None);

    vm.step_into().unwrap();
    assert_eq!(vm.run_until_halt(1000), EngineState::Paused);
    assert_eq!(vm.current_method(), Some(inc));
    assert_eq!(vm.program_pointer().1, Some(pos(3)));
    assert_eq!(vm.call_depth(), 2);

    vm.step_out().unwrap();
    assert_eq!(vm.run_until_halt(1000), EngineState::Paused);
    assert_eq!(vm.program_pointer().1, Some(pos(14)));
    assert_eq!(vm.call_depth(), 1);

    vm.resume().unwrap();
    assert_eq!(vm.run_until_halt(1000), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["0", "2"]);
}

#[test]
fn evaluate_restores_paused_run() {
    let c = counter();
    let main = counter_main(&c);
    let line_14 = first_on_line(&main, 14);
    let n = c.n;
    let mut vm = engine(c.resolution, main);
    vm.set_main_breakpoint(line_14, true);
    assert_eq!(vm.run_until_halt(1000), EngineState::Paused);
    let stack_before = vm.stack().to_vec();

    let mut expression = Program::new("watch");
    expression.emit(S::LoadLocal(0));
    expression.emit(S::LoadAttribute { index: n });
    expression.emit(int(40));
    expression.emit(S::Binary(BinaryOperator::Add));
    expression.emit(ret_value());
    let this = vm.frame()[0].clone();

    assert_eq!(vm.evaluate(expression, vec![this]), Ok(Some(Value::Int(42))));
    assert_eq!(vm.state(), EngineState::Paused);
    assert_eq!(vm.stack(), stack_before.as_slice());

    let mut failing = Program::new("watch");
    failing.emit(S::PushConstant(Value::Null));
    failing.emit(S::LoadAttribute { index: n });
    assert!(vm.evaluate(failing, Vec::new()).is_err());
    assert_eq!(vm.state(), EngineState::Paused);
    assert!(vm.last_error().is_none());
}

#[test]
fn null_array_access_reports_stack_trace() {
    let decl = TypeDecl {
        methods: vec![method(
            "first",
            &[("a", ty("int").with_array_dimensions(1))],
            Some(ty("int")),
        )],
        ..class("Util")
    };
    let mut resolution = resolve_one(vec![decl]);
    let util = resolution.lookup("Util").unwrap();
    let int_array = resolution.table.find_array(TypeTable::INT).unwrap();
    let first = resolution.find_method(util, "first", &[int_array]).unwrap();
    let mut body = Program::new("first");
    line(&mut body, 5, [S::LoadLocal(1), int(0), S::LoadArrayElement, ret_value()]);
    resolution.set_method_body(first, body);

    let mut main = Program::new("main");
    line(
        &mut main,
        20,
        [
            S::NewObject { class: util },
            S::PushConstant(Value::Null),
            call(first),
            print(),
        ],
    );
    let mut vm = engine(resolution, main);

    assert_eq!(vm.run_until_halt(1000), EngineState::Error);
    let error = vm.last_error().unwrap();
    assert!(error.message.starts_with("NullPointerException"), "{}", error.message);
    assert_eq!(error.source_position, Some(pos(5)));
    assert_eq!(error.stack.len(), 2);
    assert_eq!(error.stack[0].method_name.as_deref(), Some("Util.first"));
    assert_eq!(error.stack[1].method_name, None);
    assert_eq!(error.stack[1].position, Some(pos(20)));
    assert!(error.to_string().contains("at Util.first (5:1)"));
}

#[test]
fn index_out_of_range_faults() {
    let mut main = Program::new("main");
    line(
        &mut main,
        1,
        [
            int(2),
            S::NewArray {
                element_type: TypeTable::INT,
                dimensions: 1,
            },
            int(2),
            S::LoadArrayElement,
        ],
    );
    let mut vm = engine(builtins_only(), main);
    assert_eq!(vm.run_until_halt(100), EngineState::Error);
    assert_eq!(
        vm.last_error().unwrap().message,
        "ArrayIndexOutOfBoundsException: Index 2 out of bounds for length 2"
    );
}

#[test]
fn integer_division_by_zero_faults() {
    let mut main = Program::new("main");
    line(&mut main, 1, [int(1), int(0), S::Binary(BinaryOperator::Div), print()]);
    let mut vm = engine(builtins_only(), main);
    assert_eq!(vm.run_until_halt(100), EngineState::Error);
    assert_eq!(vm.last_error().unwrap().message, "ArithmeticException: / by zero");
    assert!(vm.host().output.is_empty());
}

#[test]
fn multi_dimensional_arrays_get_default_elements() {
    let mut main = Program::new("main").with_reserved_locals(1);
    line(
        &mut main,
        1,
        [
            int(2),
            int(3),
            S::NewArray {
                element_type: TypeTable::DOUBLE,
                dimensions: 2,
            },
            store(0),
        ],
    );
    line(&mut main, 2, [S::LoadLocal(0), S::ArrayLength, print()]);
    line(
        &mut main,
        3,
        [S::LoadLocal(0), int(1), S::LoadArrayElement, S::ArrayLength, print()],
    );
    line(
        &mut main,
        4,
        [
            S::LoadLocal(0),
            int(1),
            S::LoadArrayElement,
            int(2),
            S::LoadArrayElement,
            print(),
        ],
    );
    let mut vm = engine(builtins_only(), main);
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["2", "3", "0.0"]);
}

// ============================================================================
// Inheritance
// ============================================================================

struct Zoo {
    resolution: Resolution,
    animal: TypeId,
    dog: TypeId,
    speak: MethodId,
}

fn zoo() -> Zoo {
    let animal = TypeDecl {
        attributes: vec![attribute("legs", ty("int"))],
        methods: vec![method("speak", &[], Some(ty("String")))],
        ..class("Animal")
    };
    let dog = TypeDecl {
        extends: vec![ty("Animal")],
        attributes: vec![attribute("tricks", ty("int"))],
        methods: vec![method("speak", &[], Some(ty("String")))],
        ..class("Dog")
    };
    let mut resolution = resolve_one(vec![animal, dog]);
    let animal = resolution.lookup("Animal").unwrap();
    let dog = resolution.lookup("Dog").unwrap();
    let legs = resolution.attribute_index(dog, "legs").unwrap();
    let tricks = resolution.attribute_index(dog, "tricks").unwrap();
    let speak = resolution.table.collect_methods(animal, "speak")[0];
    let dog_speak = resolution.table.collect_methods(dog, "speak")[0];
    assert_ne!(speak, dog_speak);

    let mut body = Program::new("Animal.speak");
    body.emit(text("..."));
    body.emit(ret_value());
    resolution.set_method_body(speak, body);
    let mut body = Program::new("Dog.speak");
    body.emit(text("Woof"));
    body.emit(ret_value());
    resolution.set_method_body(dog_speak, body);

    // legs = 4 in Animal, tricks = legs - 1 in Dog
    let mut init = Program::new("Animal.<init>");
    init.emit(S::LoadLocal(0));
    init.emit(int(4));
    init.emit(S::StoreAttribute {
        index: legs,
        leave_value: false,
    });
    resolution.set_attribute_initializer(animal, init);
    let mut init = Program::new("Dog.<init>");
    init.emit(S::LoadLocal(0));
    init.emit(S::LoadLocal(0));
    init.emit(S::LoadAttribute { index: legs });
    init.emit(int(1));
    init.emit(S::Binary(BinaryOperator::Sub));
    init.emit(S::StoreAttribute {
        index: tricks,
        leave_value: false,
    });
    resolution.set_attribute_initializer(dog, init);

    Zoo {
        resolution,
        animal,
        dog,
        speak,
    }
}

#[test]
fn calls_dispatch_on_runtime_class() {
    let z = zoo();
    let mut main = Program::new("main");
    line(&mut main, 1, [S::NewObject { class: z.dog }, call(z.speak), print()]);
    line(
        &mut main,
        2,
        [
            S::NewObject { class: z.dog },
            S::CallMethod {
                method: z.speak,
                is_super_call: true,
            },
            print(),
        ],
    );
    line(&mut main, 3, [S::NewObject { class: z.animal }, call(z.speak), print()]);
    let mut vm = engine(z.resolution, main);
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["Woof", "...", "..."]);
}

#[test]
fn base_initializers_run_first() {
    let z = zoo();
    let tricks = z.resolution.attribute_index(z.dog, "tricks").unwrap();
    let mut main = Program::new("main");
    line(
        &mut main,
        1,
        [S::NewObject { class: z.dog }, S::LoadAttribute { index: tricks }, print()],
    );
    let mut vm = engine(z.resolution, main);
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["3"]);
    assert!(vm.stack().is_empty());
}

#[test]
fn failed_cast_faults() {
    let z = zoo();
    let mut main = Program::new("main");
    line(&mut main, 7, [S::NewObject { class: z.animal }, S::CheckCast { target: z.dog }]);
    let mut vm = engine(z.resolution, main);
    assert_eq!(vm.run_until_halt(100), EngineState::Error);
    assert_eq!(
        vm.last_error().unwrap().message,
        "ClassCastException: class Animal cannot be cast to class Dog"
    );
}

#[test]
fn instanceof_follows_the_class_chain() {
    let z = zoo();
    let mut main = Program::new("main");
    line(&mut main, 1, [S::NewObject { class: z.dog }, S::InstanceOf { target: z.animal }, print()]);
    line(&mut main, 2, [S::NewObject { class: z.animal }, S::InstanceOf { target: z.dog }, print()]);
    line(&mut main, 3, [S::PushConstant(Value::Null), S::InstanceOf { target: z.animal }, print()]);
    let mut vm = engine(z.resolution, main);
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["true", "false", "false"]);
}

#[test]
fn runaway_recursion_overflows() {
    let decl = TypeDecl {
        methods: vec![static_method("down", None)],
        ..class("Deep")
    };
    let mut resolution = resolve_one(vec![decl]);
    let deep = resolution.lookup("Deep").unwrap();
    let twin = resolution.table.static_class_of(deep).unwrap();
    let down = resolution.table.collect_methods(twin, "down")[0];
    let mut body = Program::new("down");
    body.emit(call(down));
    body.emit(ret());
    resolution.set_method_body(down, body);

    let mut main = Program::new("main");
    main.emit(call(down));
    let config = EngineConfig {
        max_call_depth: 50,
        ..EngineConfig::default()
    };
    let mut vm = engine_with(resolution, main, config);
    assert_eq!(vm.run_until_halt(100), EngineState::Error);
    let error = vm.last_error().unwrap();
    assert!(error.message.starts_with("StackOverflowError"));
    assert_eq!(error.stack.len(), 50);
}

// ============================================================================
// Statics, enums, JSON, generics
// ============================================================================

#[test]
fn static_initializer_runs_before_main() {
    let decl = TypeDecl {
        attributes: vec![AttributeDecl {
            is_static: true,
            ..attribute("limit", ty("int"))
        }],
        ..class("Config")
    };
    let mut resolution = resolve_one(vec![decl]);
    let config = resolution.lookup("Config").unwrap();
    let limit = resolution.static_attribute_index(config, "limit").unwrap();
    let mut init = Program::new("Config.<clinit>");
    init.emit(int(5));
    init.emit(S::StoreStaticAttribute {
        class: config,
        index: limit,
        leave_value: false,
    });
    resolution.set_static_initializer(config, init);

    let mut main = Program::new("main");
    line(&mut main, 1, [S::LoadStaticAttribute { class: config, index: limit }, print()]);
    let mut vm = engine(resolution, main);
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["5"]);
    assert_eq!(vm.statics(config), Some(&[Value::Int(5)][..]));
}

#[test]
fn enum_constants_are_constructed_before_main() {
    let decl = TypeDecl {
        kind: DeclKind::Enum,
        attributes: vec![attribute("code", ty("int"))],
        methods: vec![MethodDecl {
            is_constructor: true,
            ..method("Color", &[("code", ty("int"))], None)
        }],
        enum_constants: ["RED", "GREEN"]
            .iter()
            .map(|c| EnumConstantDecl {
                identifier: c.to_string(),
                ..EnumConstantDecl::default()
            })
            .collect(),
        ..class("Color")
    };
    let mut resolution = resolve_one(vec![decl]);
    let color = resolution.lookup("Color").unwrap();
    let code = resolution.attribute_index(color, "code").unwrap();
    let ctor = resolution.find_constructor(color, &[TypeTable::INT]).unwrap().unwrap();
    let mut body = Program::new("Color.<ctor>");
    body.emit(S::LoadLocal(0));
    body.emit(S::LoadLocal(1));
    body.emit(S::StoreAttribute {
        index: code,
        leave_value: false,
    });
    body.emit(S::Return {
        copy_return_value: false,
        leave_this_object: true,
    });
    resolution.set_method_body(ctor, body);
    for ordinal in 0..2 {
        let mut construct = Program::new("Color.<const>");
        construct.emit(S::LoadLocal(0));
        construct.emit(int(10 * (ordinal as i32 + 1)));
        construct.emit(call(ctor));
        construct.emit(S::Pop);
        resolution.set_enum_constructor_call(color, ordinal, construct);
    }
    let name = resolution.find_method(color, "name", &[]).unwrap();
    let ordinal = resolution.find_method(color, "ordinal", &[]).unwrap();
    let twin = resolution.table.static_class_of(color).unwrap();
    let values = resolution.table.collect_methods(twin, "values")[0];

    let green = S::LoadEnumConstant {
        enum_type: color,
        ordinal: 1,
    };
    let mut main = Program::new("main");
    line(&mut main, 1, [green.clone(), call(name), print()]);
    line(&mut main, 2, [green.clone(), S::LoadAttribute { index: code }, print()]);
    line(&mut main, 3, [green, call(ordinal), print()]);
    line(&mut main, 4, [call(values), S::ArrayLength, print()]);
    line(
        &mut main,
        5,
        [
            S::LoadEnumConstant {
                enum_type: color,
                ordinal: 0,
            },
            print(),
        ],
    );
    let mut vm = engine(resolution, main);
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["GREEN", "20", "1", "2", "RED"]);
}

#[test]
fn json_round_trip_through_synthesized_methods() {
    let decl = TypeDecl {
        attributes: vec![
            attribute("x", ty("int")),
            attribute("label", ty("String")),
            AttributeDecl {
                is_transient: true,
                ..attribute("cache", ty("double"))
            },
        ],
        ..class("Point")
    };
    let resolution = resolve_one(vec![decl]);
    let point = resolution.lookup("Point").unwrap();
    let x = resolution.attribute_index(point, "x").unwrap();
    let to_json = resolution.find_method(point, "toJson", &[]).unwrap();
    let twin = resolution.table.static_class_of(point).unwrap();
    let from_json = resolution.table.collect_methods(twin, "fromJson")[0];

    let mut main = Program::new("main").with_reserved_locals(1);
    line(&mut main, 1, [S::NewObject { class: point }, store(0)]);
    line(
        &mut main,
        2,
        [
            S::LoadLocal(0),
            int(3),
            S::StoreAttribute {
                index: x,
                leave_value: false,
            },
        ],
    );
    line(&mut main, 3, [S::LoadLocal(0), call(to_json), print()]);
    line(
        &mut main,
        4,
        [
            text(r#"{"x":7,"label":"p"}"#),
            call(from_json),
            S::LoadAttribute { index: x },
            print(),
        ],
    );
    line(&mut main, 5, [text("[1]"), call(from_json)]);
    let mut vm = engine(resolution, main);

    assert_eq!(vm.run_until_halt(100), EngineState::Error);
    assert_eq!(vm.host().lines(), vec![r#"{"x":3,"label":null}"#, "7"]);
    assert!(vm.last_error().unwrap().message.contains("expected a JSON object"));
}

#[test]
fn generic_variant_methods_share_the_canonical_body() {
    let boxed = TypeDecl {
        type_parameters: vec![TypeParameterDecl {
            identifier: "T".to_string(),
            ..TypeParameterDecl::default()
        }],
        attributes: vec![attribute("value", ty("T"))],
        methods: vec![
            method("get", &[], Some(ty("T"))),
            method("set", &[("v", ty("T"))], None),
        ],
        ..class("Box")
    };
    let holder = TypeDecl {
        attributes: vec![attribute(
            "b",
            ty("Box").with_arguments(vec![ty("String")]),
        )],
        ..class("Holder")
    };
    let mut resolution = resolve_one(vec![boxed, holder]);
    let canonical = resolution.lookup("Box").unwrap();
    let value = resolution.attribute_index(canonical, "value").unwrap();
    let get = resolution.find_method(canonical, "get", &[]).unwrap();
    let set = resolution.table.collect_methods(canonical, "set")[0];

    let mut body = Program::new("Box.get");
    body.emit(S::LoadLocal(0));
    body.emit(S::LoadAttribute { index: value });
    body.emit(ret_value());
    resolution.set_method_body(get, body);
    let mut body = Program::new("Box.set");
    body.emit(S::LoadLocal(0));
    body.emit(S::LoadLocal(1));
    body.emit(S::StoreAttribute {
        index: value,
        leave_value: false,
    });
    body.emit(ret());
    resolution.set_method_body(set, body);

    let variant = resolution
        .table
        .find_variant(canonical, &[TypeTable::STRING])
        .unwrap();
    let variant_get = resolution.find_method(variant, "get", &[]).unwrap();
    let variant_set = resolution
        .find_method(variant, "set", &[TypeTable::STRING])
        .unwrap();

    let mut main = Program::new("main").with_reserved_locals(1);
    line(&mut main, 1, [S::NewObject { class: variant }, store(0)]);
    line(&mut main, 2, [S::LoadLocal(0), text("hi"), call(variant_set)]);
    line(&mut main, 3, [S::LoadLocal(0), call(variant_get), print()]);
    let mut vm = engine(resolution, main);
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["hi"]);
}

// ============================================================================
// Suspension and scheduling
// ============================================================================

#[test]
fn input_suspends_until_resolved() {
    let mut main = Program::new("main");
    line(
        &mut main,
        1,
        [
            S::ReadInput {
                prompt: "name?".to_string(),
            },
            text("hello "),
            S::Binary(BinaryOperator::Add),
            print(),
        ],
    );
    let mut vm = engine(builtins_only(), main);

    assert_eq!(vm.run_until_halt(100), EngineState::WaitingForInput);
    assert_eq!(vm.host().prompts, vec!["name?"]);
    assert!(vm.resume().is_err());

    vm.resolve_input("Ada").unwrap();
    assert_eq!(vm.state(), EngineState::Running);
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["Adahello "]);
}

#[test]
fn external_call_suspends_until_resolved() {
    let mut main = Program::new("main");
    line(
        &mut main,
        1,
        [
            int(7),
            text("users"),
            S::ExternalCall {
                arguments: 2,
                has_result: true,
            },
            print(),
        ],
    );
    let mut vm = engine(builtins_only(), main);

    assert_eq!(vm.run_until_halt(100), EngineState::WaitingForDb);
    assert_eq!(
        vm.host().external_calls,
        vec![vec![Value::Int(7), Value::String("users".to_string())]]
    );
    assert!(vm.stack().is_empty());

    vm.resolve_external(Some(Value::Int(49))).unwrap();
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["49"]);
}

fn ticker_class() -> (Resolution, MethodId) {
    let decl = TypeDecl {
        methods: vec![static_method("onTick", None)],
        ..class("Ui")
    };
    let mut resolution = resolve_one(vec![decl]);
    let ui = resolution.lookup("Ui").unwrap();
    let twin = resolution.table.static_class_of(ui).unwrap();
    let on_tick = resolution.table.collect_methods(twin, "onTick")[0];
    let mut body = Program::new("onTick");
    line(&mut body, 30, [text("tick"), print()]);
    line(&mut body, 31, [ret()]);
    resolution.set_method_body(on_tick, body);
    (resolution, on_tick)
}

#[test]
fn callback_interrupts_main_program() {
    let (resolution, on_tick) = ticker_class();
    let mut main = Program::new("main");
    line(&mut main, 1, [text("main 1"), print()]);
    line(&mut main, 2, [text("main 2"), print()]);
    let mut vm = engine(resolution, main);

    assert_eq!(vm.run_until_halt(1), EngineState::Running);
    vm.enqueue_callback(on_tick, None, Vec::new());
    vm.enqueue_callback(on_tick, None, Vec::new());
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["main 1", "tick", "tick", "main 2"]);
    assert!(vm.stack().is_empty());
}

#[test]
fn timers_keep_the_engine_alive() {
    let (resolution, on_tick) = ticker_class();
    let mut vm = engine(resolution, Program::new("main"));
    let timer = vm.register_timer(10, on_tick, None);

    assert_eq!(vm.run_until_halt(100), EngineState::Running);
    vm.fire_timers(1_000);
    vm.run_until_halt(100);
    assert_eq!(vm.host().lines(), vec!["tick"]);

    vm.fire_timers(1_001);
    vm.run_until_halt(100);
    assert_eq!(vm.host().lines().len(), 1);

    assert!(vm.cancel_timer(timer));
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
}

#[test]
fn callback_waits_for_nested_call_to_return() {
    let decl = TypeDecl {
        methods: vec![static_method("onTick", None), static_method("work", None)],
        ..class("Ui")
    };
    let mut resolution = resolve_one(vec![decl]);
    let ui = resolution.lookup("Ui").unwrap();
    let twin = resolution.table.static_class_of(ui).unwrap();
    let on_tick = resolution.table.collect_methods(twin, "onTick")[0];
    let work = resolution.table.collect_methods(twin, "work")[0];
    let mut tick_body = Program::new("onTick");
    line(&mut tick_body, 30, [text("tick"), print()]);
    line(&mut tick_body, 31, [ret()]);
    resolution.set_method_body(on_tick, tick_body);
    let mut work_body = Program::new("work");
    line(&mut work_body, 40, [text("w1"), print()]);
    line(&mut work_body, 41, [text("w2"), print()]);
    line(&mut work_body, 42, [ret()]);
    resolution.set_method_body(work, work_body);

    let mut main = Program::new("main");
    line(&mut main, 1, [call(work)]);
    line(&mut main, 2, [text("main"), print()]);
    let mut vm = engine(resolution, main);

    assert_eq!(vm.run_until_halt(2), EngineState::Running);
    assert_eq!(vm.host().lines(), vec!["w1"]);
    vm.enqueue_callback(on_tick, None, Vec::new());
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["w1", "w2", "tick", "main"]);
    assert!(vm.stack().is_empty());
}

#[test]
fn listeners_keep_the_engine_alive() {
    let (resolution, on_tick) = ticker_class();
    let mut vm = engine(resolution, Program::new("main"));
    let listener = vm.register_listener("keyDown", on_tick, None);

    assert_eq!(vm.run_until_halt(100), EngineState::Running);
    assert_eq!(vm.emit_event("mouseUp", Vec::new()), 0);
    assert_eq!(vm.emit_event("keyDown", Vec::new()), 1);
    assert_eq!(vm.run_until_halt(100), EngineState::Running);
    assert_eq!(vm.host().lines(), vec!["tick"]);

    assert!(vm.remove_listener(listener));
    assert_eq!(vm.run_until_halt(100), EngineState::Done);
    assert_eq!(vm.emit_event("keyDown", Vec::new()), 0);
}

#[test]
fn stop_detaches_listeners() {
    let (resolution, on_tick) = ticker_class();
    let mut vm = engine(resolution, Program::new("main"));
    let listener = vm.register_listener("keyDown", on_tick, None);
    vm.stop();
    assert!(!vm.remove_listener(listener));
}

#[test]
fn instance_callback_without_receiver_faults() {
    let mut main = Program::new("main");
    line(&mut main, 1, [text("one"), print()]);
    line(&mut main, 2, [text("two"), print()]);
    let resolution = builtins_only();
    let to_string = resolution.table.collect_methods(TypeTable::OBJECT, "toString")[0];
    let mut vm = engine(resolution, main);

    assert_eq!(vm.run_until_halt(1), EngineState::Running);
    vm.enqueue_callback(to_string, None, Vec::new());
    assert_eq!(vm.run_until_halt(100), EngineState::Error);
    assert!(vm
        .last_error()
        .unwrap()
        .message
        .starts_with("NullPointerException"));
    assert_eq!(vm.host().lines(), vec!["one"]);
}

#[test]
fn speed_limit_defers_execution() {
    let mut main = Program::new("main");
    line(&mut main, 1, [text("once"), print()]);
    let config = EngineConfig {
        steps_per_second: Some(1),
        ..EngineConfig::default()
    };
    let mut vm = engine_with(builtins_only(), main, config);

    assert_eq!(vm.tick(), EngineState::Running);
    assert!(vm.host().output.is_empty());

    vm.set_speed(None);
    assert_eq!(vm.tick(), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["once"]);
}

#[test]
fn stepping_from_not_initialized_starts_the_run() {
    let c = counter();
    let main = counter_main(&c);
    let mut vm = VM::new(c.resolution.table, RecordingHost::new(), EngineConfig::default());
    vm.load_main(main).unwrap();

    vm.step_over().unwrap();
    assert_eq!(vm.run_until_halt(100), EngineState::Paused);
    assert_eq!(vm.program_pointer().1, Some(pos(11)));
    assert!(vm.host().output.is_empty());
}
