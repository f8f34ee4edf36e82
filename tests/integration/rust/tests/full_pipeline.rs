//! Full Pipeline Integration Tests
//!
//! Tests the complete flow: Declarations -> Resolver -> TypeTable -> VM -> Result

use bytecode_system::{BinaryOperator, Program, StatementKind as S};
use core_types::{SourcePosition, Value};
use interpreter::{EngineConfig, EngineState, RecordingHost, VM};
use resolver::ast::{AttributeDecl, MethodDecl, ModuleDecl, ParameterDecl, TypeDecl, TypeParameterDecl, TypeRef};
use resolver::{resolve, Resolution};
use type_model::TypeTable;

fn pos(line: u32, column: u32) -> SourcePosition {
    SourcePosition::new(line, column, 1)
}

fn ty(name: &str) -> TypeRef {
    TypeRef::named(name, pos(1, 1))
}

fn step(program: &mut Program, line: u32, statements: impl IntoIterator<Item = S>) {
    for kind in statements {
        program.emit_at(kind, pos(line, 5));
    }
    program.mark_step_finished();
}

fn module(name: &str, declarations: Vec<TypeDecl>) -> ModuleDecl {
    ModuleDecl {
        name: name.to_string(),
        declarations,
    }
}

fn boot(resolution: Resolution, main: Program) -> VM<RecordingHost> {
    assert!(!resolution.has_errors(), "{:?}", resolution.diagnostics);
    let mut vm = VM::new(resolution.table, RecordingHost::new(), EngineConfig::default());
    vm.set_module_names(resolution.module_names);
    vm.load_main(main).unwrap();
    vm.start().unwrap();
    vm
}

/// `class Counter { int n; void inc(){n=n+1;} int get(){return n;} }` with
/// bodies compiled into the declaration, as a front end hands them over
fn counter_module() -> ModuleDecl {
    let mut inc = Program::new("Counter.inc");
    step(
        &mut inc,
        2,
        [
            S::LoadLocal(0),
            S::LoadLocal(0),
            S::LoadAttribute { index: 0 },
            S::PushConstant(Value::Int(1)),
            S::Binary(BinaryOperator::Add),
            S::StoreAttribute {
                index: 0,
                leave_value: false,
            },
        ],
    );
    step(
        &mut inc,
        2,
        [S::Return {
            copy_return_value: false,
            leave_this_object: false,
        }],
    );

    let mut get = Program::new("Counter.get");
    step(
        &mut get,
        3,
        [
            S::LoadLocal(0),
            S::LoadAttribute { index: 0 },
            S::Return {
                copy_return_value: true,
                leave_this_object: false,
            },
        ],
    );

    module(
        "Counter.java",
        vec![TypeDecl {
            identifier: "Counter".to_string(),
            position: pos(1, 7),
            end_position: pos(4, 1),
            attributes: vec![AttributeDecl {
                identifier: "n".to_string(),
                type_ref: ty("int"),
                ..AttributeDecl::default()
            }],
            methods: vec![
                MethodDecl {
                    identifier: "inc".to_string(),
                    body: Some(inc),
                    ..MethodDecl::default()
                },
                MethodDecl {
                    identifier: "get".to_string(),
                    return_type: Some(ty("int")),
                    body: Some(get),
                    ..MethodDecl::default()
                },
            ],
            ..TypeDecl::default()
        }],
    )
}

#[test]
fn test_counter_increments_twice() {
    let resolution = resolve(vec![counter_module()]);
    let counter = resolution.lookup("Counter").unwrap();
    assert_eq!(resolution.attribute_index(counter, "n"), Some(0));
    let inc = resolution.find_method(counter, "inc", &[]).unwrap();
    let get = resolution.find_method(counter, "get", &[]).unwrap();

    let call = |method| S::CallMethod {
        method,
        is_super_call: false,
    };
    let mut main = Program::new("main").with_reserved_locals(1);
    step(
        &mut main,
        10,
        [
            S::NewObject { class: counter },
            S::StoreLocal {
                offset: 0,
                leave_value: false,
            },
        ],
    );
    step(&mut main, 11, [S::LoadLocal(0), call(inc)]);
    step(&mut main, 12, [S::LoadLocal(0), call(inc)]);
    step(&mut main, 13, [S::LoadLocal(0), call(get)]);
    step(&mut main, 14, [S::Pop]);
    let after_construction = 2;
    let after_get = main.len() - 1;

    let mut vm = boot(resolution, main);
    vm.set_main_breakpoint(after_construction, true);
    vm.set_main_breakpoint(after_get, true);

    assert_eq!(vm.run_until_halt(1_000), EngineState::Paused);
    let Value::Object(id) = vm.stack()[0].clone() else {
        panic!("expected the counter in local 0, got {:?}", vm.stack());
    };
    assert_eq!(vm.heap().object(id).unwrap().slots, vec![Value::Int(0)]);
    assert_eq!(vm.stack().len(), 1);

    vm.resume().unwrap();
    assert_eq!(vm.run_until_halt(1_000), EngineState::Paused);
    assert_eq!(vm.stack(), &[Value::Object(id), Value::Int(2)]);

    vm.resume().unwrap();
    assert_eq!(vm.run_until_halt(1_000), EngineState::Done);
    assert!(vm.stack().is_empty());
}

#[test]
fn test_undeclared_type_reported_once_at_reference() {
    let reference = TypeRef::named("Missing", pos(7, 12));
    let decl = TypeDecl {
        identifier: "Holder".to_string(),
        attributes: vec![AttributeDecl {
            identifier: "m".to_string(),
            type_ref: reference,
            ..AttributeDecl::default()
        }],
        ..TypeDecl::default()
    };
    let resolution = resolve(vec![module("Holder.java", vec![decl])]);

    let diagnostics: Vec<_> = resolution.diagnostics.iter().collect();
    assert_eq!(diagnostics.len(), 1);
    let (_, _, diagnostic) = diagnostics[0];
    assert!(diagnostic.is_error());
    assert_eq!(diagnostic.position, pos(7, 12));
    assert!(diagnostic.message.contains("Missing"));
}

#[test]
fn test_reference_to_later_module_resolves() {
    let holder = TypeDecl {
        identifier: "Holder".to_string(),
        attributes: vec![AttributeDecl {
            identifier: "c".to_string(),
            type_ref: TypeRef::named("Counter", pos(2, 5)),
            ..AttributeDecl::default()
        }],
        ..TypeDecl::default()
    };
    let resolution = resolve(vec![module("Holder.java", vec![holder]), counter_module()]);

    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);
    let counter = resolution.lookup("Counter").unwrap();
    assert!(resolution
        .usages(counter)
        .iter()
        .any(|usage| usage.position == pos(2, 5)));
}

#[test]
fn test_null_array_access_aborts_with_trace() {
    let mut first = Program::new("Util.first");
    step(
        &mut first,
        3,
        [
            S::LoadLocal(0),
            S::PushConstant(Value::Int(0)),
            S::LoadArrayElement,
            S::Return {
                copy_return_value: true,
                leave_this_object: false,
            },
        ],
    );
    let decl = TypeDecl {
        identifier: "Util".to_string(),
        methods: vec![MethodDecl {
            identifier: "first".to_string(),
            parameters: vec![ParameterDecl {
                identifier: "a".to_string(),
                type_ref: ty("int").with_array_dimensions(1),
            }],
            return_type: Some(ty("int")),
            is_static: true,
            body: Some(first),
            ..MethodDecl::default()
        }],
        ..TypeDecl::default()
    };
    let resolution = resolve(vec![module("Util.java", vec![decl])]);
    let util = resolution.lookup("Util").unwrap();
    let twin = resolution.table.static_class_of(util).unwrap();
    let first = resolution.table.collect_methods(twin, "first")[0];

    let mut main = Program::new("main");
    step(
        &mut main,
        20,
        [
            S::PushConstant(Value::Null),
            S::CallMethod {
                method: first,
                is_super_call: false,
            },
            S::Print {
                newline: true,
                with_value: true,
            },
        ],
    );
    let mut vm = boot(resolution, main);

    assert_eq!(vm.run_until_halt(1_000), EngineState::Error);
    let error = vm.last_error().unwrap();
    assert!(error.message.starts_with("NullPointerException"));
    assert!(!error.stack.is_empty());
    assert_eq!(error.stack[0].method_name.as_deref(), Some("Util.first"));
    assert_eq!(error.stack.last().unwrap().position, Some(pos(20, 5)));
    assert!(vm.host().output.is_empty());
}

#[test]
fn test_generic_container_through_pipeline() {
    // class Box<T> { T value; T get(); void set(T v); }
    // class Shelf { Box<String> label; }
    let mut get = Program::new("Box.get");
    get.emit(S::LoadLocal(0));
    get.emit(S::LoadAttribute { index: 0 });
    get.emit(S::Return {
        copy_return_value: true,
        leave_this_object: false,
    });
    let mut set = Program::new("Box.set");
    set.emit(S::LoadLocal(0));
    set.emit(S::LoadLocal(1));
    set.emit(S::StoreAttribute {
        index: 0,
        leave_value: false,
    });
    set.emit(S::Return {
        copy_return_value: false,
        leave_this_object: false,
    });
    let boxed = TypeDecl {
        identifier: "Box".to_string(),
        end_position: pos(10, 1),
        type_parameters: vec![TypeParameterDecl {
            identifier: "T".to_string(),
            ..TypeParameterDecl::default()
        }],
        attributes: vec![AttributeDecl {
            identifier: "value".to_string(),
            type_ref: ty("T"),
            ..AttributeDecl::default()
        }],
        methods: vec![
            MethodDecl {
                identifier: "get".to_string(),
                return_type: Some(ty("T")),
                body: Some(get),
                ..MethodDecl::default()
            },
            MethodDecl {
                identifier: "set".to_string(),
                parameters: vec![ParameterDecl {
                    identifier: "v".to_string(),
                    type_ref: ty("T"),
                }],
                body: Some(set),
                ..MethodDecl::default()
            },
        ],
        ..TypeDecl::default()
    };
    let shelf = TypeDecl {
        identifier: "Shelf".to_string(),
        attributes: vec![AttributeDecl {
            identifier: "label".to_string(),
            type_ref: ty("Box").with_arguments(vec![ty("String")]),
            ..AttributeDecl::default()
        }],
        ..TypeDecl::default()
    };
    let resolution = resolve(vec![module("Box.java", vec![boxed, shelf])]);
    let canonical = resolution.lookup("Box").unwrap();
    let variant = resolution
        .table
        .find_variant(canonical, &[TypeTable::STRING])
        .unwrap();
    assert_eq!(resolution.table.identifier(variant), "Box<String>");
    let set = resolution
        .find_method(variant, "set", &[TypeTable::STRING])
        .unwrap();
    let get = resolution.find_method(variant, "get", &[]).unwrap();
    assert_eq!(resolution.table.method(get).return_type, Some(TypeTable::STRING));

    let call = |method| S::CallMethod {
        method,
        is_super_call: false,
    };
    let mut main = Program::new("main").with_reserved_locals(1);
    step(
        &mut main,
        1,
        [
            S::NewObject { class: variant },
            S::StoreLocal {
                offset: 0,
                leave_value: false,
            },
        ],
    );
    step(
        &mut main,
        2,
        [
            S::LoadLocal(0),
            S::PushConstant(Value::String("jam".to_string())),
            call(set),
        ],
    );
    step(
        &mut main,
        3,
        [
            S::LoadLocal(0),
            call(get),
            S::Print {
                newline: true,
                with_value: true,
            },
        ],
    );
    let mut vm = boot(resolution, main);

    assert_eq!(vm.run_until_halt(1_000), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["jam"]);
}

#[test]
fn test_subclass_of_generic_variant_runs_base_initializers() {
    // class Box<T> { T value; int count = 5; }
    // class Sub extends Box<String> {}
    let mut init = Program::new("Box.<init>");
    init.emit(S::LoadLocal(0));
    init.emit(S::PushConstant(Value::Int(5)));
    init.emit(S::StoreAttribute {
        index: 1,
        leave_value: false,
    });
    init.emit(S::Return {
        copy_return_value: false,
        leave_this_object: false,
    });
    let boxed = TypeDecl {
        identifier: "Box".to_string(),
        end_position: pos(10, 1),
        type_parameters: vec![TypeParameterDecl {
            identifier: "T".to_string(),
            ..TypeParameterDecl::default()
        }],
        attributes: vec![
            AttributeDecl {
                identifier: "value".to_string(),
                type_ref: ty("T"),
                ..AttributeDecl::default()
            },
            AttributeDecl {
                identifier: "count".to_string(),
                type_ref: ty("int"),
                ..AttributeDecl::default()
            },
        ],
        attribute_initializer: Some(init),
        ..TypeDecl::default()
    };
    let sub = TypeDecl {
        identifier: "Sub".to_string(),
        extends: vec![ty("Box").with_arguments(vec![ty("String")])],
        ..TypeDecl::default()
    };
    let resolution = resolve(vec![module("Box.java", vec![sub, boxed])]);
    let boxed = resolution.lookup("Box").unwrap();
    let sub = resolution.lookup("Sub").unwrap();
    assert_eq!(resolution.attribute_index(sub, "count"), Some(1));

    let mut main = Program::new("main");
    for (line, class) in [(1, boxed), (2, sub)] {
        step(
            &mut main,
            line,
            [
                S::NewObject { class },
                S::LoadAttribute { index: 1 },
                S::Print {
                    newline: true,
                    with_value: true,
                },
            ],
        );
    }
    let mut vm = boot(resolution, main);

    assert_eq!(vm.run_until_halt(1_000), EngineState::Done);
    assert_eq!(vm.host().lines(), vec!["5", "5"]);
}
