//! Native members generated for every class and enum

use core_types::{TypeId, Value};
use type_model::{native_argument, Method, MethodBody, NativeMethod, Parameter, TypeTable};

fn native_method(name: &str, declaring_type: TypeId, return_type: TypeId, body: NativeMethod) -> Method {
    let mut method = Method::new(name, declaring_type);
    method.return_type = Some(return_type);
    method.body = MethodBody::Native(body);
    method
}

fn install(table: &mut TypeTable, owner: TypeId, mut method: Method) {
    if owner != method.declaring_type {
        method.is_static = true;
        method.is_virtual = false;
    }
    let method = table.add_method(method);
    table.push_method(owner, method);
}

/// `String toJson()` and `static Class fromJson(String)`
pub(crate) fn add_json_methods(table: &mut TypeTable, class: TypeId) {
    let to_json = native_method(
        "toJson",
        class,
        TypeTable::STRING,
        NativeMethod::new(|ctx, args| ctx.object_to_json(native_argument(args, 0)?).map(|json| Some(Value::String(json)))),
    );
    install(table, class, to_json);

    let Some(twin) = table.static_class_of(class) else {
        return;
    };
    let mut from_json = native_method(
        "fromJson",
        class,
        class,
        NativeMethod::new(move |ctx, args| match native_argument(args, 0)? {
            Value::String(json) => ctx.object_from_json(class, json).map(Some),
            Value::Null => Err("NullPointerException: fromJson(null)".to_string()),
            other => Err(format!("fromJson expects a String, got {}", other.type_name())),
        }),
    );
    from_json.parameters.push(Parameter {
        identifier: "json".to_string(),
        type_id: TypeTable::STRING,
    });
    install(table, twin, from_json);
}

/// `static E[] values()`, `int ordinal()`, `String name()` and `toString()`
pub(crate) fn add_enum_methods(table: &mut TypeTable, enum_type: TypeId) {
    let array = table.array_of(enum_type);
    if let Some(twin) = table.static_class_of(enum_type) {
        let values = native_method(
            "values",
            enum_type,
            array,
            NativeMethod::new(move |ctx, _| ctx.enum_values(enum_type).map(Some)),
        );
        install(table, twin, values);
    }

    let ordinal = native_method(
        "ordinal",
        enum_type,
        TypeTable::INT,
        NativeMethod::new(|ctx, args| {
            let (_, ordinal) = ctx.enum_constant(native_argument(args, 0)?)?;
            Ok(Some(Value::Int(ordinal as i32)))
        }),
    );
    install(table, enum_type, ordinal);

    for name in ["name", "toString"] {
        let method = native_method(
            name,
            enum_type,
            TypeTable::STRING,
            NativeMethod::new(|ctx, args| {
                let (name, _) = ctx.enum_constant(native_argument(args, 0)?)?;
                Ok(Some(Value::String(name)))
            }),
        );
        install(table, enum_type, method);
    }
}
