//! Overload and constructor resolution by implicit-cast cost

use core_types::{MethodId, TypeId};
use type_model::{TypeKind, TypeTable};

/// Cost of one implicit cast, in half units
const CAST_COST: u32 = 2;
/// Extra cost when the cast targets a `String` parameter
const STRING_CAST_EXTRA: u32 = 1;

/// Pick the cheapest applicable method among `candidates`.
///
/// A candidate applies when its name and arity match and every argument is
/// either exactly the parameter type or implicitly castable to it. Each cast
/// costs one, plus one half when the parameter is `String`, so overloads
/// taking `String` lose against equally close ones that don't. On a tie the
/// first candidate wins.
///
/// Returns the single chosen method, or an error message for the caller to
/// report.
pub fn find_suitable_methods(
    table: &TypeTable,
    candidates: &[MethodId],
    name: &str,
    argument_types: &[TypeId],
    allow_constructor_match: bool,
) -> Result<Vec<MethodId>, String> {
    let mut best: Option<(u32, MethodId)> = None;

    for &candidate in candidates {
        let method = table.method(candidate);
        if method.identifier != name || method.is_constructor != allow_constructor_match {
            continue;
        }
        let Some(cost) = casting_cost(table, candidate, argument_types) else {
            continue;
        };
        tracing::trace!(method = %table.signature(candidate), cost, "overload candidate");
        match best {
            Some((best_cost, _)) if best_cost <= cost => {}
            _ => best = Some((cost, candidate)),
        }
    }

    match best {
        Some((_, method)) => Ok(vec![method]),
        None => {
            let arguments: Vec<&str> = argument_types
                .iter()
                .map(|&t| table.identifier(t))
                .collect();
            Err(format!(
                "No suitable method {}({}) found",
                name,
                arguments.join(", ")
            ))
        }
    }
}

fn casting_cost(table: &TypeTable, method: MethodId, argument_types: &[TypeId]) -> Option<u32> {
    let m = table.method(method);
    let declared = m.parameters.len();

    let ellipsis_element = if m.has_ellipsis {
        m.parameters.last().and_then(|p| match &table.get(p.type_id).kind {
            TypeKind::Array(a) => Some(a.element),
            _ => None,
        })
    } else {
        None
    };

    let arity_ok = match ellipsis_element {
        Some(_) => argument_types.len() + 1 >= declared,
        None => argument_types.len() == declared,
    };
    if !arity_ok {
        return None;
    }

    let mut cost = 0;
    for (i, &argument) in argument_types.iter().enumerate() {
        let parameter = match ellipsis_element {
            Some(element) if i + 1 >= declared => {
                // an array passed directly in the ellipsis position
                let array = m.parameters[declared - 1].type_id;
                if argument_types.len() == declared && table.can_cast_to(argument, array) {
                    array
                } else {
                    element
                }
            }
            _ => m.parameters[i].type_id,
        };
        if argument == parameter {
            continue;
        }
        if !table.can_cast_to(argument, parameter) {
            return None;
        }
        cost += CAST_COST;
        if parameter == TypeTable::STRING {
            cost += STRING_CAST_EXTRA;
        }
    }
    Some(cost)
}

/// Resolve a call `receiver.name(arguments)` against every method visible on
/// `receiver`
pub fn resolve_method_call(
    table: &TypeTable,
    receiver: TypeId,
    name: &str,
    argument_types: &[TypeId],
) -> Result<MethodId, String> {
    let candidates = table.collect_methods(receiver, name);
    let found = find_suitable_methods(table, &candidates, name, argument_types, false)?;
    found
        .first()
        .copied()
        .ok_or_else(|| format!("No suitable method {} found", name))
}

/// Resolve `new Class(arguments)`.
///
/// `Ok(None)` means the class declares no constructor and the implicit
/// no-argument one applies.
pub fn find_constructor(
    table: &TypeTable,
    class: TypeId,
    argument_types: &[TypeId],
) -> Result<Option<MethodId>, String> {
    let constructors: Vec<MethodId> = table
        .methods_of(class)
        .iter()
        .copied()
        .filter(|&m| table.method(m).is_constructor)
        .collect();
    let name = table.identifier(class);
    if constructors.is_empty() {
        return if argument_types.is_empty() {
            Ok(None)
        } else {
            Err(format!(
                "{} has no constructor taking {} arguments",
                name,
                argument_types.len()
            ))
        };
    }
    let name = table
        .method(constructors[0])
        .identifier
        .clone();
    let found = find_suitable_methods(table, &constructors, &name, argument_types, true)?;
    Ok(found.first().copied())
}
