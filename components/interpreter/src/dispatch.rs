//! Statement dispatch
//!
//! `execute_node` runs a single statement against the execution context.
//! Statements that do not transfer control advance the program position by
//! one; jumps, calls, returns and object creation set it themselves.

use bytecode_system::{BinaryOperator, PrimitiveCast, Statement, StatementKind, UnaryOperator};
use core_types::{HeapId, MethodId, SourcePosition, Value};
use type_model::{MethodBody, TypeId, TypeTable};

use crate::call_frame::{Activation, CallOrigin, ProgramStackElement};
use crate::error::{Fault, FaultResult};
use crate::host::Host;
use crate::vm::{EngineState, VM};

impl<H: Host> VM<H> {
    /// Execute one statement of the running activation
    pub(crate) fn execute_node(&mut self, statement: &Statement) -> FaultResult<()> {
        match &statement.kind {
            StatementKind::PushConstant(value) => self.ctx.push(value.clone()),
            StatementKind::Pop => {
                self.ctx.pop()?;
            }
            StatementKind::Duplicate => {
                let top = self.ctx.peek()?.clone();
                self.ctx.push(top);
            }

            StatementKind::LoadLocal(offset) => {
                let value = self.ctx.local(*offset)?;
                self.ctx.push(value);
            }
            StatementKind::StoreLocal {
                offset,
                leave_value,
            } => {
                let value = self.ctx.pop()?;
                if *leave_value {
                    self.ctx.push(value.clone());
                }
                self.ctx.set_local(*offset, value)?;
            }

            StatementKind::LoadAttribute { index } => {
                let object = self.ctx.pop()?;
                let id = object_ref(&object, "read a field")?;
                let value = self
                    .heap
                    .object(id)?
                    .slots
                    .get(*index)
                    .cloned()
                    .ok_or_else(|| Fault::TypeMismatch(format!("no attribute slot {}", index)))?;
                self.ctx.push(value);
            }
            StatementKind::StoreAttribute { index, leave_value } => {
                let value = self.ctx.pop()?;
                let object = self.ctx.pop()?;
                let id = object_ref(&object, "assign a field")?;
                let slot = self
                    .heap
                    .object_mut(id)?
                    .slots
                    .get_mut(*index)
                    .ok_or_else(|| Fault::TypeMismatch(format!("no attribute slot {}", index)))?;
                *slot = value.clone();
                if *leave_value {
                    self.ctx.push(value);
                }
            }
            StatementKind::LoadStaticAttribute { class, index } => {
                let value = self.static_slot(*class, *index)?.clone();
                self.ctx.push(value);
            }
            StatementKind::StoreStaticAttribute {
                class,
                index,
                leave_value,
            } => {
                let value = self.ctx.pop()?;
                *self.static_slot(*class, *index)? = value.clone();
                if *leave_value {
                    self.ctx.push(value);
                }
            }

            StatementKind::Binary(op) => {
                let right = self.ctx.pop()?;
                let left = self.ctx.pop()?;
                let result = self.binary(*op, left, right)?;
                self.ctx.push(result);
            }
            StatementKind::Unary(op) => {
                let operand = self.ctx.pop()?;
                self.ctx.push(unary(*op, operand)?);
            }
            StatementKind::Cast(cast) => {
                let operand = self.ctx.pop()?;
                let result = match cast {
                    PrimitiveCast::ToString => Value::String(self.view().display(&operand)),
                    _ => primitive_cast(*cast, operand)?,
                };
                self.ctx.push(result);
            }
            StatementKind::CheckCast { target } => {
                let value = self.ctx.peek()?.clone();
                if let Some(from) = self.view().runtime_type(&value).map_err(Fault::Native)? {
                    if !self.table.can_cast_to(from, *target) {
                        return Err(Fault::ClassCast {
                            from: self.table.identifier(from).to_string(),
                            to: self.table.identifier(*target).to_string(),
                        });
                    }
                }
            }
            StatementKind::InstanceOf { target } => {
                let value = self.ctx.pop()?;
                let is_instance = self
                    .view()
                    .runtime_type(&value)
                    .map_err(Fault::Native)?
                    .is_some_and(|from| self.table.can_cast_to(from, *target));
                self.ctx.push(Value::Boolean(is_instance));
            }

            StatementKind::Jump(target) => {
                self.ctx.jump(*target);
                return Ok(());
            }
            StatementKind::JumpIfFalse(target) | StatementKind::JumpIfTrue(target) => {
                let condition = self.ctx.pop()?;
                let condition = condition.as_bool().ok_or_else(|| {
                    Fault::TypeMismatch(format!("condition is {}", condition.type_name()))
                })?;
                let jump_when = matches!(statement.kind, StatementKind::JumpIfTrue(_));
                if condition == jump_when {
                    self.ctx.jump(*target);
                } else {
                    self.ctx.advance();
                }
                return Ok(());
            }

            StatementKind::NewObject { class } => {
                return self.new_object(*class, statement.position);
            }
            StatementKind::CallMethod {
                method,
                is_super_call,
            } => {
                return self.call_method(*method, *is_super_call, statement.position);
            }
            StatementKind::Return {
                copy_return_value,
                leave_this_object,
            } => {
                let value = if *copy_return_value {
                    Some(self.ctx.pop()?)
                } else if *leave_this_object {
                    Some(self.ctx.local(0)?)
                } else {
                    None
                };
                self.finish_activation(value);
                return Ok(());
            }

            StatementKind::NewArray {
                element_type,
                dimensions,
            } => {
                let mut lengths = Vec::with_capacity(*dimensions);
                for _ in 0..*dimensions {
                    let length = self.ctx.pop()?;
                    lengths.push(length.as_i64().ok_or_else(|| {
                        Fault::TypeMismatch(format!("array length is {}", length.type_name()))
                    })?);
                }
                lengths.reverse();
                let array = self.new_array(*element_type, &lengths)?;
                self.ctx.push(array);
            }
            StatementKind::LoadArrayElement => {
                let index = self.ctx.pop()?;
                let array = self.ctx.pop()?;
                let id = array_ref(&array, "load from array")?;
                let elements = &self.heap.array(id)?.elements;
                let value = elements[checked_index(&index, elements.len())?].clone();
                self.ctx.push(value);
            }
            StatementKind::StoreArrayElement { leave_value } => {
                let value = self.ctx.pop()?;
                let index = self.ctx.pop()?;
                let array = self.ctx.pop()?;
                let id = array_ref(&array, "store to array")?;
                let elements = &mut self.heap.array_mut(id)?.elements;
                let index = checked_index(&index, elements.len())?;
                elements[index] = value.clone();
                if *leave_value {
                    self.ctx.push(value);
                }
            }
            StatementKind::ArrayLength => {
                let array = self.ctx.pop()?;
                let id = array_ref(&array, "read the array length")?;
                let length = self.heap.array(id)?.elements.len();
                self.ctx.push(Value::Int(length as i32));
            }

            StatementKind::LoadEnumConstant { enum_type, ordinal } => {
                let values = self.enum_values.get(enum_type).copied().ok_or_else(|| {
                    Fault::TypeMismatch(format!("{} is not an enum", self.table.identifier(*enum_type)))
                })?;
                let constants = &self.heap.array(values)?.elements;
                let constant = constants
                    .get(*ordinal)
                    .cloned()
                    .ok_or(Fault::IndexOutOfBounds {
                        index: *ordinal as i64,
                        length: constants.len(),
                    })?;
                self.ctx.push(constant);
            }

            StatementKind::Print {
                newline,
                with_value,
            } => {
                let text = if *with_value {
                    let value = self.ctx.pop()?;
                    self.view().display(&value)
                } else {
                    String::new()
                };
                self.host.print(&text, *newline);
            }
            StatementKind::ReadInput { prompt } => {
                self.host.request_input(prompt);
                self.suspend(EngineState::WaitingForInput);
            }
            StatementKind::ExternalCall {
                arguments,
                has_result,
            } => {
                let split = self
                    .ctx
                    .stack
                    .len()
                    .checked_sub(*arguments)
                    .ok_or(Fault::StackUnderflow)?;
                let arguments = self.ctx.stack.split_off(split);
                self.host.external_call(arguments);
                self.pending_external_result = *has_result;
                self.suspend(EngineState::WaitingForDb);
            }
        }
        self.ctx.advance();
        Ok(())
    }

    fn static_slot(&mut self, class: TypeId, index: usize) -> FaultResult<&mut Value> {
        let name = self.table.identifier(class);
        self.statics
            .get_mut(&class)
            .and_then(|slots| slots.get_mut(index))
            .ok_or_else(|| Fault::TypeMismatch(format!("{} has no static slot {}", name, index)))
    }

    fn new_object(&mut self, class: TypeId, call_site: Option<SourcePosition>) -> FaultResult<()> {
        if self.ctx.depth() >= self.config.max_call_depth {
            return Err(Fault::StackOverflow(self.config.max_call_depth));
        }
        let id = self.heap.alloc_instance(&self.table, class);
        self.ctx.push(Value::Object(id));

        let Some(mut caller) = self.ctx.current.take() else {
            return Ok(());
        };
        caller.position += 1;
        self.ctx
            .program_stack
            .push(ProgramStackElement::suspended(caller));
        self.schedule_initializers(class, id, CallOrigin::UserCode, call_site);
        // starts the root initializer, or resumes the caller if there is none
        self.resume_next();
        Ok(())
    }

    fn call_method(
        &mut self,
        method: MethodId,
        is_super_call: bool,
        call_site: Option<SourcePosition>,
    ) -> FaultResult<()> {
        let descriptor = self.table.method(method);
        let slots = descriptor.stack_slots();
        let is_static = descriptor.is_static;
        let base = self
            .ctx
            .stack
            .len()
            .checked_sub(slots)
            .ok_or(Fault::StackUnderflow)?;

        let mut target = method;
        if !is_static {
            let receiver = self.ctx.stack[base].clone();
            if receiver.is_null() {
                return Err(Fault::NullPointer(format!(
                    "Cannot invoke \"{}\" because the receiver is null",
                    self.table.signature(method)
                )));
            }
            if !is_super_call {
                target = self.dispatch_target(method, &receiver)?;
            }
        }

        let callee = self.table.method(target);
        let has_return_value = callee.return_type.is_some();
        match callee.body.clone() {
            MethodBody::Native(native) => {
                let arguments = self.ctx.stack.split_off(base);
                let result = native
                    .invoke(&mut self.bridge(), &arguments)
                    .map_err(Fault::Native)?;
                if let (true, Some(value)) = (has_return_value, result) {
                    self.ctx.push(value);
                }
                self.ctx.advance();
                Ok(())
            }
            MethodBody::Interpreted(program) => {
                if self.ctx.depth() >= self.config.max_call_depth {
                    return Err(Fault::StackOverflow(self.config.max_call_depth));
                }
                if let Some(mut caller) = self.ctx.current.take() {
                    caller.position += 1;
                    self.ctx
                        .program_stack
                        .push(ProgramStackElement::suspended(caller));
                }
                let reserved = program.reserved_locals;
                let mut activation = Activation::new(program, CallOrigin::UserCode);
                activation.method = Some(target);
                activation.frame_base = base;
                activation.call_site = call_site;
                self.ctx
                    .stack
                    .resize(self.ctx.stack.len() + reserved, Value::Null);
                self.ctx.current = Some(activation);
                self.enter_activation();
                Ok(())
            }
            MethodBody::Abstract => Err(Fault::AbstractMethod(format!(
                "{}.{}",
                self.table.identifier(callee.declaring_type),
                self.table.signature(target)
            ))),
        }
    }

    fn new_array(&mut self, element_type: TypeId, lengths: &[i64]) -> FaultResult<Value> {
        let (&length, inner) = lengths.split_first().ok_or(Fault::StackUnderflow)?;
        let length = usize::try_from(length).map_err(|_| Fault::NegativeArraySize(length))?;
        if inner.is_empty() {
            let elements = vec![self.table.default_value(element_type); length];
            return Ok(Value::Array(self.heap.alloc_array(element_type, elements)));
        }
        let level_type = nested_array_type(&self.table, element_type, inner.len());
        let mut elements = Vec::with_capacity(length);
        for _ in 0..length {
            elements.push(self.new_array(element_type, inner)?);
        }
        Ok(Value::Array(self.heap.alloc_array(level_type, elements)))
    }

    fn binary(&self, op: BinaryOperator, left: Value, right: Value) -> FaultResult<Value> {
        use BinaryOperator::*;
        match op {
            Add if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) => {
                let view = self.view();
                Ok(Value::String(format!("{}{}", view.display(&left), view.display(&right))))
            }
            And | Or => match (left.as_bool(), right.as_bool()) {
                (Some(a), Some(b)) => Ok(Value::Boolean(if op == And { a && b } else { a || b })),
                _ => Err(operand_mismatch(op, &left, &right)),
            },
            Equal => Ok(Value::Boolean(values_equal(&left, &right))),
            NotEqual => Ok(Value::Boolean(!values_equal(&left, &right))),
            _ => arithmetic(op, &left, &right),
        }
    }
}

fn object_ref(value: &Value, action: &str) -> FaultResult<HeapId> {
    match value {
        Value::Object(id) => Ok(*id),
        Value::Null => Err(Fault::NullPointer(format!(
            "Cannot {} because the object is null",
            action
        ))),
        other => Err(Fault::TypeMismatch(format!(
            "cannot {} of {}",
            action,
            other.type_name()
        ))),
    }
}

fn array_ref(value: &Value, action: &str) -> FaultResult<HeapId> {
    match value {
        Value::Array(id) => Ok(*id),
        Value::Null => Err(Fault::NullPointer(format!(
            "Cannot {} because the array is null",
            action
        ))),
        other => Err(Fault::TypeMismatch(format!(
            "cannot {} of {}",
            action,
            other.type_name()
        ))),
    }
}

fn checked_index(index: &Value, length: usize) -> FaultResult<usize> {
    let index = index
        .as_i64()
        .ok_or_else(|| Fault::TypeMismatch(format!("array index is {}", index.type_name())))?;
    usize::try_from(index)
        .ok()
        .filter(|&i| i < length)
        .ok_or(Fault::IndexOutOfBounds { index, length })
}

/// Array type with `dimensions` levels over `element_type`, or `Object`
/// when such an array type was never interned
fn nested_array_type(table: &TypeTable, element_type: TypeId, dimensions: usize) -> TypeId {
    (0..dimensions)
        .try_fold(element_type, |ty, _| table.find_array(ty))
        .unwrap_or(TypeTable::OBJECT)
}

fn operand_mismatch(op: BinaryOperator, left: &Value, right: &Value) -> Fault {
    Fault::TypeMismatch(format!(
        "bad operand types for {:?}: {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}

fn is_numeric(value: &Value) -> bool {
    matches!(
        value,
        Value::Int(_) | Value::Long(_) | Value::Double(_) | Value::Char(_)
    )
}

/// `==`: numbers compare by value after promotion, everything else by
/// identity (strings by content)
fn values_equal(left: &Value, right: &Value) -> bool {
    if is_numeric(left) && is_numeric(right) {
        if matches!(left, Value::Double(_)) || matches!(right, Value::Double(_)) {
            return left.as_f64() == right.as_f64();
        }
        return left.as_i64() == right.as_i64();
    }
    left == right
}

/// Numeric operators with binary promotion: double beats long beats int;
/// char operands count as int
fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> FaultResult<Value> {
    use BinaryOperator::*;
    if !is_numeric(left) || !is_numeric(right) {
        return Err(operand_mismatch(op, left, right));
    }

    if matches!(left, Value::Double(_)) || matches!(right, Value::Double(_)) {
        let (a, b) = (left.as_f64().unwrap_or(0.0), right.as_f64().unwrap_or(0.0));
        return Ok(match op {
            Add => Value::Double(a + b),
            Sub => Value::Double(a - b),
            Mul => Value::Double(a * b),
            Div => Value::Double(a / b),
            Mod => Value::Double(a % b),
            Less => Value::Boolean(a < b),
            LessOrEqual => Value::Boolean(a <= b),
            Greater => Value::Boolean(a > b),
            GreaterOrEqual => Value::Boolean(a >= b),
            _ => return Err(operand_mismatch(op, left, right)),
        });
    }

    let (a, b) = (left.as_i64().unwrap_or(0), right.as_i64().unwrap_or(0));
    let long = matches!(left, Value::Long(_)) || matches!(right, Value::Long(_));
    // int results keep the low 32 bits, which is Java's wrapping behavior
    let wrap = |n: i64| {
        if long {
            Value::Long(n)
        } else {
            Value::Int(n as i32)
        }
    };
    if matches!(op, Div | Mod) && b == 0 {
        return Err(Fault::DivisionByZero);
    }
    let (a, b) = if long { (a, b) } else { (a as i32 as i64, b as i32 as i64) };
    Ok(match op {
        Add => wrap(a.wrapping_add(b)),
        Sub => wrap(a.wrapping_sub(b)),
        Mul => wrap(a.wrapping_mul(b)),
        Div => wrap(a.wrapping_div(b)),
        Mod => wrap(a.wrapping_rem(b)),
        Less => Value::Boolean(a < b),
        LessOrEqual => Value::Boolean(a <= b),
        Greater => Value::Boolean(a > b),
        GreaterOrEqual => Value::Boolean(a >= b),
        _ => return Err(operand_mismatch(op, left, right)),
    })
}

fn unary(op: UnaryOperator, operand: Value) -> FaultResult<Value> {
    match (op, &operand) {
        (UnaryOperator::Negate, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (UnaryOperator::Negate, Value::Long(n)) => Ok(Value::Long(n.wrapping_neg())),
        (UnaryOperator::Negate, Value::Double(n)) => Ok(Value::Double(-n)),
        (UnaryOperator::Negate, Value::Char(c)) => Ok(Value::Int(-(*c as i32))),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        _ => Err(Fault::TypeMismatch(format!(
            "bad operand type {} for {:?}",
            operand.type_name(),
            op
        ))),
    }
}

/// Numeric conversions; `(String)` is handled by the VM since it needs the
/// heap
fn primitive_cast(cast: PrimitiveCast, operand: Value) -> FaultResult<Value> {
    let mismatch = || {
        Fault::TypeMismatch(format!(
            "cannot convert {} with {:?}",
            operand.type_name(),
            cast
        ))
    };
    Ok(match (cast, &operand) {
        (PrimitiveCast::ToInt, Value::Double(d)) => Value::Int(*d as i32),
        (PrimitiveCast::ToInt, v) => Value::Int(v.as_i64().ok_or_else(mismatch)? as i32),
        (PrimitiveCast::ToLong, Value::Double(d)) => Value::Long(*d as i64),
        (PrimitiveCast::ToLong, v) => Value::Long(v.as_i64().ok_or_else(mismatch)?),
        (PrimitiveCast::ToDouble, v) => Value::Double(v.as_f64().ok_or_else(mismatch)?),
        (PrimitiveCast::ToChar, v) => {
            let code = v.as_f64().ok_or_else(mismatch)? as i64 as u32 & 0xFFFF;
            Value::Char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
        }
        (PrimitiveCast::ToString, v) => Value::String(v.to_string()),
    })
}
