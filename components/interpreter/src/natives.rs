//! Runtime services for native methods.
//!
//! [`HeapView`] answers read-only questions about runtime values (class
//! names, enum constants, string conversion); [`NativeBridge`] adds the
//! host and heap mutation and implements [`NativeContext`].

use crate::heap::{Heap, HeapEntry};
use crate::host::Host;
use core_types::{HeapId, TypeId, Value};
use rustc_hash::FxHashMap;
use serde_json::{Map, Number, Value as Json};
use type_model::{NativeContext, PrimitiveKind, TypeKind, TypeTable};

const MAX_JSON_DEPTH: usize = 64;

/// Read-only view of the heap together with the type information needed
/// to interpret it
#[derive(Clone, Copy)]
pub struct HeapView<'a> {
    /// Type table
    pub table: &'a TypeTable,
    /// Heap
    pub heap: &'a Heap,
    /// Ordinal-indexed constant arrays per enum
    pub enum_values: &'a FxHashMap<TypeId, HeapId>,
}

impl<'a> HeapView<'a> {
    /// Runtime type of a value; `None` for null and for arrays whose type
    /// was never interned
    pub fn runtime_type(&self, value: &Value) -> Result<Option<TypeId>, String> {
        Ok(match value {
            Value::Null => None,
            Value::Boolean(_) => Some(TypeTable::BOOLEAN),
            Value::Int(_) => Some(TypeTable::INT),
            Value::Long(_) => Some(TypeTable::LONG),
            Value::Double(_) => Some(TypeTable::DOUBLE),
            Value::Char(_) => Some(TypeTable::CHAR),
            Value::String(_) => Some(TypeTable::STRING),
            Value::Object(id) => Some(self.heap.object(*id).map_err(|f| f.to_string())?.class),
            Value::Array(id) => {
                let element = self.heap.array(*id).map_err(|f| f.to_string())?.element_type;
                self.table.find_array(element)
            }
        })
    }

    /// Display name of the runtime class of a value
    pub fn class_name(&self, value: &Value) -> Result<String, String> {
        match value {
            Value::Object(id) => {
                let class = self.heap.object(*id).map_err(|f| f.to_string())?.class;
                Ok(self.table.identifier(class).to_string())
            }
            Value::Array(id) => {
                let element = self.heap.array(*id).map_err(|f| f.to_string())?.element_type;
                Ok(format!("{}[]", self.table.identifier(element)))
            }
            other => Ok(other.type_name().to_string()),
        }
    }

    /// Name and ordinal, if `id` is an enum constant
    pub fn enum_constant(&self, id: HeapId) -> Option<(String, usize)> {
        let class = self.heap.object(id).ok()?.class;
        let info = self.table.get(class).as_klass()?.enum_info.as_ref()?;
        let values = self.heap.array(*self.enum_values.get(&class)?).ok()?;
        let ordinal = values
            .elements
            .iter()
            .position(|v| *v == Value::Object(id))?;
        let name = info.constants.get(ordinal)?.identifier.clone();
        Some((name, ordinal))
    }

    /// String conversion used by `print`, concatenation and `(String)` casts.
    ///
    /// Enum constants show their name, other objects `Class@id`.
    pub fn display(&self, value: &Value) -> String {
        match value {
            Value::Object(id) => match self.enum_constant(*id) {
                Some((name, _)) => name,
                None => format!("{}@{}", self.class_name(value).unwrap_or_default(), id.0),
            },
            Value::Array(id) => format!("{}@{}", self.class_name(value).unwrap_or_default(), id.0),
            other => other.to_string(),
        }
    }

    fn to_json(&self, value: &Value, depth: usize) -> Result<Json, String> {
        if depth > MAX_JSON_DEPTH {
            return Err("toJson: object graph is too deep or cyclic".to_string());
        }
        Ok(match value {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Long(n) => Json::from(*n),
            Value::Double(d) => Number::from_f64(*d).map_or(Json::Null, Json::Number),
            Value::Char(c) => Json::String(c.to_string()),
            Value::String(s) => Json::String(s.clone()),
            Value::Object(id) => {
                if let Some((name, _)) = self.enum_constant(*id) {
                    return Ok(Json::String(name));
                }
                let object = self.heap.object(*id).map_err(|f| f.to_string())?;
                let mut map = Map::new();
                for attribute in self.table.all_attributes(object.class) {
                    let attribute = self.table.attribute(attribute);
                    if attribute.is_transient {
                        continue;
                    }
                    let slot = attribute
                        .index
                        .and_then(|i| object.slots.get(i))
                        .unwrap_or(&Value::Null);
                    map.insert(attribute.identifier.clone(), self.to_json(slot, depth + 1)?);
                }
                Json::Object(map)
            }
            Value::Array(id) => {
                let array = self.heap.array(*id).map_err(|f| f.to_string())?;
                Json::Array(
                    array
                        .elements
                        .iter()
                        .map(|e| self.to_json(e, depth + 1))
                        .collect::<Result<_, _>>()?,
                )
            }
        })
    }
}

/// [`NativeContext`] implementation handed to native method bodies
pub struct NativeBridge<'a> {
    /// Type table
    pub table: &'a TypeTable,
    /// Heap
    pub heap: &'a mut Heap,
    /// Host for console output
    pub host: &'a mut dyn Host,
    /// Ordinal-indexed constant arrays per enum
    pub enum_values: &'a FxHashMap<TypeId, HeapId>,
}

impl<'a> NativeBridge<'a> {
    fn view(&self) -> HeapView<'_> {
        HeapView {
            table: self.table,
            heap: &*self.heap,
            enum_values: self.enum_values,
        }
    }

    fn object_id(value: &Value) -> Result<HeapId, String> {
        match value {
            Value::Object(id) => Ok(*id),
            Value::Null => Err("NullPointerException: receiver is null".to_string()),
            other => Err(format!("expected an object, found {}", other.type_name())),
        }
    }

    fn from_json(&mut self, json: &Json, ty: TypeId, depth: usize) -> Result<Value, String> {
        if depth > MAX_JSON_DEPTH {
            return Err("fromJson: document is nested too deeply".to_string());
        }
        let table = self.table;
        let mismatch = || format!("fromJson: cannot convert {} to {}", json, table.identifier(ty));
        if json.is_null() {
            return Ok(table.default_value(ty));
        }
        match &table.get(ty).kind {
            TypeKind::Primitive(kind) => match kind {
                PrimitiveKind::Boolean => json.as_bool().map(Value::Boolean).ok_or_else(mismatch),
                PrimitiveKind::Int => json
                    .as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .map(Value::Int)
                    .ok_or_else(mismatch),
                PrimitiveKind::Long => json.as_i64().map(Value::Long).ok_or_else(mismatch),
                PrimitiveKind::Double => json.as_f64().map(Value::Double).ok_or_else(mismatch),
                PrimitiveKind::Char => json
                    .as_str()
                    .and_then(|s| s.chars().next())
                    .map(Value::Char)
                    .ok_or_else(mismatch),
                PrimitiveKind::String => json
                    .as_str()
                    .map(|s| Value::String(s.to_string()))
                    .ok_or_else(mismatch),
                PrimitiveKind::Void | PrimitiveKind::Null => Err(mismatch()),
            },
            TypeKind::Enum(klass) => {
                let name = json.as_str().ok_or_else(mismatch)?;
                let ordinal = klass
                    .enum_info
                    .as_ref()
                    .and_then(|info| info.constants.iter().position(|c| c.identifier == name))
                    .ok_or_else(mismatch)?;
                let values = self.enum_values.get(&ty).ok_or_else(mismatch)?;
                let array = self.heap.array(*values).map_err(|f| f.to_string())?;
                array.elements.get(ordinal).cloned().ok_or_else(mismatch)
            }
            TypeKind::Klass(_) => {
                let fields = json.as_object().ok_or_else(mismatch)?;
                self.object_from_map(ty, fields, depth)
            }
            TypeKind::Array(array) => {
                let element_type = array.element;
                let items = json.as_array().ok_or_else(mismatch)?;
                let elements = items
                    .iter()
                    .map(|item| self.from_json(item, element_type, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(self.heap.alloc_array(element_type, elements)))
            }
            _ => Err(mismatch()),
        }
    }

    fn object_from_map(
        &mut self,
        class: TypeId,
        fields: &Map<String, Json>,
        depth: usize,
    ) -> Result<Value, String> {
        let table = self.table;
        let id = self.heap.alloc_instance(table, class);
        for attribute in table.all_attributes(class) {
            let attribute = table.attribute(attribute);
            let (Some(index), Some(json)) = (attribute.index, fields.get(&attribute.identifier))
            else {
                continue;
            };
            if attribute.is_transient {
                continue;
            }
            let value = self.from_json(json, attribute.type_id, depth + 1)?;
            if let Some(slot) = self
                .heap
                .object_mut(id)
                .map_err(|f| f.to_string())?
                .slots
                .get_mut(index)
            {
                *slot = value;
            }
        }
        Ok(Value::Object(id))
    }
}

impl<'a> NativeContext for NativeBridge<'a> {
    fn print(&mut self, text: &str, newline: bool) {
        self.host.print(text, newline);
    }

    fn attribute(&self, object: &Value, index: usize) -> Result<Value, String> {
        let id = Self::object_id(object)?;
        let object = self.heap.object(id).map_err(|f| f.to_string())?;
        object
            .slots
            .get(index)
            .cloned()
            .ok_or_else(|| format!("no attribute slot {}", index))
    }

    fn set_attribute(&mut self, object: &Value, index: usize, value: Value) -> Result<(), String> {
        let id = Self::object_id(object)?;
        let object = self.heap.object_mut(id).map_err(|f| f.to_string())?;
        let slot = object
            .slots
            .get_mut(index)
            .ok_or_else(|| format!("no attribute slot {}", index))?;
        *slot = value;
        Ok(())
    }

    fn class_name(&self, object: &Value) -> Result<String, String> {
        self.view().class_name(object)
    }

    fn enum_constant(&self, object: &Value) -> Result<(String, usize), String> {
        let id = Self::object_id(object)?;
        self.view()
            .enum_constant(id)
            .ok_or_else(|| "not an enum constant".to_string())
    }

    fn enum_values(&mut self, enum_type: TypeId) -> Result<Value, String> {
        let values = self
            .enum_values
            .get(&enum_type)
            .ok_or_else(|| format!("{} is not an enum", self.table.identifier(enum_type)))?;
        let elements = match self.heap.get(*values).map_err(|f| f.to_string())? {
            HeapEntry::Array(array) => array.elements.clone(),
            HeapEntry::Object(_) => return Err("corrupt enum values".to_string()),
        };
        Ok(Value::Array(self.heap.alloc_array(enum_type, elements)))
    }

    fn object_to_json(&self, object: &Value) -> Result<String, String> {
        Self::object_id(object)?;
        let json = self.view().to_json(object, 0)?;
        serde_json::to_string(&json).map_err(|e| e.to_string())
    }

    fn object_from_json(&mut self, class: TypeId, json: &str) -> Result<Value, String> {
        let document: Json =
            serde_json::from_str(json).map_err(|e| format!("fromJson: {}", e))?;
        let fields = document
            .as_object()
            .ok_or_else(|| "fromJson: expected a JSON object".to_string())?;
        self.object_from_map(class, fields, 0)
    }
}
