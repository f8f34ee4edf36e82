//! Object and array storage.
//!
//! There is no collector: a heap lives for one run and is discarded when the
//! engine is stopped or restarted.

use crate::error::{Fault, FaultResult};
use core_types::{HeapId, TypeId, Value};
use type_model::TypeTable;

/// A class instance
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeObject {
    /// Runtime class
    pub class: TypeId,
    /// Attribute slots, indexed by `Attribute::index`
    pub slots: Vec<Value>,
}

/// An array instance
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeArray {
    /// Declared element type
    pub element_type: TypeId,
    /// Elements
    pub elements: Vec<Value>,
}

/// A heap cell
#[derive(Debug, Clone, PartialEq)]
pub enum HeapEntry {
    /// Class instance
    Object(RuntimeObject),
    /// Array
    Array(RuntimeArray),
}

/// Arena of runtime objects addressed by [`HeapId`]
#[derive(Debug, Default)]
pub struct Heap {
    entries: Vec<HeapEntry>,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an instance with the given slots
    pub fn alloc_object(&mut self, class: TypeId, slots: Vec<Value>) -> HeapId {
        self.push(HeapEntry::Object(RuntimeObject { class, slots }))
    }

    /// Allocate an instance of `class` with every slot at its type's default
    pub fn alloc_instance(&mut self, table: &TypeTable, class: TypeId) -> HeapId {
        let mut slots = vec![Value::Null; table.number_of_attributes_including_base_class(class)];
        for attribute in table.all_attributes(class) {
            let attribute = table.attribute(attribute);
            if let Some(slot) = attribute.index.and_then(|i| slots.get_mut(i)) {
                *slot = table.default_value(attribute.type_id);
            }
        }
        self.alloc_object(class, slots)
    }

    /// Allocate an array
    pub fn alloc_array(&mut self, element_type: TypeId, elements: Vec<Value>) -> HeapId {
        self.push(HeapEntry::Array(RuntimeArray {
            element_type,
            elements,
        }))
    }

    fn push(&mut self, entry: HeapEntry) -> HeapId {
        let id = HeapId(self.entries.len());
        self.entries.push(entry);
        id
    }

    /// Look up a heap cell
    pub fn get(&self, id: HeapId) -> FaultResult<&HeapEntry> {
        self.entries.get(id.0).ok_or(Fault::InvalidReference(id))
    }

    /// Instance behind `id`
    pub fn object(&self, id: HeapId) -> FaultResult<&RuntimeObject> {
        match self.get(id)? {
            HeapEntry::Object(o) => Ok(o),
            HeapEntry::Array(_) => Err(Fault::TypeMismatch(format!("{} is an array", id))),
        }
    }

    /// Mutable instance behind `id`
    pub fn object_mut(&mut self, id: HeapId) -> FaultResult<&mut RuntimeObject> {
        match self.entries.get_mut(id.0) {
            Some(HeapEntry::Object(o)) => Ok(o),
            Some(HeapEntry::Array(_)) => Err(Fault::TypeMismatch(format!("{} is an array", id))),
            None => Err(Fault::InvalidReference(id)),
        }
    }

    /// Array behind `id`
    pub fn array(&self, id: HeapId) -> FaultResult<&RuntimeArray> {
        match self.get(id)? {
            HeapEntry::Array(a) => Ok(a),
            HeapEntry::Object(_) => Err(Fault::TypeMismatch(format!("{} is not an array", id))),
        }
    }

    /// Mutable array behind `id`
    pub fn array_mut(&mut self, id: HeapId) -> FaultResult<&mut RuntimeArray> {
        match self.entries.get_mut(id.0) {
            Some(HeapEntry::Array(a)) => Ok(a),
            Some(HeapEntry::Object(_)) => {
                Err(Fault::TypeMismatch(format!("{} is not an array", id)))
            }
            None => Err(Fault::InvalidReference(id)),
        }
    }

    /// Number of allocated cells
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was allocated
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cell
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
