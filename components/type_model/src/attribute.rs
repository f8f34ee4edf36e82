//! Attribute (field) descriptors

use crate::types::Visibility;
use core_types::{AttributeId, SourcePosition, TypeId};

/// Attribute descriptor.
///
/// `index` is the slot in the runtime object (or in the static twin's slot
/// array for static attributes). Base-class attributes precede derived-class
/// attributes; the index is assigned once by
/// [`TypeTable::setup_attribute_indices`](crate::TypeTable::setup_attribute_indices).
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute name
    pub identifier: String,
    /// Declared type
    pub type_id: TypeId,
    /// Declaring class (not the static twin)
    pub declaring_type: TypeId,
    /// Declared visibility
    pub visibility: Visibility,
    /// `static`
    pub is_static: bool,
    /// `transient`, skipped by JSON serialization
    pub is_transient: bool,
    /// `final`
    pub is_final: bool,
    /// Slot index, once assigned
    pub index: Option<usize>,
    /// Declaration position
    pub position: Option<SourcePosition>,
    /// Attribute this one was substituted from in a generic variant
    pub is_generic_variant_from: Option<AttributeId>,
}

impl Attribute {
    /// A public, non-static, mutable attribute
    pub fn new(identifier: impl Into<String>, type_id: TypeId, declaring_type: TypeId) -> Self {
        Self {
            identifier: identifier.into(),
            type_id,
            declaring_type,
            visibility: Visibility::Public,
            is_static: false,
            is_transient: false,
            is_final: false,
            index: None,
            position: None,
            is_generic_variant_from: None,
        }
    }
}
