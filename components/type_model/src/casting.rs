//! Implicit conversion rules and per-type default values

use crate::type_table::TypeTable;
use crate::types::{PrimitiveKind, TypeKind};
use core_types::{TypeId, Value};

impl TypeTable {
    /// Whether a value of type `from` may be used where `to` is expected
    /// without an explicit cast.
    ///
    /// A generic variant and its raw canonical declaration are treated as
    /// interchangeable in both directions.
    pub fn can_cast_to(&self, from: TypeId, to: TypeId) -> bool {
        if from == to || self.same_generic_family(from, to) {
            return true;
        }
        let to_kind = &self.get(to).kind;
        match &self.get(from).kind {
            TypeKind::Primitive(PrimitiveKind::Null) => {
                self.get(to).is_reference() || to == Self::STRING
            }
            TypeKind::Primitive(PrimitiveKind::Void) => false,
            TypeKind::Primitive(p) => match to_kind {
                TypeKind::Primitive(q) => p.widens_to(*q),
                _ => false,
            },
            TypeKind::Klass(_) | TypeKind::Enum(_) => match to_kind {
                TypeKind::Primitive(PrimitiveKind::String) => true,
                TypeKind::Klass(_) | TypeKind::Enum(_) => self.is_subclass_of(from, to),
                TypeKind::Interface(_) => self.implements_interface(from, to),
                _ => false,
            },
            TypeKind::Interface(_) => match to_kind {
                TypeKind::Primitive(PrimitiveKind::String) => true,
                TypeKind::Interface(_) => self.implements_interface(from, to),
                _ => to == Self::OBJECT,
            },
            TypeKind::Array(a) => match to_kind {
                TypeKind::Primitive(PrimitiveKind::String) => true,
                TypeKind::Array(b) => {
                    a.element == b.element
                        || (self.get(a.element).is_reference()
                            && self.can_cast_to(a.element, b.element))
                }
                _ => to == Self::OBJECT,
            },
            TypeKind::TypeParameter(p) => {
                to == Self::STRING
                    || self.can_cast_to(p.bound_class, to)
                    || p.bound_interfaces.iter().any(|&i| self.can_cast_to(i, to))
            }
            TypeKind::StaticClass(_) => false,
        }
    }

    /// Whether `to` is `from` or one of its base classes
    pub fn is_subclass_of(&self, from: TypeId, to: TypeId) -> bool {
        self.class_chain(from)
            .into_iter()
            .any(|c| c == to || self.same_generic_family(c, to))
    }

    /// Whether `from` implements (or extends) interface `to`, transitively
    pub fn implements_interface(&self, from: TypeId, to: TypeId) -> bool {
        self.all_interfaces(from)
            .into_iter()
            .any(|i| i == to || self.same_generic_family(i, to))
    }

    fn same_generic_family(&self, a: TypeId, b: TypeId) -> bool {
        self.get(a).generic_origin() == Some(b) || self.get(b).generic_origin() == Some(a)
    }

    /// Initial value of an uninitialized slot of type `ty`
    pub fn default_value(&self, ty: TypeId) -> Value {
        match self.get(ty).as_primitive() {
            Some(PrimitiveKind::Int) => Value::Int(0),
            Some(PrimitiveKind::Long) => Value::Long(0),
            Some(PrimitiveKind::Double) => Value::Double(0.0),
            Some(PrimitiveKind::Boolean) => Value::Boolean(false),
            Some(PrimitiveKind::Char) => Value::Char('\0'),
            _ => Value::Null,
        }
    }
}
