//! Arena handles for types, methods, attributes and modules.
//!
//! The type model stores every descriptor in a flat arena; these handles are
//! indices into it. They are `Copy` and compare in O(1), which lets cyclic
//! structures (a class and its static twin, generic variants and their
//! canonical declaration) reference each other without shared ownership.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a handle from a raw arena index
            pub fn new(index: usize) -> Self {
                Self(index as u32)
            }

            /// Raw arena index
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Handle of a type descriptor in the type table.
    TypeId,
    "Type"
);
arena_id!(
    /// Handle of a method descriptor.
    MethodId,
    "Method"
);
arena_id!(
    /// Handle of an attribute descriptor.
    AttributeId,
    "Attribute"
);
arena_id!(
    /// Handle of a loaded compilation unit.
    ModuleId,
    "Module"
);
