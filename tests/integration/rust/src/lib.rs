//! Integration test suite for the Corten VM
//!
//! This crate provides integration tests that verify components work
//! together across component boundaries: declarations go through the
//! resolver, and the resulting type table drives the interpreter.

/// Re-export components for test convenience
pub mod components {
    pub use bytecode_system;
    pub use core_types;
    pub use engine_cli;
    pub use interpreter;
    pub use resolver;
    pub use scheduler;
    pub use type_model;
}
