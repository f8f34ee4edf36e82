//! Statement kinds executed by the engine
//!
//! Defines the instruction set of the stack machine. Local slots are
//! addressed relative to the current stack frame base; slot 0 holds the
//! receiver for instance methods and initializers.

use core_types::{MethodId, TypeId, Value};
use serde::{Deserialize, Serialize};

/// Binary operators; both operands are popped, the result pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// Numeric addition or string concatenation
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division (integer division for integral operands)
    Div,
    /// Remainder
    Mod,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `==` (reference equality for objects)
    Equal,
    /// `!=`
    NotEqual,
    /// Non short-circuit `&&` on two evaluated booleans
    And,
    /// Non short-circuit `||` on two evaluated booleans
    Or,
}

/// Unary operators; the operand is popped, the result pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Arithmetic negation
    Negate,
    /// Logical not
    Not,
}

/// Explicit primitive conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveCast {
    /// `(int)`
    ToInt,
    /// `(long)`
    ToLong,
    /// `(double)`
    ToDouble,
    /// `(char)`
    ToChar,
    /// String conversion
    ToString,
}

/// The instruction set of the stack machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    // Stack
    /// Push a literal
    PushConstant(Value),
    /// Discard the top of stack
    Pop,
    /// Duplicate the top of stack
    Duplicate,

    // Local variables
    /// Push the local at the given frame offset
    LoadLocal(usize),
    /// Pop into the local at the given frame offset
    StoreLocal {
        /// Frame offset
        offset: usize,
        /// Push the stored value back
        leave_value: bool,
    },

    // Attributes
    /// Pop an object, push its attribute slot
    LoadAttribute {
        /// Slot index (see `Attribute::index`)
        index: usize,
    },
    /// Pop a value and an object, store the value into the object's slot
    StoreAttribute {
        /// Slot index
        index: usize,
        /// Push the stored value back
        leave_value: bool,
    },
    /// Push a static attribute slot of a class
    LoadStaticAttribute {
        /// The class (not its static twin)
        class: TypeId,
        /// Static slot index
        index: usize,
    },
    /// Pop a value into a static attribute slot
    StoreStaticAttribute {
        /// The class (not its static twin)
        class: TypeId,
        /// Static slot index
        index: usize,
        /// Push the stored value back
        leave_value: bool,
    },

    // Operators
    /// Binary operator
    Binary(BinaryOperator),
    /// Unary operator
    Unary(UnaryOperator),
    /// Primitive conversion of the top of stack
    Cast(PrimitiveCast),
    /// Reference cast; faults if the top of stack is not assignable to `target`
    CheckCast {
        /// Target reference type
        target: TypeId,
    },
    /// Pop a reference, push whether it is an instance of `target`
    InstanceOf {
        /// Target reference type
        target: TypeId,
    },

    // Control flow
    /// Unconditional jump to an absolute statement index
    Jump(usize),
    /// Pop a boolean and jump if it is false
    JumpIfFalse(usize),
    /// Pop a boolean and jump if it is true
    JumpIfTrue(usize),

    // Objects and calls
    /// Allocate an instance of `class`, push it, and schedule attribute initializers
    NewObject {
        /// Class to instantiate
        class: TypeId,
    },
    /// Call a method; receiver (if not static) and arguments are on the stack
    CallMethod {
        /// Statically resolved method
        method: MethodId,
        /// `super.m()` calls bypass virtual dispatch
        is_super_call: bool,
    },
    /// Return from the current method
    Return {
        /// Pop one return value and push it onto the caller's stack
        copy_return_value: bool,
        /// Push the receiver onto the caller's stack (constructors)
        leave_this_object: bool,
    },

    // Arrays
    /// Pop `dimensions` lengths (outermost first) and push a new array
    NewArray {
        /// Type of the innermost elements
        element_type: TypeId,
        /// Number of dimensions
        dimensions: usize,
    },
    /// Pop index and array, push the element
    LoadArrayElement,
    /// Pop value, index and array, store the element
    StoreArrayElement {
        /// Push the stored value back
        leave_value: bool,
    },
    /// Pop an array, push its length
    ArrayLength,

    // Enums
    /// Push an enum constant from the ordinal-indexed values array
    LoadEnumConstant {
        /// The enum type
        enum_type: TypeId,
        /// Ordinal of the constant
        ordinal: usize,
    },

    // Host interaction
    /// Write to the console through the host
    Print {
        /// Append a line break
        newline: bool,
        /// Pop a value to print; otherwise prints nothing but the line break
        with_value: bool,
    },
    /// Ask the host for input and suspend until it is supplied
    ReadInput {
        /// Prompt shown to the user
        prompt: String,
    },
    /// Pop `arguments` values, hand them to the host and suspend until the
    /// external (database or network) operation resolves
    ExternalCall {
        /// Number of arguments on the stack
        arguments: usize,
        /// Whether the resolution pushes a value
        has_result: bool,
    },
}

impl StatementKind {
    /// Whether this statement sets the program position itself
    pub fn is_control_transfer(&self) -> bool {
        matches!(
            self,
            StatementKind::Jump(_)
                | StatementKind::JumpIfFalse(_)
                | StatementKind::JumpIfTrue(_)
                | StatementKind::NewObject { .. }
                | StatementKind::CallMethod { .. }
                | StatementKind::Return { .. }
        )
    }

    /// Jump target, if this is a jump
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            StatementKind::Jump(t) | StatementKind::JumpIfFalse(t) | StatementKind::JumpIfTrue(t) => {
                Some(*t)
            }
            _ => None,
        }
    }
}
