// langur-core - Object model, bytecode, and builtins for the Langur programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The shared substrate of the Langur pipeline: the runtime value
//! universe, the bytecode instruction codec, and the builtin function
//! registry. Both the compiler and the VM in `langur-vm` build on this
//! crate.

pub mod builtins;
pub mod chunk;
pub mod opcode;
pub mod value;

pub use builtins::{builtin, BUILTINS};
pub use chunk::{make, read_operands, read_u16, read_u8, Bytecode, Instructions};
pub use opcode::Op;
pub use value::{
    Builtin, BuiltinFunction, Closure, CompiledFunction, HashKey, HashPair, HashTag, Object,
};
