// langur-vm - Bytecode compiler and virtual machine for the Langur programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler and stack-based virtual machine for Langur.
//!
//! Source is parsed by `langur-parser`, compiled here to the bytecode
//! defined in `langur-core`, and executed by the [`VM`]. The compiler and
//! VM can share state across runs (symbol table, constants, globals),
//! which is how the REPL keeps bindings alive between inputs.

pub mod compiler;
pub mod symbol_table;
pub mod vm;

pub use compiler::{CompileError, Compiler};
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
pub use vm::{new_globals_store, GlobalsStore, RuntimeError, VM};
