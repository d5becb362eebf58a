// langur-vm - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared helpers for the compiler and VM integration tests.
//!
//! In a test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

pub use langur_core::chunk::{make, Bytecode, Instructions};
pub use langur_core::opcode::Op;
pub use langur_core::value::{HashPair, Object};
pub use langur_vm::{CompileError, Compiler, RuntimeError, VM};

use langur_parser::ast::Program;

/// Parse source, panicking on parse errors.
pub fn parse_program(source: &str) -> Program {
    langur_parser::parse(source)
        .unwrap_or_else(|errors| panic!("parse errors in {:?}: {:?}", source, errors))
}

/// Compile source to bytecode, panicking on any error.
pub fn compile_source(source: &str) -> Bytecode {
    let program = parse_program(source);
    let mut compiler = Compiler::new();
    compiler
        .compile(&program)
        .unwrap_or_else(|e| panic!("compile error in {:?}: {}", source, e));
    compiler.bytecode()
}

/// Compile source expecting a compile error.
pub fn compile_error(source: &str) -> CompileError {
    let program = parse_program(source);
    let mut compiler = Compiler::new();
    match compiler.compile(&program) {
        Ok(()) => panic!("expected compile error for {:?}", source),
        Err(e) => e,
    }
}

/// Compile and run source, returning the last popped stack item.
pub fn run_source(source: &str) -> Object {
    let mut vm = VM::new(compile_source(source));
    vm.run()
        .unwrap_or_else(|e| panic!("runtime error in {:?}: {}", source, e));
    vm.last_popped_stack_item()
}

/// Compile and run source expecting a runtime error.
pub fn runtime_error(source: &str) -> RuntimeError {
    let mut vm = VM::new(compile_source(source));
    match vm.run() {
        Ok(()) => panic!("expected runtime error for {:?}", source),
        Err(e) => e,
    }
}

/// Concatenate encoded instructions into one stream.
pub fn concat_instructions(parts: Vec<Vec<u8>>) -> Instructions {
    Instructions(parts.concat())
}

/// Assert that compiled instructions match, with a disassembly diff on
/// failure.
pub fn assert_instructions(actual: &Instructions, expected: &Instructions, source: &str) {
    assert_eq!(
        actual, expected,
        "wrong instructions for {:?}\nwant:\n{}got:\n{}",
        source, expected, actual
    );
}

/// Build an expected hash object from key/value pairs.
pub fn hash_of(pairs: Vec<(Object, Object)>) -> Object {
    let mut map = im::OrdMap::new();
    for (key, value) in pairs {
        let hash_key = key.hash_key().expect("hashable key");
        map.insert(hash_key, HashPair { key, value });
    }
    Object::Hash(map)
}
