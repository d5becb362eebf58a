// langur-vm - Error path tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

mod common;

use common::*;

#[test]
fn test_undefined_variable_is_a_compile_error() {
    let cases = [
        ("foobar", "undefined variable foobar"),
        ("let a = 1; b", "undefined variable b"),
        ("fn(x) { y }", "undefined variable y"),
        // A function parameter is not visible outside the function
        ("fn(x) { x }; x", "undefined variable x"),
    ];
    for (source, expected) in cases {
        assert_eq!(
            compile_error(source).to_string(),
            expected,
            "source: {}",
            source
        );
    }
}

#[test]
fn test_order_comparison_operators_without_opcodes() {
    // `<=` and `>=` parse but have no bytecode counterpart
    assert_eq!(
        compile_error("1 <= 2").to_string(),
        "unknown operator <="
    );
    assert_eq!(
        compile_error("1 >= 2").to_string(),
        "unknown operator >="
    );
}

#[test]
fn test_binary_type_mismatches() {
    let cases = [
        (
            "1 + true;",
            "unsupported types for binary operation: INTEGER BOOLEAN",
        ),
        (
            "true + false;",
            "unsupported types for binary operation: BOOLEAN BOOLEAN",
        ),
        (
            "5; true + false; 5",
            "unsupported types for binary operation: BOOLEAN BOOLEAN",
        ),
        (
            "if (10 > 1) { true + false; }",
            "unsupported types for binary operation: BOOLEAN BOOLEAN",
        ),
        (
            r#""str" + 1"#,
            "unsupported types for binary operation: STRING INTEGER",
        ),
    ];
    for (source, expected) in cases {
        assert_eq!(
            runtime_error(source).to_string(),
            expected,
            "source: {}",
            source
        );
    }
}

#[test]
fn test_string_operations_other_than_concat() {
    assert_eq!(
        runtime_error(r#""a" - "b""#).to_string(),
        "unknown string operator: OpSub"
    );
    assert_eq!(
        runtime_error(r#""a" > "b""#).to_string(),
        "unknown operator: OpGreaterThan (STRING STRING)"
    );
}

#[test]
fn test_negation_of_non_integers() {
    assert_eq!(
        runtime_error("-true").to_string(),
        "unsupported type for negation: BOOLEAN"
    );
    assert_eq!(
        runtime_error(r#"-"str""#).to_string(),
        "unsupported type for negation: STRING"
    );
}

#[test]
fn test_calling_non_functions() {
    let cases = ["5();", "false();", r#""str"();"#, "let x = 1; x();"];
    for source in cases {
        assert_eq!(
            runtime_error(source).to_string(),
            "calling non-function",
            "source: {}",
            source
        );
    }
}

#[test]
fn test_wrong_number_of_arguments() {
    let cases = [
        ("fn() { 1; }(1);", "wrong number of arguments: want=0, got=1"),
        ("fn(a) { a; }();", "wrong number of arguments: want=1, got=0"),
        (
            "fn(a, b) { a + b; }(1);",
            "wrong number of arguments: want=2, got=1",
        ),
        (
            "let f = fn(a, b) { a + b }; f(1);",
            "wrong number of arguments: want=2, got=1",
        ),
    ];
    for (source, expected) in cases {
        assert_eq!(
            runtime_error(source).to_string(),
            expected,
            "source: {}",
            source
        );
    }
}

#[test]
fn test_unusable_hash_keys() {
    // As a literal key
    assert_eq!(
        runtime_error("{[1]: 2}").to_string(),
        "unusable as hash key: ARRAY"
    );
    // As an index
    assert_eq!(
        runtime_error("{1: 1}[fn() { }]").to_string(),
        "unusable as hash key: FUNCTION"
    );
    assert_eq!(
        runtime_error("{1: 1}[[]]").to_string(),
        "unusable as hash key: ARRAY"
    );
}

#[test]
fn test_index_on_unindexable_types() {
    assert_eq!(
        runtime_error("5[0]").to_string(),
        "index operator not supported: INTEGER"
    );
    assert_eq!(
        runtime_error(r#""str"[0]"#).to_string(),
        "index operator not supported: STRING"
    );
}

#[test]
fn test_out_of_bounds_indexing_is_null_not_an_error() {
    assert_eq!(run_source("[1, 2, 3][99]"), Object::Null);
    assert_eq!(run_source("[1, 2, 3][-1]"), Object::Null);
    assert_eq!(run_source("{}[99]"), Object::Null);
}

#[test]
fn test_unbounded_recursion_overflows_the_frame_stack() {
    assert_eq!(
        runtime_error("let f = fn() { f(); }; f();").to_string(),
        "frames overflow"
    );
}

#[test]
fn test_deep_stack_overflows() {
    // An array literal wide enough to exhaust the value stack
    let elements: Vec<String> = (0..2100).map(|i| i.to_string()).collect();
    let source = format!("[{}]", elements.join(", "));
    let program = langur_parser::parse(&source).expect("parse error");
    let mut compiler = Compiler::new();
    compiler.compile(&program).expect("compile error");
    let mut vm = VM::new(compiler.bytecode());
    assert_eq!(vm.run().unwrap_err().to_string(), "stack overflow");
}
