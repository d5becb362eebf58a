// langur-core - Built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Built-in functions for Langur.
//!
//! The compiler registers these names in its symbol table by their position
//! in [`BUILTINS`]; the VM fetches them back through `OpGetBuiltin` with the
//! same index, so the order here is part of the bytecode contract.
//!
//! Builtins report failure by returning an [`Object::Error`]; the value
//! travels the stack like any other and is only fatal if the host surfaces
//! it.

use crate::value::{Builtin, Object};

/// The builtin registry, in index order.
pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "len",
        func: builtin_len,
    },
    Builtin {
        name: "first",
        func: builtin_first,
    },
    Builtin {
        name: "rest",
        func: builtin_rest,
    },
    Builtin {
        name: "last",
        func: builtin_last,
    },
    Builtin {
        name: "push",
        func: builtin_push,
    },
    Builtin {
        name: "puts",
        func: builtin_puts,
    },
];

/// Look up a builtin by name.
pub fn builtin(name: &str) -> Option<Builtin> {
    BUILTINS.iter().find(|b| b.name == name).copied()
}

fn builtin_len(args: &[Object]) -> Object {
    if args.len() != 1 {
        return Object::error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }
    match &args[0] {
        Object::Str(value) => Object::Integer(value.len() as i64),
        Object::Array(elements) => Object::Integer(elements.len() as i64),
        other => Object::error(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        )),
    }
}

fn builtin_first(args: &[Object]) -> Object {
    if args.len() != 1 {
        return Object::error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }
    match &args[0] {
        Object::Array(elements) => elements.front().cloned().unwrap_or(Object::Null),
        other => Object::error(format!(
            "argument to `first` not supported, got {}",
            other.type_name()
        )),
    }
}

fn builtin_rest(args: &[Object]) -> Object {
    if args.len() != 1 {
        return Object::error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }
    match &args[0] {
        Object::Array(elements) => {
            if elements.is_empty() {
                Object::Null
            } else {
                Object::Array(elements.skip(1))
            }
        }
        other => Object::error(format!(
            "argument to `rest` not supported, got {}",
            other.type_name()
        )),
    }
}

fn builtin_last(args: &[Object]) -> Object {
    if args.len() != 1 {
        return Object::error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }
    match &args[0] {
        Object::Array(elements) => elements.back().cloned().unwrap_or(Object::Null),
        other => Object::error(format!(
            "argument to `last` not supported, got {}",
            other.type_name()
        )),
    }
}

fn builtin_push(args: &[Object]) -> Object {
    if args.len() != 2 {
        return Object::error(format!(
            "wrong number of arguments. got={}, want=2",
            args.len()
        ));
    }
    match &args[0] {
        Object::Array(elements) => {
            let mut extended = elements.clone();
            extended.push_back(args[1].clone());
            Object::Array(extended)
        }
        other => Object::error(format!(
            "argument to `push` not supported, got {}",
            other.type_name()
        )),
    }
}

fn builtin_puts(args: &[Object]) -> Object {
    for arg in args {
        println!("{}", arg);
    }
    Object::Null
}
