// langur-core - Value types for Langur
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Core value type for Langur.
//!
//! [`Object`] is the central enum representing all runtime values. It is
//! shared between the compiler (constant pool entries) and the virtual
//! machine (stack slots, globals, captured free variables).
//!
//! Cloning an `Object` is cheap everywhere: scalar variants are `Copy`-like,
//! and the aggregate variants are reference-counted or persistent
//! structures. Values are never mutated after construction, so handing out
//! clones preserves sharing semantics (`push` on an array returns a new
//! array and leaves the original untouched).

use std::fmt;
use std::hash::Hasher;
use std::rc::Rc;

use fnv::FnvHasher;
use im::{OrdMap, Vector};

use crate::chunk::Instructions;

/// Signature of a built-in function. Returning an [`Object::Error`]
/// signals a user-visible failure.
pub type BuiltinFunction = fn(&[Object]) -> Object;

/// A named built-in function, addressed by its position in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFunction,
}

/// Bytecode for one function body, together with its frame layout.
///
/// Appears only in the constant pool; at runtime it is always wrapped in a
/// [`Closure`] before being called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    /// Local slots the frame reserves, parameters included.
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A callable value: a compiled function plus its captured free variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    pub func: Rc<CompiledFunction>,
    pub free: Vec<Object>,
}

/// A key/value entry of a hash. The original key object is kept so that
/// display and iteration yield the keys as written, not their hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

/// Type tag of a hashable object, the discriminating half of a [`HashKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashTag {
    Integer,
    Boolean,
    Str,
}

/// Hash-map key derived from a hashable [`Object`].
///
/// Objects equal under the language's `==` produce equal keys: integers
/// map to their value, booleans to 0/1, strings to the 64-bit FNV-1a of
/// their bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey {
    pub tag: HashTag,
    pub value: u64,
}

/// A Langur runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Str(Rc<String>),
    Null,
    Array(Vector<Object>),
    Hash(OrdMap<HashKey, HashPair>),
    CompiledFunction(Rc<CompiledFunction>),
    Closure(Rc<Closure>),
    Builtin(Builtin),
    /// Wraps the value of an explicit `return`. Internal sentinel; never
    /// observable from user code.
    ReturnValue(Box<Object>),
    Error(String),
}

impl Object {
    /// Build a string value.
    pub fn string(value: impl Into<String>) -> Object {
        Object::Str(Rc::new(value.into()))
    }

    /// Build an array value from the given elements.
    pub fn array(elements: impl IntoIterator<Item = Object>) -> Object {
        Object::Array(elements.into_iter().collect())
    }

    /// Build an error value.
    pub fn error(message: impl Into<String>) -> Object {
        Object::Error(message.into())
    }

    /// The user-facing type name, as it appears in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => "INTEGER",
            Object::Boolean(_) => "BOOLEAN",
            Object::Str(_) => "STRING",
            Object::Null => "NULL",
            Object::Array(_) => "ARRAY",
            Object::Hash(_) => "HASH",
            Object::CompiledFunction(_) => "COMPILED_FUNCTION",
            Object::Closure(_) => "FUNCTION",
            Object::Builtin(_) => "BUILTIN",
            Object::ReturnValue(_) => "RETURN_VALUE",
            Object::Error(_) => "ERROR",
        }
    }

    /// Everything is truthy except `false` and `null`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }

    /// The hash key for this object, or `None` if the type is not
    /// hashable. Only integers, booleans, and strings may be hash keys.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Object::Integer(value) => Some(HashKey {
                tag: HashTag::Integer,
                value: *value as u64,
            }),
            Object::Boolean(value) => Some(HashKey {
                tag: HashTag::Boolean,
                value: *value as u64,
            }),
            Object::Str(value) => {
                let mut hasher = FnvHasher::default();
                hasher.write(value.as_bytes());
                Some(HashKey {
                    tag: HashTag::Str,
                    value: hasher.finish(),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(value) => write!(f, "{}", value),
            Object::Boolean(value) => write!(f, "{}", value),
            Object::Str(value) => write!(f, "{}", value),
            Object::Null => write!(f, "null"),
            Object::Array(elements) => {
                let rendered: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Object::Hash(pairs) => {
                let rendered: Vec<String> = pairs
                    .values()
                    .map(|pair| format!("{}: {}", pair.key, pair.value))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Object::CompiledFunction(func) => {
                write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(func))
            }
            Object::Closure(closure) => write!(f, "Closure[{:p}]", Rc::as_ptr(closure)),
            Object::Builtin(_) => write!(f, "builtin function"),
            Object::ReturnValue(value) => write!(f, "{}", value),
            Object::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}
