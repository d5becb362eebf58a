// langur-vm - Symbol tables for the compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexical symbol resolution for the compiler.
//!
//! A [`SymbolTable`] is created per function scope; tables nest through
//! `outer`. Resolving a name that lives in an enclosing function scope
//! promotes it to a free variable in every scope the lookup crossed, which
//! is what makes closure capture transitive: each intermediate function
//! captures from its own parent, not from the scope of definition.

use std::collections::HashMap;
use std::fmt;

/// Where a symbol lives, which decides the instruction used to load it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// Top-level binding, addressed by a global slot.
    Global,
    /// Binding inside a function, addressed relative to the frame base.
    Local,
    /// Captured from an enclosing function scope.
    Free,
    /// A registered built-in function.
    Builtin,
    /// The name a function literal was bound to, inside its own body.
    Function,
}

impl fmt::Display for SymbolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolScope::Global => write!(f, "GLOBAL"),
            SymbolScope::Local => write!(f, "LOCAL"),
            SymbolScope::Free => write!(f, "FREE"),
            SymbolScope::Builtin => write!(f, "BUILTIN"),
            SymbolScope::Function => write!(f, "FUNCTION"),
        }
    }
}

/// A resolved name: its scope and the index within that scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// One lexical scope's bindings, chained to the enclosing scope.
#[derive(Debug, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    /// Count of `define`d symbols; also the next Global/Local index.
    pub num_definitions: usize,
    /// Symbols captured from enclosing scopes, in first-reference order.
    /// Each entry is the *original* resolution in the enclosing scope.
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Create an empty top-level table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table nested inside `outer`, taking ownership of it.
    pub fn new_enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Whether this is the top-level (global) table.
    pub fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    /// Give back the enclosing table, if any. Used when leaving a scope.
    pub fn into_outer(self) -> Option<SymbolTable> {
        self.outer.map(|boxed| *boxed)
    }

    /// Bind `name` in this scope, assigning the next dense index.
    /// Re-defining an existing name shadows it.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    /// Register a built-in. The index comes from the builtin registry and
    /// does not count towards `num_definitions`.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Bind the name of the function currently being compiled, so its body
    /// can refer to itself without needing a global or local slot.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Function,
            index: 0,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Look `name` up here, then in enclosing scopes. A hit in an
    /// enclosing *function* scope (not Global, not Builtin) is promoted to
    /// a free variable of this scope on the way back out.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }

        let outer = self.outer.as_mut()?;
        let symbol = outer.resolve(name)?;
        if symbol.scope == SymbolScope::Global || symbol.scope == SymbolScope::Builtin {
            return Some(symbol);
        }
        Some(self.define_free(symbol))
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        let name = original.name.clone();
        self.free_symbols.push(original);
        let symbol = Symbol {
            name: name.clone(),
            scope: SymbolScope::Free,
            index: self.free_symbols.len() - 1,
        };
        self.store.insert(name, symbol.clone());
        symbol
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, scope: SymbolScope, index: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            scope,
            index,
        }
    }

    #[test]
    fn test_define() {
        let mut global = SymbolTable::new();
        assert_eq!(global.define("a"), symbol("a", SymbolScope::Global, 0));
        assert_eq!(global.define("b"), symbol("b", SymbolScope::Global, 1));

        let mut local = SymbolTable::new_enclosed(global);
        assert_eq!(local.define("c"), symbol("c", SymbolScope::Local, 0));
        assert_eq!(local.define("d"), symbol("d", SymbolScope::Local, 1));

        let mut nested = SymbolTable::new_enclosed(local);
        assert_eq!(nested.define("e"), symbol("e", SymbolScope::Local, 0));
    }

    #[test]
    fn test_resolve_global() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");

        assert_eq!(
            global.resolve("a"),
            Some(symbol("a", SymbolScope::Global, 0))
        );
        assert_eq!(
            global.resolve("b"),
            Some(symbol("b", SymbolScope::Global, 1))
        );
        assert_eq!(global.resolve("c"), None);
    }

    #[test]
    fn test_resolve_local_and_global_through_scopes() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut local = SymbolTable::new_enclosed(global);
        local.define("b");

        assert_eq!(local.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
        assert_eq!(local.resolve("b"), Some(symbol("b", SymbolScope::Local, 0)));
    }

    #[test]
    fn test_resolve_free() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut first = SymbolTable::new_enclosed(global);
        first.define("b");

        let mut second = SymbolTable::new_enclosed(first);
        second.define("c");

        // "b" lives in the enclosing function scope: captured as Free
        assert_eq!(
            second.resolve("b"),
            Some(symbol("b", SymbolScope::Free, 0))
        );
        // Globals are never captured
        assert_eq!(
            second.resolve("a"),
            Some(symbol("a", SymbolScope::Global, 0))
        );
        // Locals stay local
        assert_eq!(second.resolve("c"), Some(symbol("c", SymbolScope::Local, 0)));

        // The captured original is recorded for closure emission
        assert_eq!(
            second.free_symbols,
            vec![symbol("b", SymbolScope::Local, 0)]
        );

        // Resolving again returns the same Free index
        assert_eq!(
            second.resolve("b"),
            Some(symbol("b", SymbolScope::Free, 0))
        );
        assert_eq!(second.free_symbols.len(), 1);
    }

    #[test]
    fn test_resolve_transitive_free() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut outer_fn = SymbolTable::new_enclosed(global);
        outer_fn.define("b");

        let middle = SymbolTable::new_enclosed(outer_fn);
        let mut inner = SymbolTable::new_enclosed(middle);

        // "b" climbs two function scopes. The innermost scope captures the
        // intermediate scope's Free symbol, which in turn captured the
        // defining scope's Local: one Free entry per crossed scope.
        assert_eq!(inner.resolve("b"), Some(symbol("b", SymbolScope::Free, 0)));
        assert_eq!(inner.free_symbols, vec![symbol("b", SymbolScope::Free, 0)]);

        let middle = inner.into_outer().unwrap();
        assert_eq!(
            middle.free_symbols,
            vec![symbol("b", SymbolScope::Local, 0)]
        );
    }

    #[test]
    fn test_define_and_resolve_builtins() {
        let mut global = SymbolTable::new();
        global.define_builtin(0, "len");
        global.define_builtin(1, "first");

        let mut local = SymbolTable::new_enclosed(global);
        assert_eq!(
            local.resolve("len"),
            Some(symbol("len", SymbolScope::Builtin, 0))
        );
        assert_eq!(
            local.resolve("first"),
            Some(symbol("first", SymbolScope::Builtin, 1))
        );
        // Builtins are not captured as free variables
        assert!(local.free_symbols.is_empty());
    }

    #[test]
    fn test_define_and_resolve_function_name() {
        let mut global = SymbolTable::new();
        global.define_function_name("a");
        assert_eq!(
            global.resolve("a"),
            Some(symbol("a", SymbolScope::Function, 0))
        );
    }

    #[test]
    fn test_shadowing_function_name() {
        let mut global = SymbolTable::new();
        global.define_function_name("a");
        global.define("a");
        assert_eq!(global.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
    }
}
