// langur-vm - Bytecode compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Single-pass compiler from the Langur AST to bytecode.
//!
//! The compiler walks the tree once, emitting into a stack of
//! [`CompilationScope`]s - one per function literal being compiled - and
//! back-patching jump targets after each conditional arm is known. Function
//! bodies become [`CompiledFunction`] constants; the top-level scope's
//! instructions become the program.

use std::fmt;
use std::rc::Rc;

use langur_core::chunk::{make, Bytecode, Instructions};
use langur_core::opcode::Op;
use langur_core::value::{CompiledFunction, Object};
use langur_core::BUILTINS;
use langur_parser::ast::{
    BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement,
};

use crate::symbol_table::{Symbol, SymbolScope, SymbolTable};
use crate::vm::GLOBALS_SIZE;

/// Most local slots a single function may use: `OpGetLocal` carries a
/// one-byte operand.
const MAX_LOCALS: usize = 256;

/// Most entries the constant pool may hold: `OpConstant` carries a
/// two-byte operand.
const MAX_CONSTANTS: usize = 65536;

/// Error during compilation. Compilation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Reference to a name with no visible definition.
    UndefinedVariable(String),
    /// An operator with no bytecode counterpart (`<=`, `>=`).
    UnknownOperator(String),
    /// More than 65536 global bindings.
    TooManyGlobals,
    /// A function with more than 256 local slots.
    TooManyLocals,
    /// Constant pool overflow.
    TooManyConstants,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UndefinedVariable(name) => {
                write!(f, "undefined variable {}", name)
            }
            CompileError::UnknownOperator(op) => write!(f, "unknown operator {}", op),
            CompileError::TooManyGlobals => write!(f, "too many global bindings"),
            CompileError::TooManyLocals => write!(f, "too many local bindings in function"),
            CompileError::TooManyConstants => write!(f, "too many constants"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// An instruction the current scope has emitted, for peephole rewrites.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Op,
    position: usize,
}

/// Per-function compilation state. Scopes form a stack; only the top
/// scope receives emitted instructions.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

/// The Langur bytecode compiler.
pub struct Compiler {
    constants: Vec<Object>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    /// Create a compiler with a fresh symbol table. The builtin registry
    /// is pre-defined so user code can resolve builtin names.
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, builtin.name);
        }
        Self::new_with_state(symbol_table, Vec::new())
    }

    /// Create a compiler resuming from an earlier symbol table and
    /// constant pool, so a REPL can carry bindings across inputs.
    pub fn new_with_state(symbol_table: SymbolTable, constants: Vec<Object>) -> Self {
        Self {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Compile a program into the current (top-level) scope.
    pub fn compile(&mut self, program: &Program) -> Result<()> {
        for statement in &program.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// The compiled result: the top-level scope's instructions plus the
    /// constant pool.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.current_scope().instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    /// Tear the compiler down into its reusable state (symbol table and
    /// constant pool), for the next REPL input.
    pub fn into_state(self) -> (SymbolTable, Vec<Object>) {
        (self.symbol_table, self.constants)
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Expression(expression) => {
                self.compile_expression(expression)?;
                self.emit(Op::Pop, &[]);
            }
            Statement::Let { name, value } => {
                // Define before compiling the value: the name is visible
                // to its own initialiser, which is what lets a function
                // literal call itself.
                let symbol = self.symbol_table.define(name);
                if symbol.scope == SymbolScope::Global && symbol.index >= GLOBALS_SIZE {
                    return Err(CompileError::TooManyGlobals);
                }
                self.compile_expression(value)?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Op::SetGlobal, &[symbol.index]),
                    _ => self.emit(Op::SetLocal, &[symbol.index]),
                };
            }
            Statement::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Op::ReturnValue, &[]);
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<()> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::IntegerLiteral(value) => {
                let index = self.add_constant(Object::Integer(*value))?;
                self.emit(Op::Constant, &[index]);
            }
            Expression::StringLiteral(value) => {
                let index = self.add_constant(Object::string(value.clone()))?;
                self.emit(Op::Constant, &[index]);
            }
            Expression::BooleanLiteral(true) => {
                self.emit(Op::True, &[]);
            }
            Expression::BooleanLiteral(false) => {
                self.emit(Op::False, &[]);
            }
            Expression::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.load_symbol(&symbol);
            }
            Expression::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator {
                    PrefixOperator::Bang => self.emit(Op::Bang, &[]),
                    PrefixOperator::Minus => self.emit(Op::Minus, &[]),
                };
            }
            Expression::Infix {
                operator,
                left,
                right,
            } => {
                // There is no less-than opcode: `a < b` compiles as
                // `b > a` by swapping the operand order.
                if *operator == InfixOperator::Lt {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Op::GreaterThan, &[]);
                    return Ok(());
                }

                self.compile_expression(left)?;
                self.compile_expression(right)?;
                match operator {
                    InfixOperator::Plus => self.emit(Op::Add, &[]),
                    InfixOperator::Minus => self.emit(Op::Sub, &[]),
                    InfixOperator::Asterisk => self.emit(Op::Mul, &[]),
                    InfixOperator::Slash => self.emit(Op::Div, &[]),
                    InfixOperator::Gt => self.emit(Op::GreaterThan, &[]),
                    InfixOperator::Eq => self.emit(Op::Equal, &[]),
                    InfixOperator::NotEq => self.emit(Op::NotEqual, &[]),
                    other => return Err(CompileError::UnknownOperator(other.to_string())),
                };
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                // Placeholder target, patched once the consequence is laid out
                let jump_not_truthy_pos = self.emit(Op::JumpNotTruthy, &[9999]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(Op::Pop) {
                    self.remove_last_pop();
                }

                let jump_pos = self.emit(Op::Jump, &[9999]);

                let after_consequence = self.current_scope().instructions.len();
                self.change_operand(jump_not_truthy_pos, after_consequence);

                match alternative {
                    None => {
                        self.emit(Op::Null, &[]);
                    }
                    Some(alternative) => {
                        self.compile_block(alternative)?;
                        if self.last_instruction_is(Op::Pop) {
                            self.remove_last_pop();
                        }
                    }
                }

                let after_alternative = self.current_scope().instructions.len();
                self.change_operand(jump_pos, after_alternative);
            }
            Expression::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Op::Array, &[elements.len()]);
            }
            Expression::HashLiteral(pairs) => {
                // Keys are ordered by their source rendering so that
                // semantically equal literals compile to identical bytes.
                let mut sorted: Vec<&(Expression, Expression)> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());

                for (key, value) in sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Op::Hash, &[pairs.len() * 2]);
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Op::Index, &[]);
            }
            Expression::FunctionLiteral {
                parameters,
                body,
                name,
            } => {
                self.enter_scope();

                if !name.is_empty() {
                    self.symbol_table.define_function_name(name);
                }
                for parameter in parameters {
                    self.symbol_table.define(parameter);
                }

                self.compile_block(body)?;

                // The value of the body's final expression is the return
                // value; a body that doesn't end in a return returns null.
                if self.last_instruction_is(Op::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(Op::ReturnValue) {
                    self.emit(Op::Return, &[]);
                }

                let free_symbols = self.symbol_table.free_symbols.clone();
                let num_locals = self.symbol_table.num_definitions;
                if num_locals > MAX_LOCALS {
                    return Err(CompileError::TooManyLocals);
                }
                let instructions = self.leave_scope();

                // Push the captured values - each free symbol loads via
                // its original resolution in this (enclosing) scope.
                for symbol in &free_symbols {
                    self.load_symbol(symbol);
                }

                let function = CompiledFunction {
                    instructions,
                    num_locals,
                    num_parameters: parameters.len(),
                };
                let index = self.add_constant(Object::CompiledFunction(Rc::new(function)))?;
                self.emit(Op::Closure, &[index, free_symbols.len()]);
            }
            Expression::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Op::Call, &[arguments.len()]);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Emission helpers
    // =========================================================================

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let encoded = make(op, operands);
        let scope = self.current_scope_mut();
        let position = scope.instructions.push(&encoded);
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction {
            opcode: op,
            position,
        });
        position
    }

    fn add_constant(&mut self, object: Object) -> Result<usize> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants);
        }
        self.constants.push(object);
        Ok(self.constants.len() - 1)
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Op::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Op::GetFree, &[symbol.index]),
            SymbolScope::Function => self.emit(Op::CurrentClosure, &[]),
        };
    }

    fn last_instruction_is(&self, op: Op) -> bool {
        self.current_scope()
            .last_instruction
            .is_some_and(|last| last.opcode == op)
    }

    /// Remove the most recently emitted `OpPop` (conditional arms leave
    /// their value on the stack).
    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        let last = scope
            .last_instruction
            .expect("remove_last_pop with no emitted instruction");
        scope.instructions.truncate(last.position);
        scope.last_instruction = scope.previous_instruction;
    }

    /// Rewrite the trailing `OpPop` of a function body into
    /// `OpReturnValue`, in place (both are one byte).
    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope_mut();
        let last = scope
            .last_instruction
            .as_mut()
            .expect("replace_last_pop_with_return with no emitted instruction");
        let encoded = make(Op::ReturnValue, &[]);
        scope.instructions.replace(last.position, &encoded);
        last.opcode = Op::ReturnValue;
    }

    /// Re-encode the instruction at `position` with a new operand, keeping
    /// the opcode. Used to back-patch jump targets.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let scope = self.current_scope_mut();
        let op = Op::try_from(scope.instructions[position])
            .expect("change_operand on an undefined opcode");
        let encoded = make(op, &[operand]);
        scope.instructions.replace(position, &encoded);
    }

    // =========================================================================
    // Scope management
    // =========================================================================

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().expect("no compilation scope")
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("no compilation scope")
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("leave_scope with no scope");
        let table = std::mem::take(&mut self.symbol_table);
        self.symbol_table = table
            .into_outer()
            .expect("leave_scope with no enclosing symbol table");
        scope.instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
