// langur-vm - Stack-based virtual machine
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine executing Langur bytecode.
//!
//! The VM runs the main loop over the current [`Frame`]'s instructions:
//! pre-increment `ip`, decode the opcode, dispatch. Calls push frames,
//! returns pop them; the value stack is shared across frames, with each
//! frame's arguments and locals living at `[base_pointer, sp)`.

pub mod frame;
pub mod stack;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use im::{OrdMap, Vector};

use langur_core::chunk::{read_u16, read_u8, Bytecode};
use langur_core::opcode::Op;
use langur_core::value::{Builtin, Closure, CompiledFunction, HashPair, Object};
use langur_core::BUILTINS;

pub use frame::Frame;
pub use stack::ValueStack;

/// Capacity of the value stack.
pub const STACK_SIZE: usize = 2048;

/// Number of global binding slots.
pub const GLOBALS_SIZE: usize = 65536;

/// Maximum call depth.
pub const MAX_FRAMES: usize = 1024;

/// Runtime error during VM execution. Execution stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The value stack is full.
    StackOverflow,
    /// An instruction needed more operands than the stack holds.
    StackUnderflow,
    /// Call depth exceeded [`MAX_FRAMES`].
    FramesOverflow,
    /// Binary operation on an unsupported type combination.
    UnsupportedBinaryTypes {
        left: &'static str,
        right: &'static str,
    },
    /// Comparison operator applied to types it is not defined on.
    UnknownOperator {
        op: Op,
        left: &'static str,
        right: &'static str,
    },
    /// A string operation other than concatenation.
    UnknownStringOperator(Op),
    /// `OpMinus` on a non-integer.
    UnsupportedNegation(&'static str),
    /// A hash key of an unhashable type.
    UnusableHashKey(&'static str),
    /// `OpIndex` on a type that cannot be indexed.
    IndexNotSupported(&'static str),
    /// `OpCall` on a value that is neither a closure nor a builtin.
    CallingNonFunction,
    /// Closure called with the wrong argument count.
    WrongNumberOfArguments { want: usize, got: usize },
    /// A byte that is not a valid opcode.
    UndefinedOpcode(u8),
    /// Invariant violation: well-formed bytecode never triggers this.
    Internal(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackOverflow => write!(f, "stack overflow"),
            RuntimeError::StackUnderflow => write!(f, "stack underflow"),
            RuntimeError::FramesOverflow => write!(f, "frames overflow"),
            RuntimeError::UnsupportedBinaryTypes { left, right } => {
                write!(f, "unsupported types for binary operation: {} {}", left, right)
            }
            RuntimeError::UnknownOperator { op, left, right } => {
                write!(f, "unknown operator: {} ({} {})", op.mnemonic(), left, right)
            }
            RuntimeError::UnknownStringOperator(op) => {
                write!(f, "unknown string operator: {}", op.mnemonic())
            }
            RuntimeError::UnsupportedNegation(type_name) => {
                write!(f, "unsupported type for negation: {}", type_name)
            }
            RuntimeError::UnusableHashKey(type_name) => {
                write!(f, "unusable as hash key: {}", type_name)
            }
            RuntimeError::IndexNotSupported(type_name) => {
                write!(f, "index operator not supported: {}", type_name)
            }
            RuntimeError::CallingNonFunction => write!(f, "calling non-function"),
            RuntimeError::WrongNumberOfArguments { want, got } => {
                write!(f, "wrong number of arguments: want={}, got={}", want, got)
            }
            RuntimeError::UndefinedOpcode(byte) => write!(f, "opcode {} undefined", byte),
            RuntimeError::Internal(message) => write!(f, "internal error: {}", message),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// A globals store, shareable between VM runs (the REPL reuses one).
pub type GlobalsStore = Rc<RefCell<Vec<Object>>>;

/// Create an empty globals store.
pub fn new_globals_store() -> GlobalsStore {
    Rc::new(RefCell::new(vec![Object::Null; GLOBALS_SIZE]))
}

/// The Langur virtual machine.
pub struct VM {
    constants: Vec<Object>,
    stack: ValueStack,
    globals: GlobalsStore,
    frames: Vec<Frame>,
}

impl VM {
    /// Create a VM for the given bytecode with a fresh globals store.
    pub fn new(bytecode: Bytecode) -> Self {
        Self::new_with_globals_store(bytecode, new_globals_store())
    }

    /// Create a VM sharing an existing globals store, so top-level
    /// bindings survive across runs.
    pub fn new_with_globals_store(bytecode: Bytecode, globals: GlobalsStore) -> Self {
        let main_function = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Closure {
            func: Rc::new(main_function),
            free: Vec::new(),
        };
        let main_frame = Frame::new(Rc::new(main_closure), 0);

        Self {
            constants: bytecode.constants,
            stack: ValueStack::new(),
            globals,
            frames: vec![main_frame],
        }
    }

    /// The value most recently popped off the stack. After a successful
    /// run this is the result of the program's last expression statement.
    pub fn last_popped_stack_item(&self) -> Object {
        self.stack.last_popped()
    }

    /// Execute the bytecode to completion.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let op_byte = {
                let frame = self.current_frame_mut();
                let next_ip = (frame.ip + 1) as usize;
                let byte = match frame.instructions().get(next_ip) {
                    Some(&byte) => byte,
                    None => break,
                };
                frame.ip += 1;
                byte
            };

            let op = Op::try_from(op_byte).map_err(|_| RuntimeError::UndefinedOpcode(op_byte))?;

            match op {
                Op::Constant => {
                    let index = self.read_u16_operand();
                    let constant = self
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or_else(|| RuntimeError::Internal("constant index out of bounds".into()))?;
                    self.stack.push(constant)?;
                }

                Op::Pop => {
                    self.stack.pop()?;
                }

                Op::Add | Op::Sub | Op::Mul | Op::Div => {
                    self.execute_binary_operation(op)?;
                }

                Op::True => self.stack.push(Object::Boolean(true))?,
                Op::False => self.stack.push(Object::Boolean(false))?,
                Op::Null => self.stack.push(Object::Null)?,

                Op::Equal | Op::NotEqual | Op::GreaterThan => {
                    self.execute_comparison(op)?;
                }

                Op::Bang => {
                    let operand = self.stack.pop()?;
                    self.stack.push(Object::Boolean(!operand.is_truthy()))?;
                }

                Op::Minus => {
                    let operand = self.stack.pop()?;
                    match operand {
                        Object::Integer(value) => self.stack.push(Object::Integer(-value))?,
                        other => {
                            return Err(RuntimeError::UnsupportedNegation(other.type_name()));
                        }
                    }
                }

                Op::Jump => {
                    let target = self.read_u16_operand();
                    self.current_frame_mut().ip = target as isize - 1;
                }

                Op::JumpNotTruthy => {
                    let target = self.read_u16_operand();
                    let condition = self.stack.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target as isize - 1;
                    }
                }

                Op::SetGlobal => {
                    let index = self.read_u16_operand();
                    let value = self.stack.pop()?;
                    self.globals.borrow_mut()[index] = value;
                }

                Op::GetGlobal => {
                    let index = self.read_u16_operand();
                    let value = self.globals.borrow()[index].clone();
                    self.stack.push(value)?;
                }

                Op::SetLocal => {
                    let index = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack.pop()?;
                    self.stack.set(base + index, value)?;
                }

                Op::GetLocal => {
                    let index = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack.get(base + index)?;
                    self.stack.push(value)?;
                }

                Op::GetBuiltin => {
                    let index = self.read_u8_operand();
                    let builtin = BUILTINS
                        .get(index)
                        .copied()
                        .ok_or_else(|| RuntimeError::Internal("builtin index out of bounds".into()))?;
                    self.stack.push(Object::Builtin(builtin))?;
                }

                Op::Array => {
                    let count = self.read_u16_operand();
                    let elements = self.stack.pop_n(count)?;
                    self.stack
                        .push(Object::Array(elements.into_iter().collect::<Vector<_>>()))?;
                }

                Op::Hash => {
                    let count = self.read_u16_operand();
                    let items = self.stack.pop_n(count)?;
                    let hash = build_hash(items)?;
                    self.stack.push(hash)?;
                }

                Op::Index => {
                    let index = self.stack.pop()?;
                    let left = self.stack.pop()?;
                    let result = execute_index_expression(left, index)?;
                    self.stack.push(result)?;
                }

                Op::Call => {
                    let num_args = self.read_u8_operand();
                    self.execute_call(num_args)?;
                }

                Op::ReturnValue => {
                    let value = self.stack.pop()?;
                    if self.return_from_frame(value)? {
                        break;
                    }
                }

                Op::Return => {
                    if self.return_from_frame(Object::Null)? {
                        break;
                    }
                }

                Op::Closure => {
                    let const_index = self.read_u16_operand();
                    let num_free = self.read_u8_operand();
                    self.push_closure(const_index, num_free)?;
                }

                Op::GetFree => {
                    let index = self.read_u8_operand();
                    let closure = &self.current_frame().closure;
                    let value = closure
                        .free
                        .get(index)
                        .cloned()
                        .ok_or_else(|| RuntimeError::Internal("free variable index out of bounds".into()))?;
                    self.stack.push(value)?;
                }

                Op::CurrentClosure => {
                    let closure = self.current_frame().closure.clone();
                    self.stack.push(Object::Closure(closure))?;
                }
            }
        }

        Ok(())
    }

    // =========================================================================
    // Dispatch helpers
    // =========================================================================

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("no active frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    /// Read a two-byte operand at `ip + 1` and step `ip` past it.
    fn read_u16_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let at = frame.ip as usize + 1;
        let value = read_u16(&frame.instructions()[at..]) as usize;
        frame.ip += 2;
        value
    }

    /// Read a one-byte operand at `ip + 1` and step `ip` past it.
    fn read_u8_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let at = frame.ip as usize + 1;
        let value = read_u8(&frame.instructions()[at..]) as usize;
        frame.ip += 1;
        value
    }

    fn execute_binary_operation(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        match (&left, &right) {
            (Object::Integer(l), Object::Integer(r)) => {
                let result = match op {
                    Op::Add => l + r,
                    Op::Sub => l - r,
                    Op::Mul => l * r,
                    // Division by zero follows i64 semantics; the
                    // language leaves it unspecified.
                    Op::Div => l / r,
                    other => {
                        return Err(RuntimeError::Internal(format!(
                            "{} is not a binary operation",
                            other.mnemonic()
                        )));
                    }
                };
                self.stack.push(Object::Integer(result))
            }
            (Object::Str(l), Object::Str(r)) => {
                if op != Op::Add {
                    return Err(RuntimeError::UnknownStringOperator(op));
                }
                let mut concatenated = String::with_capacity(l.len() + r.len());
                concatenated.push_str(l);
                concatenated.push_str(r);
                self.stack.push(Object::string(concatenated))
            }
            _ => Err(RuntimeError::UnsupportedBinaryTypes {
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn execute_comparison(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        if let (Object::Integer(l), Object::Integer(r)) = (&left, &right) {
            let result = match op {
                Op::Equal => l == r,
                Op::NotEqual => l != r,
                Op::GreaterThan => l > r,
                other => {
                    return Err(RuntimeError::Internal(format!(
                        "{} is not a comparison",
                        other.mnemonic()
                    )));
                }
            };
            return self.stack.push(Object::Boolean(result));
        }

        // Non-integer comparison: equality is defined for every pair of
        // values (cross-type pairs simply differ); ordering is not.
        match op {
            Op::Equal => self.stack.push(Object::Boolean(left == right)),
            Op::NotEqual => self.stack.push(Object::Boolean(left != right)),
            _ => Err(RuntimeError::UnknownOperator {
                op,
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn execute_call(&mut self, num_args: usize) -> Result<()> {
        let callee_index = self
            .stack
            .sp()
            .checked_sub(1 + num_args)
            .ok_or(RuntimeError::StackUnderflow)?;
        let callee = self.stack.get(callee_index)?;

        match callee {
            Object::Closure(closure) => self.call_closure(closure, num_args),
            Object::Builtin(builtin) => self.call_builtin(builtin, num_args),
            _ => Err(RuntimeError::CallingNonFunction),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, num_args: usize) -> Result<()> {
        if num_args != closure.func.num_parameters {
            return Err(RuntimeError::WrongNumberOfArguments {
                want: closure.func.num_parameters,
                got: num_args,
            });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::FramesOverflow);
        }

        let base_pointer = self.stack.sp() - num_args;
        let num_locals = closure.func.num_locals;
        self.frames.push(Frame::new(closure, base_pointer));
        // Arguments already occupy the first parameter slots; reserve the
        // remaining local slots above them.
        self.stack.set_sp(base_pointer + num_locals)
    }

    fn call_builtin(&mut self, builtin: Builtin, num_args: usize) -> Result<()> {
        let args_start = self.stack.sp() - num_args;
        let mut args = Vec::with_capacity(num_args);
        for index in args_start..self.stack.sp() {
            args.push(self.stack.get(index)?);
        }

        let result = (builtin.func)(&args);

        // Replace the builtin and its arguments with the result.
        self.stack.set_sp(args_start - 1)?;
        self.stack.push(result)
    }

    /// Pop the current frame and push `value` as the call's result.
    /// Returns `true` when the popped frame was the program's main frame,
    /// which ends execution.
    fn return_from_frame(&mut self, value: Object) -> Result<bool> {
        let frame = self.frames.pop().expect("no active frame");

        if self.frames.is_empty() {
            // Top-level `return`: the program ends with the returned
            // value as the last popped item.
            self.stack.set_sp(frame.base_pointer)?;
            self.stack.push(value)?;
            self.stack.pop()?;
            return Ok(true);
        }

        // Discard the callee, its arguments, and its locals.
        self.stack.set_sp(frame.base_pointer - 1)?;
        self.stack.push(value)?;
        Ok(false)
    }

    fn push_closure(&mut self, const_index: usize, num_free: usize) -> Result<()> {
        let constant = self
            .constants
            .get(const_index)
            .cloned()
            .ok_or_else(|| RuntimeError::Internal("constant index out of bounds".into()))?;
        let function = match constant {
            Object::CompiledFunction(func) => func,
            other => {
                return Err(RuntimeError::Internal(format!(
                    "not a function: {}",
                    other.type_name()
                )));
            }
        };

        let free = self.stack.pop_n(num_free)?;
        let closure = Closure { func: function, free };
        self.stack.push(Object::Closure(Rc::new(closure)))
    }
}

fn build_hash(items: Vec<Object>) -> Result<Object> {
    let mut pairs = OrdMap::new();
    let mut iter = items.into_iter();
    while let Some(key) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| RuntimeError::Internal("odd number of hash items".into()))?;
        let hash_key = key
            .hash_key()
            .ok_or_else(|| RuntimeError::UnusableHashKey(key.type_name()))?;
        pairs.insert(hash_key, HashPair { key, value });
    }
    Ok(Object::Hash(pairs))
}

fn execute_index_expression(left: Object, index: Object) -> Result<Object> {
    match (&left, &index) {
        (Object::Array(elements), Object::Integer(i)) => {
            if *i < 0 || *i as usize >= elements.len() {
                Ok(Object::Null)
            } else {
                Ok(elements[*i as usize].clone())
            }
        }
        (Object::Hash(pairs), _) => {
            let key = index
                .hash_key()
                .ok_or_else(|| RuntimeError::UnusableHashKey(index.type_name()))?;
            Ok(pairs
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Object::Null))
        }
        _ => Err(RuntimeError::IndexNotSupported(left.type_name())),
    }
}
