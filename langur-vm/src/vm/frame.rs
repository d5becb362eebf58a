// langur-vm - Call frames for the VM
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use langur_core::chunk::Instructions;
use langur_core::value::Closure;

/// A call frame on the VM's frame stack.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The closure this frame is executing.
    pub closure: Rc<Closure>,

    /// Instruction pointer. Starts at -1 and is pre-incremented, so the
    /// first fetch reads byte 0.
    pub ip: isize,

    /// Index of the first local slot of this frame on the value stack.
    pub base_pointer: usize,
}

impl Frame {
    /// Create a frame for a closure whose locals start at `base_pointer`.
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: -1,
            base_pointer,
        }
    }

    /// The bytecode this frame executes.
    pub fn instructions(&self) -> &Instructions {
        &self.closure.func.instructions
    }
}
