//! Return address stack (RAS) implementation.

use std::collections::VecDeque;
use crate::error::RasError;

/// A return-address stack with a fixed capacity.
///
/// When a call is pushed onto a full stack, the *oldest* entry is dropped to
/// make room. The remaining entries keep their order, so the most recent
/// calls are still matched correctly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReturnAddressStack {
    /// Storage for return addresses (youngest at the back)
    stack: VecDeque<u64>,

    /// Maximum number of entries
    capacity: usize,

    /// Number of entries dropped because the stack was full
    overflows: usize,
}
impl ReturnAddressStack {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            stack: VecDeque::with_capacity(capacity),
            capacity,
            overflows: 0,
        }
    }

    /// Push a return address onto the stack.
    pub fn push(&mut self, return_addr: u64) {
        if self.stack.len() == self.capacity {
            self.stack.pop_front();
            self.overflows += 1;
        }
        self.stack.push_back(return_addr);
    }

    /// Remove the youngest element from the stack.
    pub fn pop(&mut self) -> Result<u64, RasError> {
        self.stack.pop_back().ok_or(RasError::Empty)
    }

    /// Return the youngest element without removing it.
    pub fn top(&self) -> Option<u64> {
        self.stack.back().copied()
    }

    pub fn is_empty(&self) -> bool { self.stack.is_empty() }
    pub fn len(&self) -> usize { self.stack.len() }
    pub fn capacity(&self) -> usize { self.capacity }
    pub fn overflows(&self) -> usize { self.overflows }
}
