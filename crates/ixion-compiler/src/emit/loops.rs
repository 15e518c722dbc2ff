//! Loop label tracking for `break` and `continue`, and the `finally`
//! guarded regions they may not leave.

use crate::bytecode::Label;

/// Labels of one enclosing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLabels {
    /// Target of `continue`.
    pub start: Label,
    /// Target of `break`.
    pub end: Label,
}

/// Stack of enclosing loops, innermost last.
#[derive(Debug, Default)]
pub struct LoopStack {
    loops: Vec<LoopLabels>,
    /// Loop depth at each enclosing `try` with a `finally` clause.
    guards: Vec<usize>,
}

impl LoopStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a loop body.
    ///
    /// # Arguments
    /// * `start` - where `continue` jumps
    /// * `end` - where `break` jumps
    pub fn enter_loop(&mut self, start: Label, end: Label) {
        self.loops.push(LoopLabels { start, end });
    }

    /// Leave the innermost loop, restoring the enclosing one.
    pub fn exit_loop(&mut self) -> Option<LoopLabels> {
        self.loops.pop()
    }

    pub fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    pub fn current(&self) -> Option<LoopLabels> {
        self.loops.last().copied()
    }

    pub fn loop_depth(&self) -> usize {
        self.loops.len()
    }

    /// Enter the body or a catch clause of a `try` with a `finally` clause.
    pub fn enter_guard(&mut self) {
        self.guards.push(self.loops.len());
    }

    pub fn exit_guard(&mut self) {
        self.guards.pop();
    }

    /// Whether a `return` would skip a `finally` block.
    pub fn is_guarded(&self) -> bool {
        !self.guards.is_empty()
    }

    /// Whether `break`/`continue` on the innermost loop would skip a
    /// `finally` block.
    pub fn jump_crosses_guard(&self) -> bool {
        self.guards.last().is_some_and(|depth| self.loops.len() <= *depth)
    }
}
