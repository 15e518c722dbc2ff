//! Per-method instruction sink.
//!
//! A `MethodBuilder` owns the instruction list of exactly one method while it
//! is being emitted, plus the counter that keeps its labels unique.

use ixion_core::Modifiers;

use super::{ExceptionHandler, Instruction, Label, MethodArtifact, Opcode};

#[derive(Debug, Clone, Default)]
pub struct MethodBuilder {
    method: MethodArtifact,
    next_label: u32,
}

impl MethodBuilder {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            method: MethodArtifact {
                name: name.into(),
                descriptor: descriptor.into(),
                modifiers,
                exceptions: Vec::new(),
                instructions: Vec::new(),
                handlers: Vec::new(),
            },
            next_label: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.method.name
    }

    pub fn descriptor(&self) -> &str {
        &self.method.descriptor
    }

    pub fn set_exceptions(&mut self, exceptions: Vec<String>) {
        self.method.exceptions = exceptions;
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.method.instructions.push(instruction);
    }

    /// Append an exception-table entry. Nested regions must be added
    /// before the regions enclosing them.
    pub fn add_handler(&mut self, handler: ExceptionHandler) {
        self.method.handlers.push(handler);
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.method.instructions
    }

    pub fn len(&self) -> usize {
        self.method.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.method.instructions.is_empty()
    }

    /// Last real instruction, skipping labels and line markers.
    pub fn last_opcode(&self) -> Option<Opcode> {
        self.method
            .instructions
            .iter()
            .rev()
            .find_map(Instruction::opcode)
    }

    /// The method as emitted so far.
    pub fn artifact(&self) -> &MethodArtifact {
        &self.method
    }

    pub fn finish(self) -> MethodArtifact {
        self.method
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MethodBuilder {
        let mut method = MethodBuilder::new("main", "()V", Modifiers::PUBLIC | Modifiers::STATIC);
        let label = method.new_label();
        method.push(Instruction::Insn(Opcode::Iconst1));
        method.push(Instruction::JumpInsn(Opcode::Ifeq, label));
        method.push(Instruction::Label(label));
        method.push(Instruction::Insn(Opcode::Return));
        method
    }

    #[test]
    fn labels_are_unique() {
        let mut method = MethodBuilder::default();
        assert_ne!(method.new_label(), method.new_label());
    }

    #[test]
    fn finish_keeps_instructions() {
        let method = sample().finish();
        assert_eq!(method.name, "main");
        method.assert_opcodes(&[Opcode::Iconst1, Opcode::Ifeq, Opcode::Return]);
    }

    #[test]
    #[should_panic(expected = "Bytecode mismatch")]
    fn assert_opcodes_failure() {
        sample().finish().assert_opcodes(&[Opcode::Iconst1, Opcode::Return]);
    }

    #[test]
    fn assert_contains_opcodes_subsequence() {
        sample()
            .artifact()
            .assert_contains_opcodes(&[Opcode::Iconst1, Opcode::Return]);
    }

    #[test]
    #[should_panic(expected = "Missing opcodes")]
    fn assert_contains_opcodes_failure() {
        sample()
            .artifact()
            .assert_contains_opcodes(&[Opcode::Return, Opcode::Iconst1]);
    }

    #[test]
    fn last_opcode_skips_labels() {
        let mut method = sample();
        let label = method.new_label();
        method.push(Instruction::Label(label));
        assert_eq!(method.last_opcode(), Some(Opcode::Return));
        assert_eq!(method.artifact().count_label_marks(Label(0)), 1);
    }
}
