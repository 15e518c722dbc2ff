//! Compiled classes and the target emitter seam.
//!
//! The compiler stops at structured [`ClassArtifact`]s. Turning them into a
//! binary class file (max stack, max locals, stack map frames, constant pool)
//! is the job of a [`TargetEmitter`].

use std::fmt::{self, Write as _};

use ixion_core::{Modifiers, SemanticType};

use super::{ExceptionHandler, Instruction, Label, Opcode};

// ============================================================================
// Artifacts
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FieldArtifact {
    pub name: String,
    pub ty: SemanticType,
    pub modifiers: Modifiers,
}

impl FieldArtifact {
    pub fn descriptor(&self) -> String {
        self.ty.descriptor()
    }
}

/// One method body as a flat instruction stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodArtifact {
    pub name: String,
    pub descriptor: String,
    pub modifiers: Modifiers,
    /// Declared checked exceptions, internal names.
    pub exceptions: Vec<String>,
    pub instructions: Vec<Instruction>,
    /// Exception table, innermost handlers first.
    pub handlers: Vec<ExceptionHandler>,
}

impl MethodArtifact {
    /// Opcodes in emission order, without labels and line markers.
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.instructions.iter().filter_map(Instruction::opcode).collect()
    }

    /// Number of times `label` is marked.
    pub fn count_label_marks(&self, label: Label) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Label(l) if *l == label))
            .count()
    }

    /// Distinct labels targeted by `opcode` jumps.
    pub fn jump_targets(&self, opcode: Opcode) -> Vec<Label> {
        let mut targets: Vec<Label> = Vec::new();
        for instruction in &self.instructions {
            if let Instruction::JumpInsn(op, label) = instruction
                && *op == opcode
                && !targets.contains(label)
            {
                targets.push(*label);
            }
        }
        targets
    }

    /// Assert that the emitted opcodes match exactly.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[Opcode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Check that the opcodes appear in order, not necessarily contiguous.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[Opcode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassArtifact {
    /// Internal name.
    pub name: String,
    pub superclass: String,
    pub interfaces: Vec<String>,
    pub modifiers: Modifiers,
    pub source_file: Option<String>,
    pub fields: Vec<FieldArtifact>,
    pub methods: Vec<MethodArtifact>,
}

impl ClassArtifact {
    pub fn new(name: impl Into<String>, superclass: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            name: name.into(),
            superclass: superclass.into(),
            interfaces: Vec::new(),
            modifiers,
            source_file: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// First method named `name`.
    pub fn method(&self, name: &str) -> Option<&MethodArtifact> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn method_with(&self, name: &str, descriptor: &str) -> Option<&MethodArtifact> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn field(&self, name: &str) -> Option<&FieldArtifact> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Every class produced from one source file. The unit class comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUnit {
    pub name: String,
    pub classes: Vec<ClassArtifact>,
}

impl CompiledUnit {
    pub fn class(&self, name: &str) -> Option<&ClassArtifact> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn unit_class(&self) -> Option<&ClassArtifact> {
        self.classes.first()
    }
}

// ============================================================================
// Target emitters
// ============================================================================

/// Writer turning a class artifact into the target's binary form.
pub trait TargetEmitter {
    type Output;
    type Error: std::error::Error;

    fn emit_class(&mut self, class: &ClassArtifact) -> Result<Self::Output, Self::Error>;

    fn emit_unit(&mut self, unit: &CompiledUnit) -> Result<Vec<Self::Output>, Self::Error> {
        unit.classes.iter().map(|c| self.emit_class(c)).collect()
    }
}

/// Textual disassembly, one instruction per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListingEmitter;

impl TargetEmitter for ListingEmitter {
    type Output = String;
    type Error = fmt::Error;

    fn emit_class(&mut self, class: &ClassArtifact) -> Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(
            out,
            "{} {} extends {} [{:#06x}]",
            if class.modifiers.contains(Modifiers::INTERFACE) { "interface" } else { "class" },
            class.name,
            class.superclass,
            class.modifiers.bits()
        )?;
        if let Some(source) = &class.source_file {
            writeln!(out, "  source {source}")?;
        }
        for interface in &class.interfaces {
            writeln!(out, "  implements {interface}")?;
        }
        for field in &class.fields {
            writeln!(
                out,
                "  field {} {} [{:#06x}]",
                field.name,
                field.descriptor(),
                field.modifiers.bits()
            )?;
        }
        for method in &class.methods {
            writeln!(
                out,
                "  method {}{} [{:#06x}]",
                method.name,
                method.descriptor,
                method.modifiers.bits()
            )?;
            for exception in &method.exceptions {
                writeln!(out, "    throws {exception}")?;
            }
            for instruction in &method.instructions {
                match instruction {
                    Instruction::Label(_) => writeln!(out, "   {instruction}")?,
                    _ => writeln!(out, "    {instruction}")?,
                }
            }
            for handler in &method.handlers {
                writeln!(out, "    catch {handler}")?;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_class() -> ClassArtifact {
        let mut class = ClassArtifact::new("mainixc", "java/lang/Object", Modifiers::PUBLIC);
        class.source_file = Some("main.ix".to_string());
        class.fields.push(FieldArtifact {
            name: "count".to_string(),
            ty: SemanticType::INT,
            modifiers: Modifiers::PUBLIC | Modifiers::STATIC,
        });
        class.methods.push(MethodArtifact {
            name: "answer".to_string(),
            descriptor: "()I".to_string(),
            modifiers: Modifiers::PUBLIC | Modifiers::STATIC,
            exceptions: Vec::new(),
            instructions: vec![
                Instruction::IntInsn(Opcode::Bipush, 42),
                Instruction::Insn(Opcode::Ireturn),
            ],
            handlers: Vec::new(),
        });
        class
    }

    #[test]
    fn listing_contains_members() {
        let listing = ListingEmitter.emit_class(&sample_class()).unwrap();
        assert!(listing.contains("class mainixc extends java/lang/Object"));
        assert!(listing.contains("field count I"));
        assert!(listing.contains("method answer()I"));
        assert!(listing.contains("    bipush 42"));
    }

    #[test]
    fn listing_shows_exception_table() {
        let mut class = sample_class();
        class.methods[0].handlers.push(ExceptionHandler {
            start: Label(0),
            end: Label(1),
            handler: Label(2),
            catch_type: Some("java/lang/Exception".to_string()),
        });
        class.methods[0].handlers.push(ExceptionHandler {
            start: Label(0),
            end: Label(1),
            handler: Label(3),
            catch_type: None,
        });
        let listing = ListingEmitter.emit_class(&class).unwrap();
        assert!(listing.contains("    catch L0..L1 -> L2 java/lang/Exception"));
        assert!(listing.contains("    catch L0..L1 -> L3 any"));

        let shape = ClassArtifact::new("Shape", "java/lang/Object", Modifiers::PUBLIC | Modifiers::INTERFACE);
        let listing = ListingEmitter.emit_class(&shape).unwrap();
        assert!(listing.starts_with("interface Shape extends java/lang/Object"));
    }

    #[test]
    fn method_lookup() {
        let class = sample_class();
        assert!(class.method("answer").is_some());
        assert!(class.method_with("answer", "()V").is_none());
        class
            .method("answer")
            .unwrap()
            .assert_opcodes(&[Opcode::Bipush, Opcode::Ireturn]);
    }

    #[test]
    fn jump_targets_are_distinct() {
        let method = MethodArtifact {
            instructions: vec![
                Instruction::JumpInsn(Opcode::Ifnull, Label(0)),
                Instruction::JumpInsn(Opcode::Ifnull, Label(0)),
                Instruction::JumpInsn(Opcode::Goto, Label(1)),
                Instruction::Label(Label(0)),
            ],
            ..MethodArtifact::default()
        };
        assert_eq!(method.jump_targets(Opcode::Ifnull), vec![Label(0)]);
        assert_eq!(method.count_label_marks(Label(0)), 1);
    }
}
