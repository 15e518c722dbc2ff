//! Structured instructions handed to the target emitter.

use std::fmt;

use ixion_core::ConstValue;

use super::Opcode;

/// A branch target, unique within one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// One exception-table entry: throws between `start` (inclusive) and `end`
/// (exclusive) of type `catch_type` transfer to `handler`. `None` catches
/// everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionHandler {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    pub catch_type: Option<String>,
}

impl fmt::Display for ExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{} -> {} {}",
            self.start,
            self.end,
            self.handler,
            self.catch_type.as_deref().unwrap_or("any")
        )
    }
}

/// A field or method reference: owner class, member name, descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.descriptor)
    }
}

/// A static method handle used by bootstrap methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    pub target: MemberRef,
    pub interface: bool,
}

/// Static arguments passed to a bootstrap method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BootstrapArg {
    String(String),
    /// A method type given by descriptor.
    MethodType(String),
    Handle(MethodHandle),
}

/// An `invokedynamic` call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DynamicCall {
    pub name: String,
    pub descriptor: String,
    pub bootstrap: MethodHandle,
    pub bootstrap_args: Vec<BootstrapArg>,
}

/// One instruction, label, or debug marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// No operand.
    Insn(Opcode),
    /// `bipush`, `sipush`, `newarray`.
    IntInsn(Opcode, i32),
    Ldc(ConstValue),
    /// Local load/store.
    VarInsn(Opcode, u16),
    Iinc { slot: u16, delta: i16 },
    /// `new`, `anewarray`, `checkcast`, `instanceof`.
    TypeInsn(Opcode, String),
    FieldInsn(Opcode, MemberRef),
    /// Invocation; the flag marks an interface owner.
    MethodInsn(Opcode, MemberRef, bool),
    InvokeDynamic(DynamicCall),
    JumpInsn(Opcode, Label),
    Label(Label),
    /// Source line starting at the label.
    LineNumber(u32, Label),
    MultiANewArray(String, u8),
}

impl Instruction {
    /// The opcode, `None` for labels and line markers.
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Instruction::Insn(op)
            | Instruction::IntInsn(op, _)
            | Instruction::VarInsn(op, _)
            | Instruction::TypeInsn(op, _)
            | Instruction::FieldInsn(op, _)
            | Instruction::MethodInsn(op, _, _)
            | Instruction::JumpInsn(op, _) => Some(*op),
            Instruction::Ldc(_) => Some(Opcode::Ldc),
            Instruction::Iinc { .. } => Some(Opcode::Iinc),
            Instruction::InvokeDynamic(_) => Some(Opcode::Invokedynamic),
            Instruction::MultiANewArray(..) => Some(Opcode::Multianewarray),
            Instruction::Label(_) | Instruction::LineNumber(..) => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Insn(op) => write!(f, "{op}"),
            Instruction::IntInsn(op, value) => write!(f, "{op} {value}"),
            Instruction::Ldc(ConstValue::String(s)) => write!(f, "ldc {s:?}"),
            Instruction::Ldc(value) => write!(f, "ldc {value}"),
            Instruction::VarInsn(op, slot) => write!(f, "{op} {slot}"),
            Instruction::Iinc { slot, delta } => write!(f, "iinc {slot} {delta}"),
            Instruction::TypeInsn(op, name) => write!(f, "{op} {name}"),
            Instruction::FieldInsn(op, member) => write!(f, "{op} {member}"),
            Instruction::MethodInsn(op, member, _) => write!(f, "{op} {member}"),
            Instruction::InvokeDynamic(call) => {
                write!(f, "invokedynamic {}:{} [{}]", call.name, call.descriptor, call.bootstrap.target)
            }
            Instruction::JumpInsn(op, label) => write!(f, "{op} {label}"),
            Instruction::Label(label) => write!(f, "{label}:"),
            Instruction::LineNumber(line, label) => write!(f, "line {line} {label}"),
            Instruction::MultiANewArray(descriptor, dims) => {
                write!(f, "multianewarray {descriptor} {dims}")
            }
        }
    }
}
