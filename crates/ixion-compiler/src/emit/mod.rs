//! Bytecode emitter for the Ixion compiler.
//!
//! The [`BytecodeEmitter`] wraps the [`MethodBuilder`] of the method being
//! emitted and picks the typed, width-aware form of each instruction.
//!
//! # Example
//!
//! ```ignore
//! let mut emitter = BytecodeEmitter::new(MethodBuilder::new("f", "()D", mods), true);
//!
//! emitter.set_line(1);
//! emitter.push_int(1);
//! emitter.cast_primitive(PrimitiveKind::Int, PrimitiveKind::Double);
//! emitter.push_double(2.0);
//! emitter.emit(Opcode::Dadd);
//! emitter.return_value(&SemanticType::DOUBLE);
//!
//! let method = emitter.finish();
//! ```

mod loops;

pub use loops::{LoopLabels, LoopStack};

use ixion_core::{ConstValue, PrimitiveKind, SemanticType};

use crate::bytecode::{
    DynamicCall, ExceptionHandler, Instruction, Label, MemberRef, MethodArtifact, MethodBuilder, Opcode,
    newarray_type_code,
};

/// Emits the instructions of one method.
#[derive(Debug)]
pub struct BytecodeEmitter {
    method: MethodBuilder,
    line_numbers: bool,
    current_line: Option<u32>,
}

impl BytecodeEmitter {
    /// Create an emitter writing into `method`.
    ///
    /// # Arguments
    /// * `method` - the empty method body
    /// * `line_numbers` - whether `set_line` emits line markers
    pub fn new(method: MethodBuilder, line_numbers: bool) -> Self {
        Self {
            method,
            line_numbers,
            current_line: None,
        }
    }

    /// Set the current source line, marking it when it changed.
    pub fn set_line(&mut self, line: u32) {
        if !self.line_numbers || self.current_line == Some(line) {
            return;
        }
        self.current_line = Some(line);
        let label = self.method.new_label();
        self.method.push(Instruction::Label(label));
        self.method.push(Instruction::LineNumber(line, label));
    }

    pub fn current_line(&self) -> Option<u32> {
        self.current_line
    }

    pub fn new_label(&mut self) -> Label {
        self.method.new_label()
    }

    /// Place `label` at the current position.
    pub fn mark(&mut self, label: Label) {
        self.method.push(Instruction::Label(label));
    }

    /// Route throws in `start..end` of `catch_type` (any when `None`) to
    /// `handler`.
    pub fn add_handler(&mut self, start: Label, end: Label, handler: Label, catch_type: Option<String>) {
        self.method.add_handler(ExceptionHandler {
            start,
            end,
            handler,
            catch_type,
        });
    }

    pub fn method(&self) -> &MethodArtifact {
        self.method.artifact()
    }

    /// Number of real instructions emitted so far.
    pub fn code_len(&self) -> usize {
        self.method
            .instructions()
            .iter()
            .filter(|insn| insn.opcode().is_some())
            .count()
    }

    pub fn last_opcode(&self) -> Option<Opcode> {
        self.method.last_opcode()
    }

    pub fn finish(self) -> MethodArtifact {
        self.method.finish()
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    pub fn emit(&mut self, op: Opcode) {
        self.method.push(Instruction::Insn(op));
    }

    pub fn emit_int_insn(&mut self, op: Opcode, value: i32) {
        self.method.push(Instruction::IntInsn(op, value));
    }

    pub fn emit_type(&mut self, op: Opcode, internal_name: impl Into<String>) {
        self.method.push(Instruction::TypeInsn(op, internal_name.into()));
    }

    pub fn emit_jump(&mut self, op: Opcode, label: Label) {
        self.method.push(Instruction::JumpInsn(op, label));
    }

    pub fn emit_field(&mut self, op: Opcode, owner: &str, name: &str, ty: &SemanticType) {
        self.method.push(Instruction::FieldInsn(
            op,
            MemberRef::new(owner, name, ty.descriptor()),
        ));
    }

    pub fn emit_invoke(&mut self, op: Opcode, owner: &str, name: &str, descriptor: &str, interface: bool) {
        self.method.push(Instruction::MethodInsn(
            op,
            MemberRef::new(owner, name, descriptor),
            interface,
        ));
    }

    pub fn emit_dynamic(&mut self, call: DynamicCall) {
        self.method.push(Instruction::InvokeDynamic(call));
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// Push an int using the shortest encoding.
    pub fn push_int(&mut self, value: i32) {
        match value {
            -1 => self.emit(Opcode::IconstM1),
            0 => self.emit(Opcode::Iconst0),
            1 => self.emit(Opcode::Iconst1),
            2 => self.emit(Opcode::Iconst2),
            3 => self.emit(Opcode::Iconst3),
            4 => self.emit(Opcode::Iconst4),
            5 => self.emit(Opcode::Iconst5),
            -128..=127 => self.emit_int_insn(Opcode::Bipush, value),
            -32768..=32767 => self.emit_int_insn(Opcode::Sipush, value),
            _ => self.method.push(Instruction::Ldc(ConstValue::Int(value))),
        }
    }

    pub fn push_long(&mut self, value: i64) {
        match value {
            0 => self.emit(Opcode::Lconst0),
            1 => self.emit(Opcode::Lconst1),
            _ => self.method.push(Instruction::Ldc(ConstValue::Long(value))),
        }
    }

    pub fn push_float(&mut self, value: f32) {
        // Bit comparison keeps -0.0 on the ldc path.
        match value.to_bits() {
            bits if bits == 0f32.to_bits() => self.emit(Opcode::Fconst0),
            bits if bits == 1f32.to_bits() => self.emit(Opcode::Fconst1),
            bits if bits == 2f32.to_bits() => self.emit(Opcode::Fconst2),
            _ => self.method.push(Instruction::Ldc(ConstValue::float(value))),
        }
    }

    pub fn push_double(&mut self, value: f64) {
        match value.to_bits() {
            bits if bits == 0f64.to_bits() => self.emit(Opcode::Dconst0),
            bits if bits == 1f64.to_bits() => self.emit(Opcode::Dconst1),
            _ => self.method.push(Instruction::Ldc(ConstValue::double(value))),
        }
    }

    pub fn push_string(&mut self, value: &str) {
        self.method.push(Instruction::Ldc(ConstValue::String(value.to_string())));
    }

    pub fn push_null(&mut self) {
        self.emit(Opcode::AconstNull);
    }

    pub fn push_const(&mut self, value: &ConstValue) {
        match value {
            ConstValue::Int(v) => self.push_int(*v),
            ConstValue::Long(v) => self.push_long(*v),
            ConstValue::Float(v) => self.push_float(v.into_inner()),
            ConstValue::Double(v) => self.push_double(v.into_inner()),
            ConstValue::Bool(v) => self.push_int(i32::from(*v)),
            ConstValue::Char(v) => self.push_int(i32::from(*v)),
            ConstValue::String(v) => self.push_string(v),
            ConstValue::Null => self.push_null(),
        }
    }

    /// Push the zero value of `ty`.
    pub fn push_default(&mut self, ty: &SemanticType) {
        match ty.primitive() {
            Some(PrimitiveKind::Void) => {}
            Some(PrimitiveKind::Long) => self.emit(Opcode::Lconst0),
            Some(PrimitiveKind::Float) => self.emit(Opcode::Fconst0),
            Some(PrimitiveKind::Double) => self.emit(Opcode::Dconst0),
            Some(_) => self.emit(Opcode::Iconst0),
            None => self.push_null(),
        }
    }

    // ==========================================================================
    // Local Variables
    // ==========================================================================

    pub fn load(&mut self, ty: &SemanticType, slot: u16) {
        self.method
            .push(Instruction::VarInsn(Opcode::Iload.typed(ty), slot));
    }

    pub fn store(&mut self, ty: &SemanticType, slot: u16) {
        self.method
            .push(Instruction::VarInsn(Opcode::Istore.typed(ty), slot));
    }

    pub fn iinc(&mut self, slot: u16, delta: i16) {
        self.method.push(Instruction::Iinc { slot, delta });
    }

    /// Typed return; `void` returns nothing.
    pub fn return_value(&mut self, ty: &SemanticType) {
        if ty.is_void() {
            self.emit(Opcode::Return);
        } else {
            self.emit(Opcode::Ireturn.typed(ty));
        }
    }

    // ==========================================================================
    // Stack Shuffling
    // ==========================================================================

    /// Discard a value of `ty`; `void` discards nothing.
    pub fn pop(&mut self, ty: &SemanticType) {
        match ty.slot_width() {
            0 => {}
            1 => self.emit(Opcode::Pop),
            _ => self.emit(Opcode::Pop2),
        }
    }

    pub fn dup(&mut self, ty: &SemanticType) {
        match ty.slot_width() {
            0 => {}
            1 => self.emit(Opcode::Dup),
            _ => self.emit(Opcode::Dup2),
        }
    }

    /// Copy the top value of `ty` below the single-unit value under it.
    pub fn dup_x1(&mut self, ty: &SemanticType) {
        match ty.slot_width() {
            0 => {}
            1 => self.emit(Opcode::DupX1),
            _ => self.emit(Opcode::Dup2X1),
        }
    }

    /// Copy the top value of `ty` below the two units under it.
    pub fn dup_x2(&mut self, ty: &SemanticType) {
        match ty.slot_width() {
            0 => {}
            1 => self.emit(Opcode::DupX2),
            _ => self.emit(Opcode::Dup2X2),
        }
    }

    /// Exchange the two top values given their types.
    pub fn swap(&mut self, top: &SemanticType, below: &SemanticType) {
        match (top.slot_width(), below.slot_width()) {
            (1, 1) => self.emit(Opcode::Swap),
            (1, _) => {
                self.emit(Opcode::DupX2);
                self.emit(Opcode::Pop);
            }
            (_, 1) => {
                self.emit(Opcode::Dup2X1);
                self.emit(Opcode::Pop2);
            }
            _ => {
                self.emit(Opcode::Dup2X2);
                self.emit(Opcode::Pop2);
            }
        }
    }

    // ==========================================================================
    // Conversions
    // ==========================================================================

    /// Convert the primitive on top of the stack. Returns whether anything
    /// was emitted.
    pub fn cast_primitive(&mut self, from: PrimitiveKind, to: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        if from == to || to == Void || to == Boolean {
            return false;
        }
        let before = self.method.len();
        match from {
            Double => match to {
                Float => self.emit(Opcode::D2f),
                Long => self.emit(Opcode::D2l),
                _ => {
                    self.emit(Opcode::D2i);
                    self.narrow_int(to);
                }
            },
            Float => match to {
                Double => self.emit(Opcode::F2d),
                Long => self.emit(Opcode::F2l),
                _ => {
                    self.emit(Opcode::F2i);
                    self.narrow_int(to);
                }
            },
            Long => match to {
                Double => self.emit(Opcode::L2d),
                Float => self.emit(Opcode::L2f),
                _ => {
                    self.emit(Opcode::L2i);
                    self.narrow_int(to);
                }
            },
            Void => {}
            _ => match to {
                Long => self.emit(Opcode::I2l),
                Float => self.emit(Opcode::I2f),
                Double => self.emit(Opcode::I2d),
                _ => self.narrow_int(to),
            },
        }
        self.method.len() > before
    }

    fn narrow_int(&mut self, to: PrimitiveKind) {
        match to {
            PrimitiveKind::Byte => self.emit(Opcode::I2b),
            PrimitiveKind::Char => self.emit(Opcode::I2c),
            PrimitiveKind::Short => self.emit(Opcode::I2s),
            _ => {}
        }
    }

    /// Box the primitive on top of the stack into its wrapper.
    pub fn box_primitive(&mut self, kind: PrimitiveKind) {
        let Some(wrapper) = kind.wrapper_class() else {
            return;
        };
        let descriptor = format!("({})L{wrapper};", kind.descriptor());
        self.emit_invoke(Opcode::Invokestatic, wrapper, "valueOf", &descriptor, false);
    }

    /// Unbox the wrapper on top of the stack.
    pub fn unbox(&mut self, kind: PrimitiveKind) {
        let Some(wrapper) = kind.wrapper_class() else {
            return;
        };
        let descriptor = format!("(){}", kind.descriptor());
        self.emit_invoke(Opcode::Invokevirtual, wrapper, kind.unbox_method(), &descriptor, false);
    }

    /// Reduce two values of `kind` to an int comparison result when the
    /// kind has no direct compare-and-branch. Returns whether it did.
    ///
    /// `nan_greater` selects the floating variant that yields 1 for NaN, so
    /// a negated `<` or `<=` branch is taken when either operand is NaN.
    pub fn compare(&mut self, kind: PrimitiveKind, nan_greater: bool) -> bool {
        match kind {
            PrimitiveKind::Long => self.emit(Opcode::Lcmp),
            PrimitiveKind::Float if nan_greater => self.emit(Opcode::Fcmpg),
            PrimitiveKind::Float => self.emit(Opcode::Fcmpl),
            PrimitiveKind::Double if nan_greater => self.emit(Opcode::Dcmpg),
            PrimitiveKind::Double => self.emit(Opcode::Dcmpl),
            _ => return false,
        }
        true
    }

    // ==========================================================================
    // Arrays
    // ==========================================================================

    pub fn array_load(&mut self, element: &SemanticType) {
        self.emit(Opcode::Iaload.typed(element));
    }

    pub fn array_store(&mut self, element: &SemanticType) {
        self.emit(Opcode::Iastore.typed(element));
    }

    /// One-dimensional array of `element`, length on the stack.
    pub fn new_array(&mut self, element: &SemanticType) {
        match element.primitive() {
            Some(kind) => self.emit_int_insn(Opcode::Newarray, newarray_type_code(kind)),
            None => self.emit_type(Opcode::Anewarray, element.internal_name()),
        }
    }

    /// Multi-dimensional array, `dimensions` lengths on the stack.
    pub fn new_multi_array(&mut self, array: &SemanticType, dimensions: u8) {
        self.method
            .push(Instruction::MultiANewArray(array.descriptor(), dimensions));
    }
}
