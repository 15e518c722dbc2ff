//! Binary operator compilation.
//!
//! Operators are first classified into an [`Operation`] from the operand
//! types, then emitted. Comparisons and logical operators are materialized
//! from [`compare::compile_condition`](super::compare::compile_condition);
//! `+` with a `String` operand is delegated to [`concat`](super::concat).

use ixion_ast::{BinaryCategory, BinaryExpr, BinaryOp};
use ixion_core::{CompilationError, PrimitiveKind, SemanticType, Span, get_larger};
use ixion_registry::HostTypeResolver;

use super::{ExprCompiler, Result, compare, concat, emit_operand_conversion, operand_kind};
use crate::bytecode::Opcode;
use crate::conversion::{classify, classify_with_boxing, emit_conversion};
use crate::emit::BytecodeEmitter;

/// What a binary operator does with its operand types.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// String concatenation.
    Concat,
    /// `String * int`; the flag is false for `int * String`.
    Repeat { string_first: bool },
    /// Arithmetic computed in the given kind.
    Arithmetic(PrimitiveKind),
    Bitwise(PrimitiveKind),
    /// Shift of a value of the given kind by an int distance.
    Shift(PrimitiveKind),
    /// Comparisons and logical operators.
    Condition,
    /// `??` with its result type.
    Coalesce(SemanticType),
}

impl Operation {
    pub fn result_type(&self) -> SemanticType {
        match self {
            Operation::Concat | Operation::Repeat { .. } => SemanticType::string(),
            Operation::Arithmetic(kind) | Operation::Bitwise(kind) | Operation::Shift(kind) => {
                SemanticType::Primitive(*kind)
            }
            Operation::Condition => SemanticType::BOOLEAN,
            Operation::Coalesce(ty) => ty.clone(),
        }
    }
}

/// Classify `left op right`.
pub fn classify_operation(
    resolver: &dyn HostTypeResolver,
    op: BinaryOp,
    left: &SemanticType,
    right: &SemanticType,
    span: Span,
) -> Result<Operation> {
    let invalid = || {
        CompilationError::invalid_operation(
            format!("Operator '{op}' cannot be applied to '{left}' and '{right}'."),
            span,
        )
    };
    let kinds = (operand_kind(left), operand_kind(right));
    match op.category() {
        BinaryCategory::Arithmetic => {
            if op == BinaryOp::Add && (left.is_string() || right.is_string()) {
                if left.is_void() || right.is_void() {
                    return Err(invalid());
                }
                return Ok(Operation::Concat);
            }
            if op == BinaryOp::Mul {
                if left.is_string() && repeat_count(right) {
                    return Ok(Operation::Repeat { string_first: true });
                }
                if right.is_string() && repeat_count(left) {
                    return Ok(Operation::Repeat { string_first: false });
                }
            }
            match kinds {
                (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Ok(Operation::Arithmetic(larger(a, b))),
                _ => Err(invalid()),
            }
        }
        BinaryCategory::Bitwise => match kinds {
            (Some(a), Some(b)) if op.is_shift() && a.is_integer() && b.is_integer() => {
                Ok(Operation::Shift(promote_integer(a == PrimitiveKind::Long)))
            }
            (Some(PrimitiveKind::Boolean), Some(PrimitiveKind::Boolean)) if !op.is_shift() => {
                Ok(Operation::Bitwise(PrimitiveKind::Boolean))
            }
            (Some(a), Some(b)) if !op.is_shift() && a.is_integer() && b.is_integer() => Ok(Operation::Bitwise(
                promote_integer(a == PrimitiveKind::Long || b == PrimitiveKind::Long),
            )),
            _ => Err(invalid()),
        },
        BinaryCategory::Equality => {
            compare::check_identity(op, left, right, span)?;
            Ok(Operation::Condition)
        }
        BinaryCategory::Relational | BinaryCategory::Logical => Ok(Operation::Condition),
        BinaryCategory::Coalesce => coalesce_type(resolver, left, right, span).map(Operation::Coalesce),
    }
}

fn repeat_count(ty: &SemanticType) -> bool {
    operand_kind(ty).is_some_and(|k| k.is_integer() && k != PrimitiveKind::Long)
}

pub(super) fn larger(a: PrimitiveKind, b: PrimitiveKind) -> PrimitiveKind {
    let (a, b) = (SemanticType::Primitive(a), SemanticType::Primitive(b));
    get_larger(&a, &b).primitive().unwrap_or(PrimitiveKind::Int)
}

fn promote_integer(long: bool) -> PrimitiveKind {
    if long { PrimitiveKind::Long } else { PrimitiveKind::Int }
}

/// Result type of `left ?? right`: the non-nullable left type when the
/// right side always yields a value of it.
fn coalesce_type(
    resolver: &dyn HostTypeResolver,
    left: &SemanticType,
    right: &SemanticType,
    span: Span,
) -> Result<SemanticType> {
    if !left.is_object_like() || !left.is_nullable() {
        return Err(CompilationError::invalid_operation(
            format!("Left side of '??' must be nullable ('{left}')."),
            span,
        ));
    }
    let target = left.as_non_nullable();
    if classify(resolver, &target, right).is_some() {
        return Ok(target);
    }
    if target.unboxed_kind().is_some() && classify_with_boxing(resolver, &target, right).is_some() {
        return Ok(target);
    }
    Err(CompilationError::type_mismatch(
        format!("Cannot perform '??' on types '{left}' and '{right}'"),
        span,
    ))
}

// =============================================================================
// Typing and emission
// =============================================================================

pub fn type_of_binary(compiler: &ExprCompiler<'_, '_>, bin: &BinaryExpr<'_>) -> Result<SemanticType> {
    let left = compiler.type_of(bin.left)?;
    let right = compiler.type_of(bin.right)?;
    classify_operation(compiler.resolver(), bin.op, &left, &right, bin.span).map(|op| op.result_type())
}

/// Compile a binary expression.
pub fn compile_binary(compiler: &mut ExprCompiler<'_, '_>, bin: &BinaryExpr<'_>) -> Result<SemanticType> {
    let left = compiler.type_of(bin.left)?;
    let right = compiler.type_of(bin.right)?;
    let operation = classify_operation(compiler.resolver(), bin.op, &left, &right, bin.span)?;
    let result = operation.result_type();

    match operation {
        Operation::Concat => concat::compile_concat(compiler, bin)?,
        Operation::Repeat { string_first } => {
            compiler.infer(bin.left)?;
            if string_first {
                compiler.infer(bin.right)?;
                emit_operand_conversion(compiler.emitter(), &right, PrimitiveKind::Int);
            } else {
                emit_operand_conversion(compiler.emitter(), &left, PrimitiveKind::Int);
                compiler.infer(bin.right)?;
                compiler.emitter().swap(&SemanticType::string(), &SemanticType::INT);
            }
            emit_repeat(compiler.emitter());
        }
        Operation::Arithmetic(kind) | Operation::Bitwise(kind) => {
            compiler.infer(bin.left)?;
            emit_operand_conversion(compiler.emitter(), &left, kind);
            compiler.infer(bin.right)?;
            emit_operand_conversion(compiler.emitter(), &right, kind);
            emit_operator(compiler.emitter(), bin.op, kind);
        }
        Operation::Shift(kind) => {
            compiler.infer(bin.left)?;
            emit_operand_conversion(compiler.emitter(), &left, kind);
            compiler.infer(bin.right)?;
            emit_operand_conversion(compiler.emitter(), &right, PrimitiveKind::Int);
            emit_operator(compiler.emitter(), bin.op, kind);
        }
        Operation::Condition => compare::materialize_binary(compiler, bin)?,
        Operation::Coalesce(ref ty) => {
            compiler.infer(bin.left)?;
            let end = compiler.emitter().new_label();
            let emitter = compiler.emitter();
            emitter.dup(&left);
            emitter.emit_jump(Opcode::Ifnonnull, end);
            emitter.pop(&left);
            compiler.infer(bin.right)?;
            emit_conversion(compiler.emitter(), ty, &right);
            compiler.emitter().mark(end);
        }
    }
    Ok(result)
}

/// `invokevirtual String.repeat(I)` over `[string, count]`.
pub fn emit_repeat(emitter: &mut BytecodeEmitter) {
    emitter.emit_invoke(
        Opcode::Invokevirtual,
        "java/lang/String",
        "repeat",
        "(I)Ljava/lang/String;",
        false,
    );
}

/// The typed instruction of an arithmetic, bitwise, or shift operator.
pub fn emit_operator(emitter: &mut BytecodeEmitter, op: BinaryOp, kind: PrimitiveKind) {
    let base = match op {
        BinaryOp::Add => Opcode::Iadd,
        BinaryOp::Sub => Opcode::Isub,
        BinaryOp::Mul => Opcode::Imul,
        BinaryOp::Div => Opcode::Idiv,
        BinaryOp::Mod => Opcode::Irem,
        BinaryOp::BitAnd => Opcode::Iand,
        BinaryOp::BitOr => Opcode::Ior,
        BinaryOp::BitXor => Opcode::Ixor,
        BinaryOp::ShiftLeft => Opcode::Ishl,
        BinaryOp::ShiftRight => Opcode::Ishr,
        BinaryOp::ShiftRightUnsigned => Opcode::Iushr,
        _ => return,
    };
    emitter.emit(base.typed(&SemanticType::Primitive(kind)));
}
