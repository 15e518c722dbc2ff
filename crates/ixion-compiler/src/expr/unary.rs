//! Prefix operators `!`, `-` and `~`.

use ixion_ast::{UnaryExpr, UnaryOp};
use ixion_core::{CompilationError, PrimitiveKind, SemanticType};

use super::{ExprCompiler, Result, compare, emit_operand_conversion, operand_kind};
use crate::bytecode::Opcode;

/// Kind the operator computes in; sub-int operands promote to int.
fn operation_kind(op: UnaryOp, operand: &SemanticType, un: &UnaryExpr<'_>) -> Result<PrimitiveKind> {
    let kind = operand_kind(operand).filter(|kind| match op {
        UnaryOp::Not => *kind == PrimitiveKind::Boolean,
        UnaryOp::Neg => kind.is_numeric(),
        UnaryOp::BitNot => kind.is_integer(),
    });
    let Some(kind) = kind else {
        return Err(CompilationError::invalid_operation(
            format!("Operator '{op}' cannot be applied to '{operand}'."),
            un.span,
        ));
    };
    Ok(match kind {
        PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char => PrimitiveKind::Int,
        other => other,
    })
}

pub fn type_of_unary(compiler: &ExprCompiler<'_, '_>, un: &UnaryExpr<'_>) -> Result<SemanticType> {
    let operand = compiler.type_of(un.operand)?;
    operation_kind(un.op, &operand, un).map(SemanticType::Primitive)
}

pub fn compile_unary(compiler: &mut ExprCompiler<'_, '_>, un: &UnaryExpr<'_>) -> Result<SemanticType> {
    let operand = compiler.type_of(un.operand)?;
    let kind = operation_kind(un.op, &operand, un)?;
    let result = SemanticType::Primitive(kind);

    match un.op {
        UnaryOp::Not => {
            compare::materialize(compiler, |compiler, false_label| {
                compare::compile_not(compiler, un, false_label)
            })?;
        }
        UnaryOp::Neg => {
            compiler.infer(un.operand)?;
            let emitter = compiler.emitter();
            emit_operand_conversion(emitter, &operand, kind);
            emitter.emit(Opcode::Ineg.typed(&result));
        }
        UnaryOp::BitNot => {
            compiler.infer(un.operand)?;
            let emitter = compiler.emitter();
            emit_operand_conversion(emitter, &operand, kind);
            if kind == PrimitiveKind::Long {
                emitter.push_long(-1);
                emitter.emit(Opcode::Lxor);
            } else {
                emitter.push_int(-1);
                emitter.emit(Opcode::Ixor);
            }
        }
    }
    Ok(result)
}
