//! `e is T` and `e to T`.

use ixion_ast::{CastExpr, IsExpr};
use ixion_core::{CompilationError, PrimitiveKind, SemanticType, Span};
use ixion_registry::HostTypeResolver;

use super::{ExprCompiler, Result};
use crate::bytecode::Opcode;
use crate::conversion::classify;

/// Type `is` checks against; must be a non-nullable reference.
pub fn instance_check_type(compiler: &ExprCompiler<'_, '_>, is: &IsExpr<'_>) -> Result<SemanticType> {
    let operand = compiler.type_of(is.expr)?;
    if !operand.is_object_like() {
        return Err(CompilationError::invalid_operation(
            format!("Can only perform 'instanceof' on objects (got '{operand}')"),
            is.span,
        ));
    }
    let ty = compiler.ctx().resolve_type(&is.ty)?;
    if ty.is_primitive() {
        return Err(CompilationError::invalid_operation(
            format!("Can only perform 'instanceof' on objects (got '{ty}')"),
            is.span,
        ));
    }
    if ty.is_nullable() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot check for an instance of a nullable type ('{ty}')"),
            is.span,
        ));
    }
    Ok(ty)
}

pub fn compile_is(compiler: &mut ExprCompiler<'_, '_>, is: &IsExpr<'_>) -> Result<SemanticType> {
    let ty = instance_check_type(compiler, is)?;
    compiler.infer(is.expr)?;
    compiler
        .emitter()
        .emit_type(Opcode::Instanceof, ty.internal_name());
    Ok(SemanticType::BOOLEAN)
}

// =============================================================================
// Casts
// =============================================================================

/// How a cast converts its operand.
#[derive(Debug, Clone, PartialEq)]
enum CastKind {
    /// Same class; nothing to emit.
    Identity,
    Primitive(PrimitiveKind, PrimitiveKind),
    Checkcast,
    /// `String` parsed by a static `parse*` method of the wrapper.
    Parse(PrimitiveKind),
    Box(PrimitiveKind),
    Unbox(PrimitiveKind),
}

fn classify_cast(
    resolver: &dyn HostTypeResolver,
    from: &SemanticType,
    to: &SemanticType,
    span: Span,
) -> Result<CastKind> {
    if from.is_void() {
        return Err(CompilationError::invalid_operation("Cannot cast from void", span));
    }
    if from.as_non_nullable() == to.as_non_nullable() {
        return Ok(CastKind::Identity);
    }
    let (from_name, to_name) = (from.as_non_nullable(), to.as_non_nullable());
    let unrelated =
        || CompilationError::invalid_operation(format!("Cannot cast type '{from_name}' to '{to_name}'"), span);
    let mixed = || {
        CompilationError::invalid_operation(
            format!("Cannot cast between objects and primitives ('{from_name}' to '{to_name}')"),
            span,
        )
    };

    match (from.primitive(), to.primitive()) {
        (Some(a), Some(b)) => {
            if a == PrimitiveKind::Boolean || b == PrimitiveKind::Boolean || b == PrimitiveKind::Void {
                return Err(unrelated());
            }
            Ok(CastKind::Primitive(a, b))
        }
        (None, None) => {
            let related = classify(resolver, to, from).is_some()
                || classify(resolver, &from.as_non_nullable(), &to.as_non_nullable()).is_some();
            if related { Ok(CastKind::Checkcast) } else { Err(unrelated()) }
        }
        (None, Some(kind)) if from.is_string() => match kind {
            PrimitiveKind::Int | PrimitiveKind::Long | PrimitiveKind::Double | PrimitiveKind::Boolean => {
                Ok(CastKind::Parse(kind))
            }
            _ => Err(mixed()),
        },
        (None, Some(kind)) if from.unboxed_kind() == Some(kind) && !from.is_nullable() => Ok(CastKind::Unbox(kind)),
        (Some(kind), None) if to.unboxed_kind() == Some(kind) => Ok(CastKind::Box(kind)),
        _ => Err(mixed()),
    }
}

fn parse_method(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Long => "parseLong",
        PrimitiveKind::Double => "parseDouble",
        PrimitiveKind::Boolean => "parseBoolean",
        _ => "parseInt",
    }
}

pub fn compile_cast(compiler: &mut ExprCompiler<'_, '_>, cast: &CastExpr<'_>) -> Result<SemanticType> {
    let to = compiler.ctx().resolve_type(&cast.ty)?;
    let from = compiler.type_of(cast.expr)?;
    let kind = classify_cast(compiler.resolver(), &from, &to, cast.span)?;

    compiler.infer(cast.expr)?;
    let emitter = compiler.emitter();
    match kind {
        CastKind::Identity => {}
        CastKind::Primitive(a, b) => {
            emitter.cast_primitive(a, b);
        }
        CastKind::Checkcast => emitter.emit_type(Opcode::Checkcast, to.internal_name()),
        CastKind::Parse(kind) => {
            let Some(wrapper) = kind.wrapper_class() else {
                return Err(CompilationError::internal("no wrapper for parse target", cast.span));
            };
            let descriptor = format!("(Ljava/lang/String;){}", kind.descriptor());
            emitter.emit_invoke(Opcode::Invokestatic, wrapper, parse_method(kind), &descriptor, false);
        }
        CastKind::Box(kind) => emitter.box_primitive(kind),
        CastKind::Unbox(kind) => emitter.unbox(kind),
    }
    Ok(to)
}
