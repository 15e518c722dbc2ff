//! Null-safe access (`?.`, `?[`) and non-null assertion (`!`).
//!
//! A chain like `a?.b?.c()` shares one exit label: every link duplicates its
//! receiver and jumps to the label when it is null, leaving that null as the
//! chain's result. Only the outermost link marks the label. Parentheses end
//! a chain, so `(a?.b)?.c` has two.

use ixion_ast::{Expr, NonNullExpr};
use ixion_core::{CompilationError, SemanticType};
use tracing::trace;

use super::calls::{compile_method_on, resolve_method};
use super::member::{compile_index_on, element_of, emit_access, index_type, resolve_access};
use super::{ExprCompiler, Result};
use crate::bytecode::{Label, Opcode};

const NULL_POINTER_EXCEPTION: &str = "java/lang/NullPointerException";

/// The receiver of a null-safe link and the token naming the access.
fn link_parts<'e, 'ast>(expr: &'e Expr<'ast>) -> Option<(&'ast Expr<'ast>, &'static str)> {
    match expr {
        Expr::MethodCall(call) => Some((call.receiver, "?.")),
        Expr::Member(m) => Some((m.receiver, "?.")),
        Expr::Index(i) => Some((i.target, "?[")),
        _ => None,
    }
}

/// Type of the access on the non-null receiver type `owner`.
fn access_type(compiler: &ExprCompiler<'_, '_>, owner: &SemanticType, expr: &Expr<'_>) -> Result<SemanticType> {
    match expr {
        Expr::MethodCall(call) => {
            resolve_method(compiler, owner, &call.name, call.args, false, call.span).map(|t| t.return_type)
        }
        Expr::Member(m) => resolve_access(compiler, owner, &m.name, false).map(|a| a.result_type()),
        Expr::Index(i) => {
            index_type(compiler, i.index)?;
            element_of(owner, i.span)
        }
        other => Err(CompilationError::internal("not a null-safe access", other.span())),
    }
}

/// A link's value is boxed and nullable; a void call yields `Object?`.
fn link_type(raw: &SemanticType) -> SemanticType {
    if raw.is_void() {
        SemanticType::object().as_nullable()
    } else {
        raw.autobox_wrapper().as_nullable()
    }
}

/// Receiver type of a link, checked to be nullable.
fn receiver_type(compiler: &ExprCompiler<'_, '_>, expr: &Expr<'_>) -> Result<(SemanticType, SemanticType)> {
    let Some((receiver, token)) = link_parts(expr) else {
        return Err(CompilationError::internal("not a null-safe access", expr.span()));
    };
    let ty = compiler.type_of(receiver)?;
    if !ty.is_nullable() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot use '{token}' on non-nullable type ('{ty}')"),
            expr.span(),
        ));
    }
    let owner = ty.as_non_nullable();
    let raw = access_type(compiler, &owner, expr)?;
    Ok((owner, raw))
}

pub fn type_of_link(compiler: &ExprCompiler<'_, '_>, expr: &Expr<'_>) -> Result<SemanticType> {
    receiver_type(compiler, expr).map(|(_, raw)| link_type(&raw))
}

/// Compile one link of a null-safe chain.
///
/// # Arguments
///
/// * `expr` - A null-safe call, member, or index expression
/// * `chain` - Exit label of the enclosing chain, if this link is the
///   receiver of another link
pub fn compile_link(
    compiler: &mut ExprCompiler<'_, '_>,
    expr: &Expr<'_>,
    chain: Option<Label>,
) -> Result<SemanticType> {
    let (owner, raw) = receiver_type(compiler, expr)?;
    let Some((receiver, _)) = link_parts(expr) else {
        return Err(CompilationError::internal("not a null-safe access", expr.span()));
    };
    let outermost = chain.is_none();
    let sentinel = match chain {
        Some(label) => label,
        None => compiler.emitter().new_label(),
    };

    compiler.ctx_mut().null_sentinel = Some(sentinel);
    compiler.infer(receiver)?;
    compiler.ctx_mut().null_sentinel = None;

    let emitter = compiler.emitter();
    emitter.emit(Opcode::Dup);
    emitter.emit_jump(Opcode::Ifnull, sentinel);

    match expr {
        Expr::MethodCall(call) => {
            compile_method_on(compiler, &owner, call)?;
        }
        Expr::Member(m) => {
            let access = resolve_access(compiler, &owner, &m.name, false)?;
            emit_access(compiler, &access);
        }
        Expr::Index(i) => {
            compile_index_on(compiler, &owner, i)?;
        }
        _ => {}
    }

    let emitter = compiler.emitter();
    if raw.is_void() {
        emitter.push_null();
    } else if let Some(kind) = raw.primitive() {
        emitter.box_primitive(kind);
    }
    if outermost {
        trace!(label = %sentinel, "closing null-safe chain");
        emitter.mark(sentinel);
    }
    Ok(link_type(&raw))
}

// =============================================================================
// Non-null assertion
// =============================================================================

pub fn type_of_non_null(compiler: &ExprCompiler<'_, '_>, assert: &NonNullExpr<'_>) -> Result<SemanticType> {
    let ty = compiler.type_of(assert.expr)?;
    if ty.is_primitive() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot assert non-null on primitive type '{ty}'"),
            assert.span,
        ));
    }
    if !ty.is_nullable() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot assert non-null on type which is already not null ('{ty}')"),
            assert.span,
        ));
    }
    Ok(ty.as_non_nullable())
}

/// `x!`: throw a `NullPointerException` when `x` is null.
pub fn compile_non_null(compiler: &mut ExprCompiler<'_, '_>, assert: &NonNullExpr<'_>) -> Result<SemanticType> {
    let ty = type_of_non_null(compiler, assert)?;
    compiler.infer(assert.expr)?;
    let emitter = compiler.emitter();
    let present = emitter.new_label();
    emitter.emit(Opcode::Dup);
    emitter.emit_jump(Opcode::Ifnonnull, present);
    emitter.emit_type(Opcode::New, NULL_POINTER_EXCEPTION);
    emitter.emit(Opcode::Dup);
    emitter.emit_invoke(Opcode::Invokespecial, NULL_POINTER_EXCEPTION, "<init>", "()V", false);
    emitter.emit(Opcode::Athrow);
    emitter.mark(present);
    Ok(ty)
}
