//! `c ? a : b`, compiled with branches.

use ixion_ast::TernaryExpr;
use ixion_core::{CompilationError, SemanticType};

use super::{ExprCompiler, Result};
use crate::bytecode::Opcode;

/// Common type of two branches.
///
/// The branches must agree; they may differ only in nullability, or one may
/// be the `null` literal, and the result is then nullable.
fn unify(then_ty: &SemanticType, else_ty: &SemanticType) -> Option<SemanticType> {
    if then_ty == else_ty {
        return Some(then_ty.clone());
    }
    match (then_ty.is_null(), else_ty.is_null()) {
        (true, false) if else_ty.is_object_like() => return Some(else_ty.as_nullable()),
        (false, true) if then_ty.is_object_like() => return Some(then_ty.as_nullable()),
        _ => {}
    }
    (then_ty.is_object_like() && then_ty.as_non_nullable() == else_ty.as_non_nullable())
        .then(|| then_ty.as_nullable())
}

pub fn type_of_ternary(compiler: &ExprCompiler<'_, '_>, ternary: &TernaryExpr<'_>) -> Result<SemanticType> {
    let then_ty = compiler.type_of(ternary.then_expr)?;
    let else_ty = compiler.type_of(ternary.else_expr)?;
    unify(&then_ty, &else_ty).ok_or_else(|| {
        CompilationError::type_mismatch(
            format!("Incompatible types in ternary operator: {then_ty} and {else_ty}"),
            ternary.span,
        )
    })
}

pub fn compile_ternary(compiler: &mut ExprCompiler<'_, '_>, ternary: &TernaryExpr<'_>) -> Result<SemanticType> {
    let ty = type_of_ternary(compiler, ternary)?;
    let else_label = compiler.emitter().new_label();
    let end = compiler.emitter().new_label();

    compiler.condition(ternary.condition, else_label)?;
    compiler.infer(ternary.then_expr)?;
    compiler.emitter().emit_jump(Opcode::Goto, end);
    compiler.emitter().mark(else_label);
    compiler.infer(ternary.else_expr)?;
    compiler.emitter().mark(end);
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::eval::{Evaluator, Value};
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::Scope;
    use bumpalo::Bump;
    use ixion_ast::{AstBuilder, BinaryOp};
    use ixion_core::Span;

    #[test]
    fn branches_select_a_value() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("x", SemanticType::INT, false, Span::default())
            .unwrap();

        let expr = b.ternary(
            b.binary(b.ident("x"), BinaryOp::Greater, b.int(10)),
            b.str("big"),
            b.str("small"),
        );
        let ty = ExprCompiler::new(&mut ctx).infer(&expr).unwrap();
        assert_eq!(ty, SemanticType::string());
        ctx.emitter.emit(Opcode::Areturn);
        let method = ctx.finish().method;
        method.assert_contains_opcodes(&[Opcode::IfIcmple, Opcode::Ldc, Opcode::Goto, Opcode::Ldc]);

        let big = Evaluator::new()
            .run(&method.instructions, vec![Value::Int(11)])
            .unwrap();
        assert_eq!(big, Some(Value::Str("big".into())));
        let small = Evaluator::new()
            .run(&method.instructions, vec![Value::Int(3)])
            .unwrap();
        assert_eq!(small, Some(Value::Str("small".into())));
    }

    #[test]
    fn null_branch_makes_the_result_nullable() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        let compiler = ExprCompiler::new(&mut ctx);

        let ty = compiler
            .type_of(&b.ternary(b.bool(true), b.null(), b.str("s")))
            .unwrap();
        assert_eq!(ty, SemanticType::string().as_nullable());
    }

    #[test]
    fn mismatched_branches_are_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        let compiler = ExprCompiler::new(&mut ctx);

        let err = compiler
            .type_of(&b.ternary(b.bool(true), b.int(1), b.str("one")))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Incompatible types in ternary operator: int and java.lang.String"
        );
        let err = compiler
            .type_of(&b.ternary(b.bool(true), b.int(1), b.long(1)))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Incompatible types in ternary operator: int and long");
    }
}
