//! Conditions: comparisons, equality, and short-circuit logic.
//!
//! Conditions compile to a jump taken when the condition is false, so `if`,
//! `while`, `for`, and `?:` branch directly on the comparison. A condition
//! used as a value is materialized as `1`/`0` around the same jumps.

use ixion_ast::{BinaryCategory, BinaryExpr, BinaryOp, Expr, LiteralKind, UnaryExpr, UnaryOp};
use ixion_core::{CompilationError, PrimitiveKind, SemanticType, Span};

use super::binary::larger;
use super::{ExprCompiler, Result, emit_operand_conversion, operand_kind};
use crate::bytecode::{Label, Opcode};

const OBJECTS_EQUALS: (&str, &str, &str) = (
    "java/util/Objects",
    "equals",
    "(Ljava/lang/Object;Ljava/lang/Object;)Z",
);

/// Emit a jump to `false_label` taken when `expr` is false.
pub fn compile_condition(compiler: &mut ExprCompiler<'_, '_>, expr: &Expr<'_>, false_label: Label) -> Result<()> {
    match expr {
        Expr::Paren(p) => compile_condition(compiler, p.expr, false_label),
        Expr::Literal(lit) if matches!(lit.kind, LiteralKind::Bool(_)) => {
            if lit.kind == LiteralKind::Bool(false) {
                compiler.emitter().emit_jump(Opcode::Goto, false_label);
            }
            Ok(())
        }
        Expr::Unary(un) if un.op == UnaryOp::Not => compile_not(compiler, un, false_label),
        Expr::Binary(bin)
            if matches!(
                bin.op.category(),
                BinaryCategory::Logical | BinaryCategory::Equality | BinaryCategory::Relational
            ) =>
        {
            compile_binary_condition(compiler, bin, false_label)
        }
        _ => {
            let ty = compiler.infer(expr)?;
            match ty {
                SemanticType::Primitive(PrimitiveKind::Boolean) => {}
                SemanticType::Reference { nullable: false, .. }
                    if ty.unboxed_kind() == Some(PrimitiveKind::Boolean) =>
                {
                    compiler.emitter().unbox(PrimitiveKind::Boolean);
                }
                _ => {
                    return Err(CompilationError::type_mismatch(
                        format!("Invalid condition type ({ty} =/= boolean)"),
                        expr.span(),
                    ));
                }
            }
            compiler.emitter().emit_jump(Opcode::Ifeq, false_label);
            Ok(())
        }
    }
}

/// Materialize a condition as an int `1`/`0`.
pub fn materialize<'c, 'a>(
    compiler: &mut ExprCompiler<'c, 'a>,
    branch: impl FnOnce(&mut ExprCompiler<'c, 'a>, Label) -> Result<()>,
) -> Result<()> {
    let false_label = compiler.emitter().new_label();
    let end = compiler.emitter().new_label();
    branch(compiler, false_label)?;
    let emitter = compiler.emitter();
    emitter.push_int(1);
    emitter.emit_jump(Opcode::Goto, end);
    emitter.mark(false_label);
    emitter.push_int(0);
    emitter.mark(end);
    Ok(())
}

pub fn compile_not(compiler: &mut ExprCompiler<'_, '_>, un: &UnaryExpr<'_>, false_label: Label) -> Result<()> {
    let true_label = compiler.emitter().new_label();
    compile_condition(compiler, un.operand, true_label)?;
    compiler.emitter().emit_jump(Opcode::Goto, false_label);
    compiler.emitter().mark(true_label);
    Ok(())
}

pub fn compile_binary_condition(
    compiler: &mut ExprCompiler<'_, '_>,
    bin: &BinaryExpr<'_>,
    false_label: Label,
) -> Result<()> {
    match bin.op {
        BinaryOp::LogicalAnd => {
            compile_condition(compiler, bin.left, false_label)?;
            compile_condition(compiler, bin.right, false_label)
        }
        BinaryOp::LogicalOr => {
            let true_label = compiler.emitter().new_label();
            let next = compiler.emitter().new_label();
            compile_condition(compiler, bin.left, next)?;
            compiler.emitter().emit_jump(Opcode::Goto, true_label);
            compiler.emitter().mark(next);
            compile_condition(compiler, bin.right, false_label)?;
            compiler.emitter().mark(true_label);
            Ok(())
        }
        BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Identical | BinaryOp::NotIdentical => {
            compile_equality(compiler, bin, false_label)
        }
        _ => compile_relational(compiler, bin, false_label),
    }
}

/// Value form of a comparison or logical operator.
pub fn materialize_binary(compiler: &mut ExprCompiler<'_, '_>, bin: &BinaryExpr<'_>) -> Result<()> {
    materialize(compiler, |compiler, false_label| {
        compile_binary_condition(compiler, bin, false_label)
    })
}

// =============================================================================
// Relational
// =============================================================================

fn compile_relational(compiler: &mut ExprCompiler<'_, '_>, bin: &BinaryExpr<'_>, false_label: Label) -> Result<()> {
    let left = compiler.type_of(bin.left)?;
    let right = compiler.type_of(bin.right)?;
    let kind = match (operand_kind(&left), operand_kind(&right)) {
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => larger(a, b),
        _ => {
            return Err(CompilationError::invalid_operation(
                format!("Operator '{}' cannot be applied to '{left}' and '{right}'.", bin.op),
                bin.span,
            ));
        }
    };
    compiler.infer(bin.left)?;
    emit_operand_conversion(compiler.emitter(), &left, kind);
    compiler.infer(bin.right)?;
    emit_operand_conversion(compiler.emitter(), &right, kind);

    let nan_greater = matches!(bin.op, BinaryOp::Less | BinaryOp::LessEqual);
    let emitter = compiler.emitter();
    let jump = if emitter.compare(kind, nan_greater) {
        match bin.op {
            BinaryOp::Less => Opcode::Ifge,
            BinaryOp::LessEqual => Opcode::Ifgt,
            BinaryOp::Greater => Opcode::Ifle,
            _ => Opcode::Iflt,
        }
    } else {
        match bin.op {
            BinaryOp::Less => Opcode::IfIcmpge,
            BinaryOp::LessEqual => Opcode::IfIcmpgt,
            BinaryOp::Greater => Opcode::IfIcmple,
            _ => Opcode::IfIcmplt,
        }
    };
    emitter.emit_jump(jump, false_label);
    Ok(())
}

// =============================================================================
// Equality
// =============================================================================

/// `===` and `!==` compare addresses, which primitives do not have.
pub(super) fn check_identity(op: BinaryOp, left: &SemanticType, right: &SemanticType, span: Span) -> Result<()> {
    if matches!(op, BinaryOp::Identical | BinaryOp::NotIdentical) && (left.is_primitive() || right.is_primitive()) {
        return Err(CompilationError::invalid_operation(
            format!("Cannot perform address comparison on primitives ('{left}' {op} '{right}')."),
            span,
        ));
    }
    Ok(())
}

fn compile_equality(compiler: &mut ExprCompiler<'_, '_>, bin: &BinaryExpr<'_>, false_label: Label) -> Result<()> {
    let equal = matches!(bin.op, BinaryOp::Equal | BinaryOp::Identical);
    let identity = matches!(bin.op, BinaryOp::Identical | BinaryOp::NotIdentical);
    let left = compiler.type_of(bin.left)?;
    let right = compiler.type_of(bin.right)?;
    if left.is_void() || right.is_void() {
        return Err(CompilationError::invalid_operation(
            format!("Operator '{}' cannot be applied to '{left}' and '{right}'.", bin.op),
            bin.span,
        ));
    }

    check_identity(bin.op, &left, &right, bin.span)?;

    if left.is_null() || right.is_null() {
        return compile_null_check(compiler, bin, &left, &right, equal, false_label);
    }

    let either_primitive = left.is_primitive() || right.is_primitive();
    match (operand_kind(&left), operand_kind(&right)) {
        (Some(PrimitiveKind::Boolean), Some(PrimitiveKind::Boolean)) if either_primitive => {
            compiler.infer(bin.left)?;
            emit_operand_conversion(compiler.emitter(), &left, PrimitiveKind::Boolean);
            compiler.infer(bin.right)?;
            emit_operand_conversion(compiler.emitter(), &right, PrimitiveKind::Boolean);
            let jump = if equal { Opcode::IfIcmpne } else { Opcode::IfIcmpeq };
            compiler.emitter().emit_jump(jump, false_label);
        }
        (Some(a), Some(b)) if either_primitive && a.is_numeric() && b.is_numeric() => {
            let kind = larger(a, b);
            compiler.infer(bin.left)?;
            emit_operand_conversion(compiler.emitter(), &left, kind);
            compiler.infer(bin.right)?;
            emit_operand_conversion(compiler.emitter(), &right, kind);
            let emitter = compiler.emitter();
            let jump = match (emitter.compare(kind, false), equal) {
                (true, true) => Opcode::Ifne,
                (true, false) => Opcode::Ifeq,
                (false, true) => Opcode::IfIcmpne,
                (false, false) => Opcode::IfIcmpeq,
            };
            emitter.emit_jump(jump, false_label);
        }
        _ => {
            // Mixed primitive and reference operands compare boxed.
            compiler.infer(bin.left)?;
            if let Some(kind) = left.primitive() {
                compiler.emitter().box_primitive(kind);
            }
            compiler.infer(bin.right)?;
            if let Some(kind) = right.primitive() {
                compiler.emitter().box_primitive(kind);
            }
            let emitter = compiler.emitter();
            if identity {
                let jump = if equal { Opcode::IfAcmpne } else { Opcode::IfAcmpeq };
                emitter.emit_jump(jump, false_label);
            } else {
                let (owner, name, descriptor) = OBJECTS_EQUALS;
                emitter.emit_invoke(Opcode::Invokestatic, owner, name, descriptor, false);
                let jump = if equal { Opcode::Ifeq } else { Opcode::Ifne };
                emitter.emit_jump(jump, false_label);
            }
        }
    }
    Ok(())
}

/// `x == null` and friends branch on the single operand.
fn compile_null_check(
    compiler: &mut ExprCompiler<'_, '_>,
    bin: &BinaryExpr<'_>,
    left: &SemanticType,
    right: &SemanticType,
    equal: bool,
    false_label: Label,
) -> Result<()> {
    let (operand, ty) = if left.is_null() { (bin.right, right) } else { (bin.left, left) };
    if ty.is_null() {
        if !equal {
            compiler.emitter().emit_jump(Opcode::Goto, false_label);
        }
        return Ok(());
    }
    if ty.is_primitive() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot compare '{ty}' with null."),
            bin.span,
        ));
    }
    compiler.infer(operand)?;
    let jump = if equal { Opcode::Ifnonnull } else { Opcode::Ifnull };
    compiler.emitter().emit_jump(jump, false_label);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::eval::{Evaluator, Value};
    use crate::bytecode::{Instruction, MethodArtifact};
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::Scope;
    use bumpalo::Bump;
    use ixion_ast::AstBuilder;
    use ixion_core::Span;

    /// Compile `expr` as a value returned from a method taking `params`.
    fn compile_value(params: &[(&str, SemanticType)], build: impl for<'x> FnOnce(&'x AstBuilder<'x>) -> Expr<'x>) -> MethodArtifact {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = build(&b);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        for (name, ty) in params {
            ctx.scope
                .declare_local(name, ty.clone(), false, Span::default())
                .unwrap();
        }
        let ty = ExprCompiler::new(&mut ctx).infer(&expr).unwrap();
        ctx.emitter.return_value(&ty);
        ctx.finish().method
    }

    fn run(method: &MethodArtifact, args: Vec<Value>) -> Value {
        Evaluator::new()
            .run(&method.instructions, args)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn relational_uses_cmp_prelude_for_wide_kinds() {
        let method = compile_value(&[("a", SemanticType::LONG), ("b", SemanticType::INT)], |b| {
            b.binary(b.ident("a"), BinaryOp::Less, b.ident("b"))
        });
        method.assert_contains_opcodes(&[Opcode::Lload, Opcode::Iload, Opcode::I2l, Opcode::Lcmp, Opcode::Ifge]);
        assert_eq!(run(&method, vec![Value::Long(1), Value::Int(2)]), Value::Int(1));
        assert_eq!(run(&method, vec![Value::Long(2), Value::Int(2)]), Value::Int(0));
    }

    #[test]
    fn nan_makes_every_ordering_false() {
        let less = compile_value(&[("a", SemanticType::DOUBLE)], |b| {
            b.binary(b.ident("a"), BinaryOp::Less, b.double(1.0))
        });
        let greater = compile_value(&[("a", SemanticType::DOUBLE)], |b| {
            b.binary(b.ident("a"), BinaryOp::Greater, b.double(1.0))
        });
        less.assert_contains_opcodes(&[Opcode::Dcmpg]);
        greater.assert_contains_opcodes(&[Opcode::Dcmpl]);
        assert_eq!(run(&less, vec![Value::Double(f64::NAN)]), Value::Int(0));
        assert_eq!(run(&greater, vec![Value::Double(f64::NAN)]), Value::Int(0));
    }

    #[test]
    fn reference_equality_calls_objects_equals() {
        let method = compile_value(&[("s", SemanticType::string())], |b| {
            b.binary(b.ident("s"), BinaryOp::Equal, b.str("x"))
        });
        assert!(method.instructions.iter().any(|i| matches!(
            i,
            Instruction::MethodInsn(Opcode::Invokestatic, m, false)
                if m.owner == "java/util/Objects" && m.name == "equals"
        )));
        assert_eq!(run(&method, vec![Value::Str("x".into())]), Value::Int(1));

        let identity = compile_value(&[("s", SemanticType::string())], |b| {
            b.binary(b.ident("s"), BinaryOp::Identical, b.ident("s"))
        });
        identity.assert_contains_opcodes(&[Opcode::IfAcmpne]);
    }

    #[test]
    fn identity_rejects_primitive_operands() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("i", SemanticType::INT, false, Span::default())
            .unwrap();
        ctx.scope
            .declare_local("n", SemanticType::reference("java/lang/Integer"), false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        let both = b.binary(b.ident("i"), BinaryOp::Identical, b.int(3));
        let err = compiler.type_of(&both).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Cannot perform address comparison on primitives ('int' === 'int')."
        );
        let mixed = b.binary(b.ident("n"), BinaryOp::NotIdentical, b.ident("i"));
        assert!(matches!(compiler.infer(&mixed), Err(CompilationError::InvalidOperation { .. })));
        assert!(ctx.emitter.method().instructions.is_empty());
    }

    #[test]
    fn null_comparison_branches_on_operand() {
        let method = compile_value(&[("s", SemanticType::string().as_nullable())], |b| {
            b.binary(b.ident("s"), BinaryOp::NotEqual, b.null())
        });
        method.assert_contains_opcodes(&[Opcode::Aload, Opcode::Ifnull]);
        assert_eq!(run(&method, vec![Value::Null]), Value::Int(0));
        assert_eq!(run(&method, vec![Value::Str("a".into())]), Value::Int(1));
    }

    #[test]
    fn mixed_primitive_and_reference_boxes() {
        let method = compile_value(&[("o", SemanticType::object())], |b| {
            b.binary(b.ident("o"), BinaryOp::Equal, b.int(3))
        });
        method.assert_contains_opcodes(&[Opcode::Aload, Opcode::Iconst3, Opcode::Invokestatic, Opcode::Invokestatic]);
    }

    #[test]
    fn short_circuit_logic() {
        let method = compile_value(&[("a", SemanticType::INT)], |b| {
            b.binary(
                b.binary(b.ident("a"), BinaryOp::Greater, b.int(10)),
                BinaryOp::LogicalOr,
                b.unary(UnaryOp::Not, b.binary(b.ident("a"), BinaryOp::GreaterEqual, b.int(0))),
            )
        });
        assert_eq!(run(&method, vec![Value::Int(11)]), Value::Int(1));
        assert_eq!(run(&method, vec![Value::Int(-1)]), Value::Int(1));
        assert_eq!(run(&method, vec![Value::Int(5)]), Value::Int(0));
    }

    #[test]
    fn invalid_condition_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        let label = ctx.emitter.new_label();
        let err = compile_condition(&mut ExprCompiler::new(&mut ctx), &b.int(1), label).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Invalid condition type (int =/= boolean)");
    }
}
