//! Compile-time evaluation of constant expressions.
//!
//! Each rule is gated by an [`OptimizationFlags`] bit:
//!
//! | Rule | Flag | Types |
//! |------|------|-------|
//! | `a op b` arithmetic and bitwise | `CONSTANT_ARITHMETIC` | int, long, double |
//! | `"a" + b` concatenation | `CONSTANT_STRING_CONCAT` | any constant |
//! | `-a` | `CONSTANT_UNARY` | int, long, double |
//!
//! Integer arithmetic wraps like the target machine. Integer `/` and `%` by
//! zero are left unfolded so the division still throws at run time.

use ixion_ast::{BinaryCategory, BinaryExpr, BinaryOp, Expr, UnaryExpr, UnaryOp};
use ixion_core::{ConstValue, PrimitiveKind, get_larger};

use super::ExprCompiler;
use super::literals::literal_value;
use crate::options::OptimizationFlags;

impl ExprCompiler<'_, '_> {
    /// The value of `expr` if it is a literal or folds to a constant under
    /// the enabled rules.
    pub fn constant_value(&self, expr: &Expr<'_>) -> Option<ConstValue> {
        match expr {
            Expr::Literal(lit) => Some(literal_value(&lit.kind)),
            Expr::Paren(p) => self.constant_value(p.expr),
            _ => self.folded_value(expr),
        }
    }

    /// The folded value of an operator expression.
    pub(super) fn folded_value(&self, expr: &Expr<'_>) -> Option<ConstValue> {
        match expr {
            Expr::Binary(bin) => fold_binary(self, bin),
            Expr::Unary(un) => fold_unary(self, un),
            _ => None,
        }
    }
}

fn fold_binary(compiler: &ExprCompiler<'_, '_>, bin: &BinaryExpr<'_>) -> Option<ConstValue> {
    let category = bin.op.category();
    if !matches!(category, BinaryCategory::Arithmetic | BinaryCategory::Bitwise) {
        return None;
    }
    let left = compiler.constant_value(bin.left)?;
    let right = compiler.constant_value(bin.right)?;

    if bin.op == BinaryOp::Add && (left.as_str().is_some() || right.as_str().is_some()) {
        if !compiler.ctx().optimizes(OptimizationFlags::CONSTANT_STRING_CONCAT)
            || !left.has_exact_text()
            || !right.has_exact_text()
        {
            return None;
        }
        return Some(ConstValue::String(format!("{left}{right}")));
    }
    if !compiler.ctx().optimizes(OptimizationFlags::CONSTANT_ARITHMETIC) {
        return None;
    }
    fold_numeric(bin.op, &left, &right)
}

/// Fold a numeric operator over two constants.
pub fn fold_numeric(op: BinaryOp, left: &ConstValue, right: &ConstValue) -> Option<ConstValue> {
    let (lt, rt) = (left.semantic_type(), right.semantic_type());
    if !lt.is_numeric() || !rt.is_numeric() {
        return None;
    }
    if op.is_shift() {
        let distance = as_i64(right)? as u32;
        return match lt.primitive()? {
            PrimitiveKind::Long => fold_long_shift(op, as_i64(left)?, distance).map(ConstValue::Long),
            kind if kind.is_integer() => fold_int_shift(op, left.as_i32()?, distance).map(ConstValue::Int),
            _ => None,
        };
    }
    match get_larger(&lt, &rt).primitive()? {
        PrimitiveKind::Int => fold_int(op, left.as_i32()?, right.as_i32()?).map(ConstValue::Int),
        PrimitiveKind::Long => fold_long(op, as_i64(left)?, as_i64(right)?).map(ConstValue::Long),
        PrimitiveKind::Double => fold_double(op, left.as_f64()?, right.as_f64()?).map(ConstValue::double),
        _ => None,
    }
}

fn as_i64(value: &ConstValue) -> Option<i64> {
    match value {
        ConstValue::Long(v) => Some(*v),
        ConstValue::Int(v) => Some(i64::from(*v)),
        ConstValue::Char(v) => Some(i64::from(*v)),
        _ => None,
    }
}

fn fold_int(op: BinaryOp, a: i32, b: i32) -> Option<i32> {
    Some(match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Mod if b == 0 => return None,
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Mod => a.wrapping_rem(b),
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        _ => return None,
    })
}

fn fold_long(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    Some(match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Mod if b == 0 => return None,
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Mod => a.wrapping_rem(b),
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        _ => return None,
    })
}

fn fold_double(op: BinaryOp, a: f64, b: f64) -> Option<f64> {
    Some(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => return None,
    })
}

fn fold_int_shift(op: BinaryOp, a: i32, distance: u32) -> Option<i32> {
    Some(match op {
        BinaryOp::ShiftLeft => a.wrapping_shl(distance),
        BinaryOp::ShiftRight => a.wrapping_shr(distance),
        BinaryOp::ShiftRightUnsigned => (a as u32).wrapping_shr(distance) as i32,
        _ => return None,
    })
}

fn fold_long_shift(op: BinaryOp, a: i64, distance: u32) -> Option<i64> {
    Some(match op {
        BinaryOp::ShiftLeft => a.wrapping_shl(distance),
        BinaryOp::ShiftRight => a.wrapping_shr(distance),
        BinaryOp::ShiftRightUnsigned => (a as u64).wrapping_shr(distance) as i64,
        _ => return None,
    })
}

fn fold_unary(compiler: &ExprCompiler<'_, '_>, un: &UnaryExpr<'_>) -> Option<ConstValue> {
    if un.op != UnaryOp::Neg || !compiler.ctx().optimizes(OptimizationFlags::CONSTANT_UNARY) {
        return None;
    }
    match compiler.constant_value(un.operand)? {
        ConstValue::Int(v) => Some(ConstValue::Int(v.wrapping_neg())),
        ConstValue::Long(v) => Some(ConstValue::Long(v.wrapping_neg())),
        ConstValue::Double(v) => Some(ConstValue::double(-v.into_inner())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Opcode;
    use crate::context::test_support::{Fixture, static_context};
    use crate::options::CompilerOptions;
    use crate::scope::Scope;
    use bumpalo::Bump;
    use ixion_ast::AstBuilder;
    use proptest::prelude::*;

    fn all_flags() -> Fixture {
        Fixture::with_options(
            CompilerOptions::default()
                .with_line_numbers(false)
                .with_optimizations(OptimizationFlags::all()),
        )
    }

    #[test]
    fn integer_arithmetic_wraps() {
        assert_eq!(
            fold_numeric(BinaryOp::Add, &ConstValue::Int(i32::MAX), &ConstValue::Int(1)),
            Some(ConstValue::Int(i32::MIN))
        );
        assert_eq!(
            fold_numeric(BinaryOp::Div, &ConstValue::Int(i32::MIN), &ConstValue::Int(-1)),
            Some(ConstValue::Int(i32::MIN))
        );
        assert_eq!(
            fold_numeric(BinaryOp::ShiftLeft, &ConstValue::Int(1), &ConstValue::Int(33)),
            Some(ConstValue::Int(2))
        );
        assert_eq!(
            fold_numeric(BinaryOp::ShiftRightUnsigned, &ConstValue::Int(-1), &ConstValue::Int(28)),
            Some(ConstValue::Int(15))
        );
    }

    #[test]
    fn division_by_zero_stays_unfolded() {
        assert_eq!(fold_numeric(BinaryOp::Div, &ConstValue::Int(1), &ConstValue::Int(0)), None);
        assert_eq!(fold_numeric(BinaryOp::Mod, &ConstValue::Long(1), &ConstValue::Long(0)), None);
        assert_eq!(
            fold_numeric(BinaryOp::Div, &ConstValue::double(1.0), &ConstValue::double(0.0)),
            Some(ConstValue::double(f64::INFINITY))
        );
    }

    #[test]
    fn unfoldable_types() {
        assert_eq!(
            fold_numeric(BinaryOp::Add, &ConstValue::float(1.0), &ConstValue::Int(1)),
            None
        );
        assert_eq!(fold_numeric(BinaryOp::Add, &ConstValue::Int(1), &ConstValue::Bool(true)), None);
        assert_eq!(
            fold_numeric(BinaryOp::BitAnd, &ConstValue::double(1.0), &ConstValue::double(1.0)),
            None
        );
    }

    #[test]
    fn folds_only_with_flags() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let sum = b.binary(b.int(1), BinaryOp::Add, b.double(2.0));
        let neg = b.unary(UnaryOp::Neg, b.int(5));
        let concat = b.binary(b.str("n="), BinaryOp::Add, b.int(3));

        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        let compiler = ExprCompiler::new(&mut ctx);
        assert_eq!(compiler.constant_value(&sum), None);
        assert_eq!(compiler.constant_value(&neg), None);
        assert_eq!(compiler.constant_value(&concat), None);

        let fixture = all_flags();
        let env = fixture.env();
        let mut ctx = static_context(&env, &root);
        let compiler = ExprCompiler::new(&mut ctx);
        assert_eq!(compiler.constant_value(&sum), Some(ConstValue::double(3.0)));
        assert_eq!(compiler.constant_value(&neg), Some(ConstValue::Int(-5)));
        assert_eq!(
            compiler.constant_value(&concat),
            Some(ConstValue::String("n=3".to_string()))
        );
    }

    #[test]
    fn surrogate_chars_never_fold_into_strings() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = all_flags();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        let compiler = ExprCompiler::new(&mut ctx);

        let high = b.binary(b.str("a"), BinaryOp::Add, b.char_unit(0xD83D));
        assert_eq!(compiler.constant_value(&high), None);
        let low = b.binary(b.char_unit(0xDE00), BinaryOp::Add, b.str("a"));
        assert_eq!(compiler.constant_value(&low), None);
        let plain = b.binary(b.str("a"), BinaryOp::Add, b.char_unit(0x41));
        assert_eq!(
            compiler.constant_value(&plain),
            Some(ConstValue::String("aA".to_string()))
        );
    }

    #[test]
    fn folded_expression_emits_one_constant() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.binary(
            b.paren(b.binary(b.int(6), BinaryOp::Mul, b.int(7))),
            BinaryOp::Sub,
            b.long(2),
        );
        let fixture = all_flags();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        let ty = ExprCompiler::new(&mut ctx).infer(&expr).unwrap();
        assert_eq!(ty, ixion_core::SemanticType::LONG);
        ctx.emitter.method().assert_opcodes(&[Opcode::Ldc]);
    }

    #[test]
    fn not_and_bitnot_never_fold() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = all_flags();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        let compiler = ExprCompiler::new(&mut ctx);
        assert_eq!(compiler.constant_value(&b.unary(UnaryOp::Not, b.bool(true))), None);
        assert_eq!(compiler.constant_value(&b.unary(UnaryOp::BitNot, b.int(1))), None);
    }

    proptest! {
        #[test]
        fn int_folding_matches_wrapping_semantics(a in any::<i32>(), b in any::<i32>()) {
            prop_assert_eq!(
                fold_numeric(BinaryOp::Mul, &ConstValue::Int(a), &ConstValue::Int(b)),
                Some(ConstValue::Int(a.wrapping_mul(b)))
            );
            prop_assert_eq!(
                fold_numeric(BinaryOp::Sub, &ConstValue::Long(i64::from(a)), &ConstValue::Int(b)),
                Some(ConstValue::Long(i64::from(a) - i64::from(b)))
            );
        }
    }
}
