//! Expression compiler.
//!
//! The [`ExprCompiler`] turns AST expressions into stack code for the
//! method open in its [`EmissionContext`]. Types flow in both directions:
//! - `type_of()` - Computes the static type of an expression without emitting
//! - `infer()` - Emits an expression and returns its type
//! - `check()` - Emits an expression converted to an expected type
//!
//! Conditions go through `condition()`, which branches directly instead of
//! materializing a boolean, and expression statements through `discard()`.
//!
//! # Example
//!
//! ```ignore
//! let mut compiler = ExprCompiler::new(&mut ctx);
//! let ty = compiler.infer(&expr)?;
//! compiler.check(&init, &declared)?;
//! ```

mod array;
mod assignment;
mod binary;
mod calls;
mod cast;
mod compare;
mod concat;
pub(crate) mod const_fold;
mod identifiers;
mod lambda;
mod literals;
mod member;
mod null_safety;
mod ternary;
mod unary;
mod update;

pub(crate) use calls::{argument_infos, emit_arguments};

use ixion_ast::Expr;
use ixion_core::{CompilationError, PrimitiveKind, SemanticType};
use ixion_registry::HostTypeResolver;
use tracing::debug;

use crate::bytecode::Label;
use crate::context::EmissionContext;
use crate::conversion::{classify, classify_with_boxing, emit_conversion};
use crate::emit::BytecodeEmitter;

pub(crate) type Result<T> = std::result::Result<T, CompilationError>;

/// Compiles expressions into the method open in a context.
pub struct ExprCompiler<'c, 'a> {
    /// Method being emitted, its scope, and the unit environment
    ctx: &'c mut EmissionContext<'a>,
}

impl<'c, 'a> ExprCompiler<'c, 'a> {
    pub fn new(ctx: &'c mut EmissionContext<'a>) -> Self {
        Self { ctx }
    }

    /// Static type of `expr`. Emits nothing.
    pub fn type_of(&self, expr: &Expr<'_>) -> Result<SemanticType> {
        if let Some(value) = self.folded_value(expr) {
            return Ok(value.semantic_type());
        }
        match expr {
            Expr::Literal(lit) => Ok(literals::literal_type(&lit.kind)),
            Expr::Ident(ident) => identifiers::type_of_ident(self, ident),
            Expr::This(span) => {
                self.ctx.require_instance("this", *span)?;
                Ok(self.ctx.owner.semantic_type())
            }
            Expr::Super(span) => {
                self.ctx.require_instance("super", *span)?;
                Ok(SemanticType::reference(&self.ctx.owner.superclass))
            }
            Expr::Binary(bin) => binary::type_of_binary(self, bin),
            Expr::Unary(un) => unary::type_of_unary(self, un),
            Expr::Update(up) => update::type_of_update(self, up),
            Expr::Assign(assign) => assignment::type_of_assign(self, assign),
            Expr::Call(call) => calls::type_of_call(self, call),
            Expr::MethodCall(call) if call.null_safe => null_safety::type_of_link(self, expr),
            Expr::MethodCall(call) => calls::type_of_method_call(self, call),
            Expr::Member(m) if m.null_safe => null_safety::type_of_link(self, expr),
            Expr::Member(m) => member::type_of_member(self, m),
            Expr::Index(i) if i.null_safe => null_safety::type_of_link(self, expr),
            Expr::Index(i) => member::type_of_index(self, i),
            Expr::NonNull(n) => null_safety::type_of_non_null(self, n),
            Expr::New(new) => calls::type_of_new(self, new),
            Expr::NewArray(arr) => array::type_of_new_array(self, arr),
            Expr::Is(_) => Ok(SemanticType::BOOLEAN),
            Expr::Cast(cast) => self.ctx.resolve_type(&cast.ty),
            Expr::Ternary(t) => ternary::type_of_ternary(self, t),
            Expr::Lambda(l) => lambda::default_interface(l),
            Expr::Paren(p) => self.type_of(p.expr),
        }
    }

    /// Emit `expr` and return its type.
    pub fn infer(&mut self, expr: &Expr<'_>) -> Result<SemanticType> {
        // Only the direct receiver of a null-safe link may join its chain.
        let chain = self.ctx.null_sentinel.take();

        if let Some(value) = self.folded_value(expr) {
            debug!(value = %value, "folded constant");
            self.emitter().push_const(&value);
            return Ok(value.semantic_type());
        }
        match expr {
            Expr::Literal(lit) => literals::compile_literal(self, &lit.kind),
            Expr::Ident(ident) => identifiers::compile_ident(self, ident),
            Expr::This(span) => {
                self.ctx.require_instance("this", *span)?;
                self.emitter().load(&SemanticType::object(), 0);
                Ok(self.ctx.owner.semantic_type())
            }
            Expr::Super(span) => {
                self.ctx.require_instance("super", *span)?;
                self.emitter().load(&SemanticType::object(), 0);
                Ok(SemanticType::reference(&self.ctx.owner.superclass))
            }
            Expr::Binary(bin) => binary::compile_binary(self, bin),
            Expr::Unary(un) => unary::compile_unary(self, un),
            Expr::Update(up) => update::compile_update(self, up, true),
            Expr::Assign(assign) => assignment::compile_assign(self, assign, true),
            Expr::Call(call) => calls::compile_call(self, call),
            Expr::MethodCall(call) if call.null_safe => null_safety::compile_link(self, expr, chain),
            Expr::MethodCall(call) => calls::compile_method_call(self, call),
            Expr::Member(m) if m.null_safe => null_safety::compile_link(self, expr, chain),
            Expr::Member(m) => member::compile_member(self, m),
            Expr::Index(i) if i.null_safe => null_safety::compile_link(self, expr, chain),
            Expr::Index(i) => member::compile_index(self, i),
            Expr::NonNull(n) => null_safety::compile_non_null(self, n),
            Expr::New(new) => calls::compile_new(self, new),
            Expr::NewArray(arr) => array::compile_new_array(self, arr),
            Expr::Is(is) => cast::compile_is(self, is),
            Expr::Cast(cast) => cast::compile_cast(self, cast),
            Expr::Ternary(t) => ternary::compile_ternary(self, t),
            Expr::Lambda(l) => lambda::compile_lambda(self, l, None),
            Expr::Paren(p) => self.infer(p.expr),
        }
    }

    /// Emit `expr` converted to `expected`.
    ///
    /// Assignment contexts never box: a primitive only flows into a
    /// primitive, a reference only into a reference.
    pub fn check(&mut self, expr: &Expr<'_>, expected: &SemanticType) -> Result<()> {
        if let Expr::Lambda(l) = expr.unparenthesized()
            && self.is_functional(expected)
        {
            lambda::compile_lambda(self, l, Some(expected))?;
            return Ok(());
        }
        let actual = self.infer(expr)?;
        if classify(self.resolver(), expected, &actual).is_none() {
            return Err(CompilationError::type_mismatch(
                format!("Incompatible types ({expected} =/= {actual})"),
                expr.span(),
            ));
        }
        emit_conversion(self.emitter(), expected, &actual);
        Ok(())
    }

    /// Emit a call argument converted to its parameter type. Boxing is
    /// allowed and lambdas bind to functional parameters.
    pub fn check_argument(&mut self, expr: &Expr<'_>, param: &SemanticType) -> Result<()> {
        if let Expr::Lambda(l) = expr.unparenthesized()
            && self.is_functional(param)
        {
            lambda::compile_lambda(self, l, Some(param))?;
            return Ok(());
        }
        let actual = self.infer(expr)?;
        if classify_with_boxing(self.resolver(), param, &actual).is_none() {
            return Err(CompilationError::type_mismatch(
                format!("Incompatible types ({param} =/= {actual})"),
                expr.span(),
            ));
        }
        emit_conversion(self.emitter(), param, &actual);
        Ok(())
    }

    /// Emit a branch to `false_label` taken when `expr` is false.
    pub fn condition(&mut self, expr: &Expr<'_>, false_label: Label) -> Result<()> {
        compare::compile_condition(self, expr, false_label)
    }

    /// Emit `expr` as a statement: constants are skipped, assignments and
    /// updates leave nothing behind, other values are popped.
    pub fn discard(&mut self, expr: &Expr<'_>) -> Result<()> {
        if self.constant_value(expr).is_some() {
            return Ok(());
        }
        match expr.unparenthesized() {
            Expr::Assign(assign) => {
                assignment::compile_assign(self, assign, false)?;
            }
            Expr::Update(up) => {
                update::compile_update(self, up, false)?;
            }
            other => {
                let ty = self.infer(other)?;
                self.emitter().pop(&ty);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn ctx(&self) -> &EmissionContext<'a> {
        self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut EmissionContext<'a> {
        self.ctx
    }

    pub fn emitter(&mut self) -> &mut BytecodeEmitter {
        &mut self.ctx.emitter
    }

    pub fn resolver(&self) -> &'a dyn HostTypeResolver {
        self.ctx.resolver()
    }

    fn is_functional(&self, ty: &SemanticType) -> bool {
        matches!(ty, SemanticType::Reference { name, .. } if self.resolver().functional_method(name).is_some())
    }
}

// =============================================================================
// Operand helpers
// =============================================================================

/// Primitive kind an arithmetic operand computes in: the primitive itself,
/// or the unboxed kind of a non-nullable wrapper.
pub(crate) fn operand_kind(ty: &SemanticType) -> Option<PrimitiveKind> {
    match ty {
        SemanticType::Primitive(kind) if *kind != PrimitiveKind::Void => Some(*kind),
        SemanticType::Reference { nullable: false, .. } => ty.unboxed_kind(),
        _ => None,
    }
}

/// Convert the operand on top of the stack, typed `ty`, to `kind`.
pub(crate) fn emit_operand_conversion(emitter: &mut BytecodeEmitter, ty: &SemanticType, kind: PrimitiveKind) {
    match ty {
        SemanticType::Primitive(from) => {
            emitter.cast_primitive(*from, kind);
        }
        _ => {
            if let Some(unboxed) = ty.unboxed_kind() {
                emitter.unbox(unboxed);
                emitter.cast_primitive(unboxed, kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Opcode;
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::Scope;
    use bumpalo::Bump;
    use ixion_ast::{AstBuilder, BinaryOp};

    #[test]
    fn check_widens_without_boxing() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let mut compiler = ExprCompiler::new(&mut ctx);
        compiler.check(&b.int(1), &SemanticType::LONG).unwrap();
        let err = compiler.check(&b.int(1), &SemanticType::object()).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Incompatible types (java.lang.Object =/= int)");

        ctx.emitter.method().assert_opcodes(&[Opcode::Iconst1, Opcode::I2l, Opcode::Iconst1]);
    }

    #[test]
    fn check_argument_boxes() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        ExprCompiler::new(&mut ctx)
            .check_argument(&b.int(7), &SemanticType::object())
            .unwrap();
        ctx.emitter.method().assert_opcodes(&[Opcode::Bipush, Opcode::Invokestatic]);
    }

    #[test]
    fn constant_statements_are_skipped_and_values_popped() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("x", SemanticType::LONG, false, b.span())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        compiler.discard(&b.int(4)).unwrap();
        compiler
            .discard(&b.binary(b.ident("x"), BinaryOp::Add, b.int(1)))
            .unwrap();
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Lload,
            Opcode::Iconst1,
            Opcode::I2l,
            Opcode::Ladd,
            Opcode::Pop2,
        ]);
    }

    #[test]
    fn operand_kinds_unbox_only_non_nullable_wrappers() {
        assert_eq!(operand_kind(&SemanticType::INT), Some(PrimitiveKind::Int));
        assert_eq!(
            operand_kind(&SemanticType::reference("java/lang/Double")),
            Some(PrimitiveKind::Double)
        );
        assert_eq!(operand_kind(&SemanticType::nullable_reference("java/lang/Double")), None);
        assert_eq!(operand_kind(&SemanticType::VOID), None);
    }
}
