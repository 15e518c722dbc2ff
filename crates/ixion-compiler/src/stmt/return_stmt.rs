//! `return` and `throw`.

use ixion_ast::{Expr, ReturnStmt, ThrowStmt};
use ixion_core::{CompilationError, Modifiers, SemanticType};

use super::{Result, StmtCompiler};
use crate::bytecode::Opcode;
use crate::conversion::{classify, classify_with_boxing, emit_conversion, is_assignable_from};

const THROWABLE: &str = "java/lang/Throwable";

impl<'c, 'a> StmtCompiler<'c, 'a> {
    /// Compile `return`, converting the value to the method's return type.
    ///
    /// Synthetic lambda bodies return through an erased interface method,
    /// so their results may be boxed.
    pub fn compile_return(&mut self, ret: &ReturnStmt<'_>) -> Result<()> {
        let Some(expected) = self.ctx.scope.return_type().cloned() else {
            return Err(CompilationError::internal("return outside of a method", ret.span));
        };
        if self.ctx.loops.is_guarded() {
            return Err(CompilationError::illegal_control_flow(
                "Cannot return from a 'try' block with a 'finally' clause",
                ret.span,
            ));
        }

        match ret.value {
            None if !expected.is_void() => {
                return Err(CompilationError::type_mismatch(
                    "Non-void function's return must have a value.",
                    ret.span,
                ));
            }
            None => self.ctx.emitter.emit(Opcode::Return),
            Some(value) => self.compile_return_value(value, &expected)?,
        }
        self.ctx.scope.set_returned(true);
        Ok(())
    }

    fn compile_return_value(&mut self, value: &Expr<'_>, expected: &SemanticType) -> Result<()> {
        if expected.is_void() {
            return Err(CompilationError::type_mismatch(
                "Cannot return value from void function",
                value.span(),
            ));
        }
        if let Expr::Lambda(_) = value.unparenthesized() {
            self.expr_compiler().check_argument(value, expected)?;
            self.ctx.emitter.return_value(expected);
            return Ok(());
        }

        let actual = self.expr_compiler().type_of(value)?;
        if actual.is_void() {
            return Err(CompilationError::type_mismatch("Cannot return void value", value.span()));
        }
        let resolver = self.ctx.resolver();
        let allowed = if self.in_lambda() {
            classify_with_boxing(resolver, expected, &actual)
        } else {
            classify(resolver, expected, &actual)
        };
        if allowed.is_none() {
            return Err(CompilationError::type_mismatch(
                format!("Cannot return type '{actual}' from function expecting '{expected}'"),
                value.span(),
            ));
        }

        self.expr_compiler().infer(value)?;
        emit_conversion(&mut self.ctx.emitter, expected, &actual);
        self.ctx.emitter.return_value(expected);
        Ok(())
    }

    fn in_lambda(&self) -> bool {
        self.ctx.emitter.method().modifiers.contains(Modifiers::SYNTHETIC)
    }

    /// Compile `throw`. Like `return`, it ends the current path.
    pub fn compile_throw(&mut self, throw: &ThrowStmt<'_>) -> Result<()> {
        let ty = self.expr_compiler().type_of(throw.value)?;
        if ty.is_primitive() {
            return Err(CompilationError::type_mismatch(
                format!("Cannot throw primitive type (got '{ty}')."),
                throw.span,
            ));
        }
        let throwable = SemanticType::reference(THROWABLE);
        if !is_assignable_from(self.ctx.resolver(), &throwable, &ty.as_non_nullable()) {
            return Err(CompilationError::type_mismatch(
                format!(
                    "throw target must be an extension of java.lang.Throwable ('{}' cannot be cast).",
                    ty.as_non_nullable()
                ),
                throw.span,
            ));
        }

        self.expr_compiler().infer(throw.value)?;
        self.ctx.emitter.emit(Opcode::Athrow);
        self.ctx.scope.set_returned(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Instruction;
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::Scope;
    use bumpalo::Bump;
    use ixion_ast::AstBuilder;

    #[test]
    fn values_are_converted_to_the_return_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope = root.for_method(SemanticType::DOUBLE, 0);

        StmtCompiler::new(&mut ctx)
            .compile(&b.ret(Some(b.int(3))))
            .unwrap();
        assert!(ctx.scope.has_returned());
        ctx.emitter
            .method()
            .assert_opcodes(&[Opcode::Iconst3, Opcode::I2d, Opcode::Dreturn]);
    }

    #[test]
    fn return_mismatches() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let err = StmtCompiler::new(&mut ctx)
            .compile(&b.ret(Some(b.int(1))))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Cannot return value from void function");

        ctx.scope = root.for_method(SemanticType::INT, 0);
        let mut compiler = StmtCompiler::new(&mut ctx);
        let err = compiler.compile(&b.ret(None)).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Non-void function's return must have a value.");
        let err = compiler.compile(&b.ret(Some(b.str("one")))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Cannot return type 'java.lang.String' from function expecting 'int'"
        );
        // Plain methods never box.
        ctx.scope = root.for_method(SemanticType::object(), 0);
        let err = StmtCompiler::new(&mut ctx)
            .compile(&b.ret(Some(b.int(1))))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Cannot return type 'int' from function expecting 'java.lang.Object'"
        );
        assert!(ctx.emitter.method().instructions.is_empty());
    }

    #[test]
    fn throw_requires_a_throwable() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let mut compiler = StmtCompiler::new(&mut ctx);
        let err = compiler.compile(&b.throw(b.int(1))).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Cannot throw primitive type (got 'int').");
        let err = compiler.compile(&b.throw(b.str("boom"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: throw target must be an extension of java.lang.Throwable ('java.lang.String' cannot be cast)."
        );

        compiler
            .compile(&b.throw(b.new_object(b.ty("RuntimeException"), &[b.str("boom")])))
            .unwrap();
        assert!(ctx.scope.has_returned());
        let method = ctx.emitter.method();
        method.assert_opcodes(&[
            Opcode::New,
            Opcode::Dup,
            Opcode::Ldc,
            Opcode::Invokespecial,
            Opcode::Athrow,
        ]);
        assert!(method.instructions.iter().any(|insn| matches!(
            insn,
            Instruction::TypeInsn(Opcode::New, name) if name == "java/lang/RuntimeException"
        )));
    }
}
