//! `if`/`else` and `is` narrowing.

use ixion_ast::{Expr, IfStmt};
use ixion_core::SemanticType;

use super::{Result, StmtCompiler};
use crate::bytecode::Opcode;

impl<'c, 'a> StmtCompiler<'c, 'a> {
    /// Compile `if`/`else`.
    ///
    /// When the condition is `name is T`, `name` has type `T` inside the
    /// then-branch. The statement returns only when both branches do.
    pub fn compile_if(&mut self, if_stmt: &IfStmt<'_>) -> Result<()> {
        let else_label = self.ctx.emitter.new_label();
        self.expr_compiler().condition(&if_stmt.condition, else_label)?;

        let guard = self.type_guard(&if_stmt.condition)?;
        self.ctx.enter_scope();
        if let Some((name, ty)) = guard {
            self.ctx.scope.narrow(name, ty);
        }
        let then = self.compile(&if_stmt.then_branch);
        let then_returned = self.ctx.exit_scope().has_returned();
        then?;

        let Some(else_branch) = &if_stmt.else_branch else {
            self.ctx.emitter.mark(else_label);
            return Ok(());
        };

        let end = self.ctx.emitter.new_label();
        if !then_returned {
            self.ctx.emitter.emit_jump(Opcode::Goto, end);
        }
        self.ctx.emitter.mark(else_label);
        let else_returned = self.compile_nested(else_branch)?;
        self.ctx.emitter.mark(end);

        if then_returned && else_returned {
            self.ctx.scope.set_returned(true);
        }
        Ok(())
    }

    /// The variable and type an `is` condition proves for its branch.
    fn type_guard<'e>(&self, condition: &Expr<'e>) -> Result<Option<(&'e str, SemanticType)>> {
        let Expr::Is(is) = condition.unparenthesized() else {
            return Ok(None);
        };
        let Expr::Ident(ident) = is.expr.unparenthesized() else {
            return Ok(None);
        };
        if self.ctx.scope.lookup_variable(ident.name).is_none() {
            return Ok(None);
        }
        let ty = self.ctx.resolve_type(&is.ty)?;
        Ok(Some((ident.name, ty)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Instruction;
    use crate::bytecode::eval::{Evaluator, Value};
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::Scope;
    use crate::stmt::compile_body;
    use bumpalo::Bump;
    use ixion_ast::{AstBuilder, BinaryOp};
    use ixion_core::Span;

    #[test]
    fn both_branches_returning_ends_the_body() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope = root.for_method(SemanticType::INT, 0);
        ctx.scope
            .declare_local("x", SemanticType::INT, false, Span::default())
            .unwrap();

        let body = b.block(&[b.if_(
            b.binary(b.ident("x"), BinaryOp::Less, b.int(0)),
            b.ret(Some(b.int(-1))),
            Some(b.ret(Some(b.int(1)))),
        )]);
        compile_body(&mut ctx, &body, "sign", Span::default()).unwrap();

        let method = ctx.emitter.method();
        // No jump over the else-branch and no implicit return.
        method.assert_opcodes(&[
            Opcode::Iload,
            Opcode::Iconst0,
            Opcode::IfIcmpge,
            Opcode::IconstM1,
            Opcode::Ireturn,
            Opcode::Iconst1,
            Opcode::Ireturn,
        ]);
        let negative = Evaluator::new()
            .run(&method.instructions, vec![Value::Int(-5)])
            .unwrap();
        assert_eq!(negative, Some(Value::Int(-1)));
        let positive = Evaluator::new()
            .run(&method.instructions, vec![Value::Int(5)])
            .unwrap();
        assert_eq!(positive, Some(Value::Int(1)));
    }

    #[test]
    fn else_branch_is_skipped_after_then() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("flag", SemanticType::BOOLEAN, false, Span::default())
            .unwrap();

        let stmt = b.if_(
            b.ident("flag"),
            b.var("a", b.int(1)),
            Some(b.var("a", b.int(2))),
        );
        StmtCompiler::new(&mut ctx).compile(&stmt).unwrap();
        assert!(!ctx.scope.has_returned());
        assert!(ctx.scope.lookup_variable("a").is_none());
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Iload,
            Opcode::Ifeq,
            Opcode::Iconst1,
            Opcode::Istore,
            Opcode::Goto,
            Opcode::Iconst2,
            Opcode::Istore,
        ]);
    }

    #[test]
    fn is_check_narrows_inside_the_branch() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("o", SemanticType::object(), false, Span::default())
            .unwrap();

        let stmt = b.if_(
            b.is(b.ident("o"), b.ty("String")),
            b.expr_stmt(b.method_call(b.ident("o"), "length", &[])),
            None,
        );
        StmtCompiler::new(&mut ctx).compile(&stmt).unwrap();

        // Narrowing ends with the branch.
        assert_eq!(ctx.scope.lookup_variable("o").unwrap().ty, SemanticType::object());
        let method = ctx.emitter.method();
        method.assert_contains_opcodes(&[
            Opcode::Instanceof,
            Opcode::Ifeq,
            Opcode::Aload,
            Opcode::Checkcast,
            Opcode::Invokevirtual,
            Opcode::Pop,
        ]);
        assert!(method.instructions.iter().any(|insn| matches!(
            insn,
            Instruction::TypeInsn(Opcode::Checkcast, name) if name == "java/lang/String"
        )));
    }
}
