//! Local variable declarations.

use ixion_ast::{Expr, VarDeclStmt};
use ixion_core::{CompilationError, SemanticType};

use super::{Result, StmtCompiler};
use crate::conversion::classify;

impl<'c, 'a> StmtCompiler<'c, 'a> {
    /// Compile `var`/`const`. The initializer is emitted before the name is
    /// bound, so it cannot refer to the variable it initializes.
    pub fn compile_var_decl(&mut self, decl: &VarDeclStmt<'_>) -> Result<()> {
        let ty = self.declared_type(decl)?;

        match decl.init {
            Some(init) => self.expr_compiler().check(init, &ty)?,
            None => {
                if !ty.is_primitive() && !ty.is_nullable() {
                    return Err(CompilationError::type_mismatch(
                        format!("Cannot default initialize variable of type '{ty}'"),
                        decl.span,
                    ));
                }
                self.ctx.emitter.push_default(&ty);
            }
        }

        let slot = self
            .ctx
            .scope
            .declare_local(decl.name.name, ty.clone(), decl.is_const, decl.name.span)?;
        self.ctx.emitter.store(&ty, slot);
        Ok(())
    }

    /// Type of the new variable: the annotation when present, otherwise the
    /// type of the initializer.
    fn declared_type(&mut self, decl: &VarDeclStmt<'_>) -> Result<SemanticType> {
        match (&decl.ty, decl.init) {
            (Some(annotation), init) => {
                let expected = self.ctx.resolve_type(annotation)?;
                if expected.is_void() {
                    return Err(CompilationError::type_mismatch(
                        format!("Variable '{}' cannot have type void", decl.name.name),
                        decl.span,
                    ));
                }
                // Lambdas take their type from the annotation.
                if let Some(init) = init
                    && !matches!(init.unparenthesized(), Expr::Lambda(_))
                {
                    let value = self.expr_compiler().type_of(init)?;
                    if classify(self.ctx.resolver(), &expected, &value).is_none() {
                        return Err(CompilationError::type_mismatch(
                            format!("Cannot assign type of '{value}' to annotated type of '{expected}'."),
                            init.span(),
                        ));
                    }
                }
                Ok(expected)
            }
            (None, Some(init)) => {
                let value = self.expr_compiler().type_of(init)?;
                if value.is_void() {
                    return Err(CompilationError::type_mismatch(
                        format!("Cannot assign void to variable '{}'", decl.name.name),
                        init.span(),
                    ));
                }
                if value.is_null() {
                    return Ok(SemanticType::object().as_nullable());
                }
                Ok(value)
            }
            (None, None) => Err(CompilationError::type_mismatch(
                format!("Variable '{}' needs a type or an initializer", decl.name.name),
                decl.span,
            )),
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
    use ixion_ast::AstBuilder;

    #[test]
    fn inferred_and_annotated_types() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let mut compiler = StmtCompiler::new(&mut ctx);
        compiler.compile(&b.var("s", b.str("hi"))).unwrap();
        compiler
            .compile(&b.var_typed("wide", b.ty("long"), Some(b.int(7))))
            .unwrap();
        compiler.compile(&b.var("nothing", b.null())).unwrap();

        assert_eq!(ctx.scope.lookup_variable("s").unwrap().ty, SemanticType::string());
        assert_eq!(ctx.scope.lookup_variable("wide").unwrap().ty, SemanticType::LONG);
        assert_eq!(
            ctx.scope.lookup_variable("nothing").unwrap().ty,
            SemanticType::object().as_nullable()
        );
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Ldc,
            Opcode::Astore,
            Opcode::Bipush,
            Opcode::I2l,
            Opcode::Lstore,
            Opcode::AconstNull,
            Opcode::Astore,
        ]);
        // `s` in 0, `wide` in 1-2, `nothing` in 3.
        assert_eq!(ctx.scope.local_count(), 4);
    }

    #[test]
    fn annotation_mismatch_is_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let err = StmtCompiler::new(&mut ctx)
            .compile(&b.var_typed("n", b.ty("int"), Some(b.str("x"))))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Cannot assign type of 'java.lang.String' to annotated type of 'int'."
        );
        assert!(ctx.scope.lookup_variable("n").is_none());
    }

    #[test]
    fn default_initialization() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let mut compiler = StmtCompiler::new(&mut ctx);
        compiler
            .compile(&b.var_typed("d", b.ty("double"), None))
            .unwrap();
        compiler
            .compile(&b.var_typed("s", b.nullable_ty("String"), None))
            .unwrap();
        let err = compiler
            .compile(&b.var_typed("t", b.ty("String"), None))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Cannot default initialize variable of type 'java.lang.String'"
        );
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Dconst0,
            Opcode::Dstore,
            Opcode::AconstNull,
            Opcode::Astore,
        ]);
    }

    #[test]
    fn initializer_cannot_see_its_variable() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let err = StmtCompiler::new(&mut ctx)
            .compile(&b.var("x", b.ident("x")))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: unknown variable 'x'");
    }
}
