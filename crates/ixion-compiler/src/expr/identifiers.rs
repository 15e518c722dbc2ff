//! Identifier compilation: locals, globals, and implicit `this` fields.

use ixion_ast::{Expr, Ident};
use ixion_core::{CompilationError, SemanticType};

use super::{ExprCompiler, Result};
use crate::bytecode::Opcode;
use crate::scope::{Binding, BindingKind, Storage};

pub fn type_of_ident(compiler: &ExprCompiler<'_, '_>, ident: &Ident<'_>) -> Result<SemanticType> {
    lookup(compiler, ident).map(|binding| binding.ty.clone())
}

/// Load the value of a variable.
pub fn compile_ident(compiler: &mut ExprCompiler<'_, '_>, ident: &Ident<'_>) -> Result<SemanticType> {
    let binding = lookup(compiler, ident)?.clone();
    load_binding(compiler, &binding, ident)?;
    if binding.narrowed_from.is_some() {
        compiler
            .emitter()
            .emit_type(Opcode::Checkcast, binding.ty.internal_name());
    }
    Ok(binding.ty)
}

/// Push the stored value of `binding` at its declared type.
pub fn load_binding(compiler: &mut ExprCompiler<'_, '_>, binding: &Binding, ident: &Ident<'_>) -> Result<()> {
    let declared = binding.declared_type().clone();
    match (&binding.kind, &binding.storage) {
        (BindingKind::Local, Storage::Local(slot)) => compiler.emitter().load(&declared, *slot),
        (BindingKind::StaticField, Storage::Field { owner, name }) => {
            compiler
                .emitter()
                .emit_field(Opcode::Getstatic, owner, name, &declared);
        }
        (BindingKind::InstanceField, Storage::Field { owner, name }) => {
            require_this(compiler, ident)?;
            let emitter = compiler.emitter();
            emitter.load(&SemanticType::object(), 0);
            emitter.emit_field(Opcode::Getfield, owner, name, &declared);
        }
        _ => {
            return Err(CompilationError::internal(
                format!("binding '{}' has inconsistent storage", binding.name),
                ident.span,
            ));
        }
    }
    Ok(())
}

/// Instance fields need `this`.
pub fn require_this(compiler: &ExprCompiler<'_, '_>, ident: &Ident<'_>) -> Result<()> {
    if compiler.ctx().is_static {
        return Err(CompilationError::illegal_control_flow(
            format!("Cannot access instance field '{}' from a static context.", ident.name),
            ident.span,
        ));
    }
    Ok(())
}

pub fn lookup<'s>(compiler: &'s ExprCompiler<'_, '_>, ident: &Ident<'_>) -> Result<&'s Binding> {
    compiler
        .ctx()
        .scope
        .lookup_variable(ident.name)
        .ok_or_else(|| CompilationError::UnknownVariable {
            name: ident.name.to_string(),
            span: ident.span,
        })
}

/// A receiver naming a class rather than a value: an identifier that is not
/// a variable but resolves as a type. Returns the internal class name.
pub fn class_reference(compiler: &ExprCompiler<'_, '_>, receiver: &Expr<'_>) -> Option<String> {
    match receiver.unparenthesized() {
        Expr::Ident(ident) if compiler.ctx().scope.lookup_variable(ident.name).is_none() => {
            compiler.ctx().env.types.lookup_class(ident.name)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::Scope;
    use bumpalo::Bump;
    use ixion_ast::AstBuilder;
    use ixion_core::Span;

    #[test]
    fn locals_and_statics_load_by_storage() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let mut root = Scope::new();
        root.add_variable(Binding::field(
            "counter",
            "mainixc",
            SemanticType::INT,
            true,
            false,
            Span::default(),
        ))
        .unwrap();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("d", SemanticType::DOUBLE, false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        assert_eq!(compiler.infer(&b.ident("d")).unwrap(), SemanticType::DOUBLE);
        assert_eq!(compiler.infer(&b.ident("counter")).unwrap(), SemanticType::INT);
        ctx.emitter
            .method()
            .assert_opcodes(&[Opcode::Dload, Opcode::Getstatic]);
    }

    #[test]
    fn unknown_and_instance_fields_in_static_context() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let mut root = Scope::new();
        root.add_variable(Binding::field(
            "size",
            "mainixc",
            SemanticType::INT,
            false,
            false,
            Span::default(),
        ))
        .unwrap();
        let mut ctx = static_context(&env, &root);
        let mut compiler = ExprCompiler::new(&mut ctx);

        assert!(matches!(
            compiler.infer(&b.ident("nope")),
            Err(CompilationError::UnknownVariable { .. })
        ));
        assert!(matches!(
            compiler.infer(&b.ident("size")),
            Err(CompilationError::IllegalControlFlow { .. })
        ));
    }

    #[test]
    fn narrowed_local_is_cast_on_read() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("o", SemanticType::object(), false, Span::default())
            .unwrap();
        ctx.scope.narrow("o", SemanticType::string());

        let ty = ExprCompiler::new(&mut ctx).infer(&b.ident("o")).unwrap();
        assert_eq!(ty, SemanticType::string());
        ctx.emitter
            .method()
            .assert_opcodes(&[Opcode::Aload, Opcode::Checkcast]);
    }

    #[test]
    fn class_names_are_not_values() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        let compiler = ExprCompiler::new(&mut ctx);
        assert_eq!(
            class_reference(&compiler, &b.ident("Integer")).as_deref(),
            Some("java/lang/Integer")
        );
        assert_eq!(class_reference(&compiler, &b.ident("x")), None);
    }
}
