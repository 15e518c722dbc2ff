//! Array construction: `new T[n][m]` and `new T[] { .. }`.

use ixion_ast::NewArrayExpr;
use ixion_core::{CompilationError, MAX_ARRAY_DIMENSIONS, PrimitiveKind, SemanticType, Span};

use super::{ExprCompiler, Result};
use crate::bytecode::Opcode;
use crate::conversion::{classify, emit_conversion};

/// Array sizes are ints or narrower integers.
fn is_size_type(ty: &SemanticType) -> bool {
    matches!(ty.primitive(), Some(kind) if kind.is_integer() && kind != PrimitiveKind::Long)
}

fn too_many_dimensions(span: Span) -> CompilationError {
    CompilationError::invalid_operation(
        format!("Array types have at most {MAX_ARRAY_DIMENSIONS} dimensions"),
        span,
    )
}

pub fn type_of_new_array(compiler: &ExprCompiler<'_, '_>, array: &NewArrayExpr<'_>) -> Result<SemanticType> {
    let element = compiler.ctx().resolve_type(&array.element)?;
    if element.is_void() {
        return Err(CompilationError::invalid_operation("Cannot create an array of void", array.span));
    }
    if array.sizes.is_empty() && array.initializer.is_none() {
        return Err(CompilationError::invalid_operation(
            "Array creation needs a size or an initializer",
            array.span,
        ));
    }
    SemanticType::try_array(element, array.dimensions())
        .ok_or_else(|| too_many_dimensions(array.span))
}

pub fn compile_new_array(compiler: &mut ExprCompiler<'_, '_>, array: &NewArrayExpr<'_>) -> Result<SemanticType> {
    let ty = type_of_new_array(compiler, array)?;
    let Some(element) = ty.element_type() else {
        return Err(CompilationError::internal("array without element type", array.span));
    };

    if let Some(items) = array.initializer {
        let resolver = compiler.resolver();
        for item in items {
            let item_ty = compiler.type_of(item)?;
            if classify(resolver, &element, &item_ty).is_none() {
                return Err(CompilationError::type_mismatch(
                    format!("Value of type '{item_ty}' cannot initialize array of type '{ty}'"),
                    item.span(),
                ));
            }
        }
        let emitter = compiler.emitter();
        emitter.push_int(items.len() as i32);
        emitter.new_array(&element);
        for (index, item) in items.iter().enumerate() {
            let emitter = compiler.emitter();
            emitter.emit(Opcode::Dup);
            emitter.push_int(index as i32);
            let item_ty = compiler.infer(item)?;
            let emitter = compiler.emitter();
            emit_conversion(emitter, &element, &item_ty);
            emitter.array_store(&element);
        }
        return Ok(ty);
    }

    for size in array.sizes {
        let size_ty = compiler.type_of(size)?;
        if !is_size_type(&size_ty) {
            return Err(CompilationError::type_mismatch("Array size must be an integer", size.span()));
        }
    }
    for size in array.sizes {
        compiler.infer(size)?;
    }
    match array.sizes.len() {
        1 => compiler.emitter().new_array(&element),
        n => compiler.emitter().new_multi_array(&ty, n as u8),
    }
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Instruction;
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::Scope;
    use bumpalo::Bump;
    use ixion_ast::AstBuilder;
    use ixion_core::Span;

    #[test]
    fn initializer_stores_each_item() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let ty = ExprCompiler::new(&mut ctx)
            .infer(&b.array_init(b.ty("long"), &[b.int(1), b.int(2)]))
            .unwrap();
        assert_eq!(ty, SemanticType::array(SemanticType::LONG, 1));
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Iconst2,
            Opcode::Newarray,
            Opcode::Dup,
            Opcode::Iconst0,
            Opcode::Iconst1,
            Opcode::I2l,
            Opcode::Lastore,
            Opcode::Dup,
            Opcode::Iconst1,
            Opcode::Iconst2,
            Opcode::I2l,
            Opcode::Lastore,
        ]);
    }

    #[test]
    fn dimension_count_is_bounded() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let mut compiler = ExprCompiler::new(&mut ctx);
        let element = b.array_ty("int", &[false; 20]);
        let err = compiler
            .type_of(&b.new_array(element, &[b.int(1)], 20))
            .unwrap_err();
        assert!(matches!(err, CompilationError::InvalidOperation { .. }));
        let err = compiler
            .type_of(&b.new_array(b.ty("int"), &[b.int(1)], 255))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Array types have at most 32 dimensions");
    }

    #[test]
    fn incompatible_items_are_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let err = ExprCompiler::new(&mut ctx)
            .infer(&b.array_init(b.ty("int"), &[b.str("x")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Value of type 'java.lang.String' cannot initialize array of type 'int[]'"
        );
        assert!(ctx.emitter.method().instructions.is_empty());
    }

    #[test]
    fn sized_dimensions() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("n", SemanticType::INT, false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        let single = compiler
            .infer(&b.new_array(b.ty("String"), &[b.ident("n")], 1))
            .unwrap();
        assert_eq!(single, SemanticType::array(SemanticType::string(), 2));
        let grid = compiler
            .infer(&b.new_array(b.ty("int"), &[b.int(3), b.ident("n")], 0))
            .unwrap();
        assert_eq!(grid, SemanticType::array(SemanticType::INT, 2));
        let err = compiler
            .infer(&b.new_array(b.ty("int"), &[b.long(3)], 0))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Array size must be an integer");

        let method = ctx.emitter.method();
        method.assert_opcodes(&[
            Opcode::Iload,
            Opcode::Anewarray,
            Opcode::Iconst3,
            Opcode::Iload,
            Opcode::Multianewarray,
        ]);
        assert!(method.instructions.iter().any(|insn| matches!(
            insn,
            Instruction::MultiANewArray(descriptor, 2) if descriptor == "[[I"
        )));
        assert!(method.instructions.iter().any(|insn| matches!(
            insn,
            Instruction::TypeInsn(Opcode::Anewarray, name) if name == "[Ljava/lang/String;"
        )));
    }
}
