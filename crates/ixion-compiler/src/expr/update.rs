//! `++` and `--`, prefix and postfix.

use ixion_ast::{BinaryOp, LValueKind, UpdateExpr, UpdateOp};
use ixion_core::{CompilationError, PrimitiveKind, SemanticType};

use super::assignment::{
    Place, emit_address, emit_keep, emit_read, emit_store_conversion, emit_write, numeric_kind, resolve_place,
    widen_variable,
};
use super::binary::emit_operator;
use super::{ExprCompiler, Result, emit_operand_conversion};

fn symbol(op: UpdateOp) -> &'static str {
    match op {
        UpdateOp::Increment => "++",
        UpdateOp::Decrement => "--",
    }
}

/// The updated place and the kind the arithmetic runs in.
fn update_place<'ast>(
    compiler: &ExprCompiler<'_, '_>,
    update: &UpdateExpr<'ast>,
) -> Result<(Place<'ast>, PrimitiveKind)> {
    let invalid = || CompilationError::invalid_lvalue("Invalid lvalue - cannot perform operation", update.span);
    match update.target.lvalue_kind() {
        Some(LValueKind::Variable | LValueKind::Property | LValueKind::Array) => {}
        _ => return Err(invalid()),
    }
    let place = resolve_place(compiler, update.target)?;
    if matches!(place, Place::Setter { .. }) {
        return Err(invalid());
    }
    let Some(kind) = numeric_kind(place.ty()) else {
        return Err(CompilationError::type_mismatch(
            format!(
                "Update expression ('{}') target must be numeric (got '{}')",
                symbol(update.op),
                place.ty()
            ),
            update.span,
        ));
    };
    let kind = match kind {
        PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char => PrimitiveKind::Int,
        other => other,
    };
    Ok((place, kind))
}

pub fn type_of_update(compiler: &ExprCompiler<'_, '_>, update: &UpdateExpr<'_>) -> Result<SemanticType> {
    update_place(compiler, update).map(|(place, _)| place.ty().clone())
}

/// Compile an update.
///
/// A postfix update used as a value leaves the old value; a prefix one the
/// new value. Int locals use `iinc`.
pub fn compile_update(
    compiler: &mut ExprCompiler<'_, '_>,
    update: &UpdateExpr<'_>,
    want_value: bool,
) -> Result<SemanticType> {
    let (place, kind) = update_place(compiler, update)?;
    let ty = place.ty().clone();

    if let Place::Local { slot, .. } = place
        && ty == SemanticType::INT
    {
        let emitter = compiler.emitter();
        if want_value && !update.prefix {
            emitter.load(&ty, slot);
        }
        emitter.iinc(slot, update.op.delta() as i16);
        if want_value && update.prefix {
            emitter.load(&ty, slot);
        }
    } else {
        emit_address(compiler, &place)?;
        let emitter = compiler.emitter();
        emit_read(emitter, &place);
        if want_value && !update.prefix {
            emit_keep(emitter, &place);
        }
        emit_operand_conversion(emitter, &ty, kind);
        match kind {
            PrimitiveKind::Long => emitter.push_long(1),
            PrimitiveKind::Float => emitter.push_float(1.0),
            PrimitiveKind::Double => emitter.push_double(1.0),
            _ => emitter.push_int(1),
        }
        let op = match update.op {
            UpdateOp::Increment => BinaryOp::Add,
            UpdateOp::Decrement => BinaryOp::Sub,
        };
        emit_operator(emitter, op, kind);
        emit_store_conversion(emitter, kind, &ty);
        if want_value && update.prefix {
            emit_keep(emitter, &place);
        }
        emit_write(emitter, &place);
    }

    widen_variable(compiler, update.target);
    Ok(if want_value { ty } else { SemanticType::VOID })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Opcode;
    use crate::bytecode::eval::{Evaluator, Value};
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::Scope;
    use bumpalo::Bump;
    use ixion_ast::AstBuilder;
    use ixion_core::Span;

    #[test]
    fn int_locals_use_iinc() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("i", SemanticType::INT, false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        compiler
            .discard(&b.update(UpdateOp::Increment, false, b.ident("i")))
            .unwrap();
        compiler
            .infer(&b.update(UpdateOp::Decrement, false, b.ident("i")))
            .unwrap();
        compiler
            .infer(&b.update(UpdateOp::Increment, true, b.ident("i")))
            .unwrap();
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Iinc,
            Opcode::Iload,
            Opcode::Iinc,
            Opcode::Iinc,
            Opcode::Iload,
        ]);
    }

    #[test]
    fn postfix_keeps_the_old_value() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("d", SemanticType::DOUBLE, false, Span::default())
            .unwrap();

        let ty = ExprCompiler::new(&mut ctx)
            .infer(&b.update(UpdateOp::Increment, false, b.ident("d")))
            .unwrap();
        assert_eq!(ty, SemanticType::DOUBLE);
        ctx.emitter.emit(Opcode::Dreturn);
        let method = ctx.finish().method;
        method.assert_opcodes(&[
            Opcode::Dload,
            Opcode::Dup2,
            Opcode::Dconst1,
            Opcode::Dadd,
            Opcode::Dstore,
            Opcode::Dreturn,
        ]);
        let result = Evaluator::new()
            .run(&method.instructions, vec![Value::Double(1.5)])
            .unwrap();
        assert_eq!(result, Some(Value::Double(1.5)));
    }

    #[test]
    fn byte_updates_narrow_back() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("x", SemanticType::BYTE, false, Span::default())
            .unwrap();

        ExprCompiler::new(&mut ctx)
            .infer(&b.update(UpdateOp::Increment, true, b.ident("x")))
            .unwrap();
        ctx.emitter.emit(Opcode::Ireturn);
        let method = ctx.finish().method;
        let result = Evaluator::new()
            .run(&method.instructions, vec![Value::Int(127)])
            .unwrap();
        assert_eq!(result, Some(Value::Int(-128)));
    }

    #[test]
    fn targets_must_be_numeric_places() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("s", SemanticType::string(), false, Span::default())
            .unwrap();
        ctx.scope
            .declare_local("k", SemanticType::INT, true, Span::default())
            .unwrap();
        let compiler = ExprCompiler::new(&mut ctx);

        let err = compiler
            .type_of(&b.update(UpdateOp::Increment, false, b.ident("s")))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Update expression ('++') target must be numeric (got 'java.lang.String')"
        );
        let err = compiler
            .type_of(&b.update(UpdateOp::Decrement, true, b.int(1)))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Invalid lvalue - cannot perform operation");
        let err = compiler
            .type_of(&b.update(UpdateOp::Decrement, true, b.ident("k")))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Reassignment of constant 'k'.");
    }
}
