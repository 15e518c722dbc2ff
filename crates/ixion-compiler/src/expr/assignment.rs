//! Assignment and the writable places shared with `++`/`--`.
//!
//! A [`Place`] is resolved from the target expression before anything is
//! emitted. Writing then follows one shape for every kind of place:
//! push the address (receiver, or array and index), optionally read the
//! current value for compound operators, compute the new value, keep a copy
//! under the address when the assignment is used as a value, store.

use ixion_ast::{AssignExpr, BinaryOp, Expr};
use ixion_core::{CompilationError, Modifiers, PrimitiveKind, SemanticType, Span};
use tracing::trace;

use super::binary::{Operation, classify_operation, emit_operator, emit_repeat};
use super::calls::MethodTarget;
use super::concat::emit_concat_call;
use super::identifiers::{lookup, require_this};
use super::member::{FieldRef, Receiver, capitalize, element_of, emit_index, find_visible_field, index_type, receiver_of};
use super::{ExprCompiler, Result, emit_operand_conversion, operand_kind};
use crate::bytecode::{Label, Opcode};
use crate::conversion::classify;
use crate::emit::BytecodeEmitter;
use crate::scope::{BindingKind, Storage};

// =============================================================================
// Places
// =============================================================================

/// A storage location an assignment can write.
#[derive(Debug, Clone)]
pub enum Place<'ast> {
    Local {
        name: String,
        slot: u16,
        ty: SemanticType,
    },
    Static {
        owner: String,
        name: String,
        ty: SemanticType,
    },
    /// A field of `this` (no receiver) or of an explicit receiver.
    Field {
        receiver: Option<&'ast Expr<'ast>>,
        field: FieldRef,
        null_safe: bool,
    },
    Element {
        target: &'ast Expr<'ast>,
        index: &'ast Expr<'ast>,
        element: SemanticType,
        null_safe: bool,
    },
    /// A `setName(value)` method standing in for a field. Write only.
    Setter {
        receiver: Option<&'ast Expr<'ast>>,
        target: MethodTarget,
        null_safe: bool,
    },
}

impl Place<'_> {
    /// Type of the stored value.
    pub fn ty(&self) -> &SemanticType {
        match self {
            Place::Local { ty, .. } | Place::Static { ty, .. } => ty,
            Place::Field { field, .. } => &field.ty,
            Place::Element { element, .. } => element,
            Place::Setter { target, .. } => &target.params[0],
        }
    }

    pub fn is_null_safe(&self) -> bool {
        match self {
            Place::Field { null_safe, .. } | Place::Element { null_safe, .. } | Place::Setter { null_safe, .. } => {
                *null_safe
            }
            _ => false,
        }
    }
}

fn cannot_assign(span: Span) -> CompilationError {
    CompilationError::invalid_lvalue("Invalid lvalue - cannot assign", span)
}

fn constant(name: &str, span: Span) -> CompilationError {
    CompilationError::invalid_lvalue(format!("Reassignment of constant '{name}'."), span)
}

/// Resolve the place `target` denotes.
pub fn resolve_place<'ast>(compiler: &ExprCompiler<'_, '_>, target: &'ast Expr<'ast>) -> Result<Place<'ast>> {
    match target {
        Expr::Paren(p) => resolve_place(compiler, p.expr),
        Expr::Ident(ident) => {
            let binding = lookup(compiler, ident)?;
            if binding.is_const {
                return Err(constant(ident.name, ident.span));
            }
            let ty = binding.declared_type().clone();
            match (&binding.kind, &binding.storage) {
                (BindingKind::Local, Storage::Local(slot)) => Ok(Place::Local {
                    name: binding.name.clone(),
                    slot: *slot,
                    ty,
                }),
                (BindingKind::StaticField, Storage::Field { owner, name }) => Ok(Place::Static {
                    owner: owner.clone(),
                    name: name.clone(),
                    ty,
                }),
                (BindingKind::InstanceField, Storage::Field { owner, name }) => {
                    require_this(compiler, ident)?;
                    Ok(Place::Field {
                        receiver: None,
                        field: FieldRef {
                            owner: owner.clone(),
                            name: name.clone(),
                            ty,
                            modifiers: Modifiers::empty(),
                        },
                        null_safe: false,
                    })
                }
                _ => Err(CompilationError::internal(
                    format!("binding '{}' has inconsistent storage", binding.name),
                    ident.span,
                )),
            }
        }
        Expr::Member(m) => {
            let (owner_ty, static_access, receiver) = match receiver_of(compiler, m.receiver)? {
                Receiver::Class(class) => (SemanticType::reference(&class), true, None),
                Receiver::Super(superclass) => (SemanticType::reference(&superclass), false, Some(m.receiver)),
                Receiver::Value(ty) => {
                    check_receiver_nullability(&ty, m.null_safe, '.', m.span)?;
                    (ty.as_non_nullable(), false, Some(m.receiver))
                }
            };
            let SemanticType::Reference { name: owner, .. } = &owner_ty else {
                return Err(cannot_assign(m.span));
            };

            if let Some(field) = find_visible_field(compiler, owner, m.name.name, m.name.span)? {
                if field.is_static() != static_access {
                    let message = if static_access {
                        "Cannot access non-static member from static class."
                    } else {
                        "Cannot access static member from non-static object."
                    };
                    return Err(CompilationError::invalid_operation(message, m.name.span));
                }
                let through_this = matches!(m.receiver.unparenthesized(), Expr::This(_));
                if field.modifiers.is_final() && !(through_this && compiler.ctx().in_constructor()) {
                    return Err(CompilationError::invalid_lvalue(
                        format!("Cannot assign final member '{}'", m.name.name),
                        m.name.span,
                    ));
                }
                if field.is_static() {
                    return Ok(Place::Static {
                        owner: field.owner,
                        name: field.name,
                        ty: field.ty,
                    });
                }
                return Ok(Place::Field {
                    receiver,
                    field,
                    null_safe: m.null_safe,
                });
            }

            let setter = format!("set{}", capitalize(m.name.name));
            let current = compiler.ctx().owner.name.as_str();
            let found = compiler
                .resolver()
                .find_methods(owner, &setter)
                .map_err(|e| e.at(m.name.span))?;
            let target = found.into_iter().find(|(class, method)| {
                method.params.len() == 1
                    && method.is_static() == static_access
                    && (!method.modifiers.is_private() || class.name == current)
            });
            match target {
                Some((class, method)) => Ok(Place::Setter {
                    receiver: if static_access { None } else { receiver },
                    target: MethodTarget::from_host(class, method),
                    null_safe: m.null_safe,
                }),
                None => Err(CompilationError::UnknownMember {
                    owner: owner_ty.to_string(),
                    name: m.name.name.to_string(),
                    span: m.name.span,
                }),
            }
        }
        Expr::Index(i) => {
            let array = compiler.type_of(i.target)?;
            check_receiver_nullability(&array, i.null_safe, '[', i.span)?;
            let element = element_of(&array.as_non_nullable(), i.span)?;
            index_type(compiler, i.index)?;
            Ok(Place::Element {
                target: i.target,
                index: i.index,
                element,
                null_safe: i.null_safe,
            })
        }
        other => Err(cannot_assign(other.span())),
    }
}

fn check_receiver_nullability(ty: &SemanticType, null_safe: bool, access: char, span: Span) -> Result<()> {
    if null_safe && !ty.is_nullable() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot use '?{access}' on non-nullable type ('{ty}')"),
            span,
        ));
    }
    if !null_safe && ty.is_nullable() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot use '{access}' to access members on a nullable type ('{ty}')"),
            span,
        ));
    }
    Ok(())
}

// =============================================================================
// Place emission
// =============================================================================

/// Push the address of `place`. For null-safe places, returns the label
/// jumped to with the receiver still on the stack when it is null.
pub fn emit_address(compiler: &mut ExprCompiler<'_, '_>, place: &Place<'_>) -> Result<Option<Label>> {
    let receiver = match place {
        Place::Local { .. } | Place::Static { .. } => return Ok(None),
        Place::Field { receiver, .. } | Place::Setter { receiver, .. } => *receiver,
        Place::Element { target, .. } => Some(*target),
    };
    let skip = match receiver {
        Some(receiver) => {
            compiler.infer(receiver)?;
            if place.is_null_safe() {
                let skip = compiler.emitter().new_label();
                let emitter = compiler.emitter();
                emitter.emit(Opcode::Dup);
                emitter.emit_jump(Opcode::Ifnull, skip);
                Some(skip)
            } else {
                None
            }
        }
        None if matches!(place, Place::Field { .. }) => {
            compiler.emitter().load(&SemanticType::object(), 0);
            None
        }
        None => None,
    };
    if let Place::Element { index, .. } = place {
        emit_index(compiler, index)?;
    }
    Ok(skip)
}

/// Push the current value, keeping the address below it.
pub fn emit_read(emitter: &mut BytecodeEmitter, place: &Place<'_>) {
    match place {
        Place::Local { slot, ty, .. } => emitter.load(ty, *slot),
        Place::Static { owner, name, ty } => emitter.emit_field(Opcode::Getstatic, owner, name, ty),
        Place::Field { field, .. } => {
            emitter.emit(Opcode::Dup);
            emitter.emit_field(Opcode::Getfield, &field.owner, &field.name, &field.ty);
        }
        Place::Element { element, .. } => {
            emitter.emit(Opcode::Dup2);
            emitter.array_load(element);
        }
        Place::Setter { .. } => {}
    }
}

/// Copy the new value on top of the stack below the address.
pub fn emit_keep(emitter: &mut BytecodeEmitter, place: &Place<'_>) {
    let ty = place.ty();
    match place {
        Place::Local { .. } | Place::Static { .. } => emitter.dup(ty),
        Place::Setter { receiver: None, .. } => emitter.dup(ty),
        Place::Field { .. } | Place::Setter { .. } => emitter.dup_x1(ty),
        Place::Element { .. } => emitter.dup_x2(ty),
    }
}

/// Store the value on top of the stack, consuming the address.
pub fn emit_write(emitter: &mut BytecodeEmitter, place: &Place<'_>) {
    match place {
        Place::Local { slot, ty, .. } => emitter.store(ty, *slot),
        Place::Static { owner, name, ty } => emitter.emit_field(Opcode::Putstatic, owner, name, ty),
        Place::Field { field, .. } => emitter.emit_field(Opcode::Putfield, &field.owner, &field.name, &field.ty),
        Place::Element { element, .. } => emitter.array_store(element),
        Place::Setter { target, .. } => {
            target.emit_invoke(emitter);
            emitter.pop(&target.return_type);
        }
    }
}

/// Close a null-safe write: the skipped path drops the null receiver.
pub fn finish_null_safe(emitter: &mut BytecodeEmitter, skip: Option<Label>) {
    if let Some(skip) = skip {
        let end = emitter.new_label();
        emitter.emit_jump(Opcode::Goto, end);
        emitter.mark(skip);
        emitter.emit(Opcode::Pop);
        emitter.mark(end);
    }
}

/// Convert a result computed in `kind` back to the type stored in `ty`.
pub fn emit_store_conversion(emitter: &mut BytecodeEmitter, kind: PrimitiveKind, ty: &SemanticType) {
    match ty {
        SemanticType::Primitive(target) => {
            emitter.cast_primitive(kind, *target);
        }
        _ => {
            if let Some(unboxed) = ty.unboxed_kind() {
                emitter.cast_primitive(kind, unboxed);
                emitter.box_primitive(unboxed);
            }
        }
    }
}

// =============================================================================
// Assignment
// =============================================================================

/// Operation a compound assignment performs, checked against the place.
fn compound_operation(
    compiler: &ExprCompiler<'_, '_>,
    place: &Place<'_>,
    op: BinaryOp,
    assign: &AssignExpr<'_>,
) -> Result<(Operation, SemanticType)> {
    if matches!(place, Place::Setter { .. }) {
        return Err(CompilationError::invalid_lvalue(
            "Invalid lvalue - cannot perform operation",
            assign.span,
        ));
    }
    let target = place.ty();
    let value = compiler.type_of(assign.value)?;
    let operation = classify_operation(compiler.resolver(), op, target, &value, assign.span)?;
    let result = match operation {
        Operation::Concat | Operation::Repeat { string_first: true } => SemanticType::string(),
        Operation::Arithmetic(_) | Operation::Bitwise(_) | Operation::Shift(_) => target.clone(),
        _ => {
            return Err(CompilationError::invalid_operation(
                format!("Operator '{op}=' cannot be applied to '{target}' and '{value}'."),
                assign.span,
            ));
        }
    };
    if classify(compiler.resolver(), target, &result).is_none() {
        return Err(CompilationError::type_mismatch(
            format!("Incompatible types ({target} =/= {result})"),
            assign.span,
        ));
    }
    Ok((operation, value))
}

pub fn type_of_assign(compiler: &ExprCompiler<'_, '_>, assign: &AssignExpr<'_>) -> Result<SemanticType> {
    let place = resolve_place(compiler, assign.target)?;
    Ok(place.ty().clone())
}

/// Compile an assignment.
///
/// # Arguments
///
/// * `want_value` - Leave the assigned value on the stack
///
/// # Returns
///
/// The type left on the stack, `void` when `want_value` is false.
pub fn compile_assign(
    compiler: &mut ExprCompiler<'_, '_>,
    assign: &AssignExpr<'_>,
    want_value: bool,
) -> Result<SemanticType> {
    let place = resolve_place(compiler, assign.target)?;
    if want_value && place.is_null_safe() {
        return Err(CompilationError::invalid_lvalue(
            "Null-safe assignment cannot be used as a value.",
            assign.span,
        ));
    }
    let ty = place.ty().clone();
    let compound = match assign.op.binary_op() {
        Some(op) => Some((op, compound_operation(compiler, &place, op, assign)?)),
        None => None,
    };

    let skip = emit_address(compiler, &place)?;
    match compound {
        None => compiler.check(assign.value, &ty)?,
        Some((op, (operation, value_ty))) => {
            emit_read(compiler.emitter(), &place);
            match operation {
                Operation::Concat => {
                    compiler.infer(assign.value)?;
                    emit_concat_call(compiler.emitter(), "\u{1}\u{1}".to_string(), &[ty.clone(), value_ty]);
                }
                Operation::Repeat { .. } => {
                    compiler.infer(assign.value)?;
                    let emitter = compiler.emitter();
                    emit_operand_conversion(emitter, &value_ty, PrimitiveKind::Int);
                    emit_repeat(emitter);
                }
                Operation::Arithmetic(kind) | Operation::Bitwise(kind) | Operation::Shift(kind) => {
                    let right = if matches!(operation, Operation::Shift(_)) {
                        PrimitiveKind::Int
                    } else {
                        kind
                    };
                    emit_operand_conversion(compiler.emitter(), &ty, kind);
                    compiler.infer(assign.value)?;
                    let emitter = compiler.emitter();
                    emit_operand_conversion(emitter, &value_ty, right);
                    emit_operator(emitter, op, kind);
                    emit_store_conversion(emitter, kind, &ty);
                }
                Operation::Condition | Operation::Coalesce(_) => {}
            }
        }
    }

    let emitter = compiler.emitter();
    if want_value {
        emit_keep(emitter, &place);
    }
    emit_write(emitter, &place);
    finish_null_safe(emitter, skip);

    widen_variable(compiler, assign.target);
    Ok(if want_value { ty } else { SemanticType::VOID })
}

/// A write to a narrowed variable restores its declared type.
pub(super) fn widen_variable(compiler: &mut ExprCompiler<'_, '_>, target: &Expr<'_>) {
    if let Expr::Ident(ident) = target.unparenthesized() {
        trace!(variable = ident.name, "write widens narrowed type");
        compiler.ctx_mut().scope.widen(ident.name);
    }
}

/// Kind an update or compound operand computes in, if numeric.
pub(super) fn numeric_kind(ty: &SemanticType) -> Option<PrimitiveKind> {
    operand_kind(ty).filter(|kind| kind.is_numeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::eval::{Evaluator, Value};
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::{Binding, Scope};
    use bumpalo::Bump;
    use ixion_ast::{AssignOp, AstBuilder};
    use ixion_core::Modifiers;
    use ixion_registry::{HostClassDescriptor, HostRegistry};

    #[test]
    fn plain_assignment_as_statement_and_value() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("x", SemanticType::LONG, false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        compiler.discard(&b.assign(b.ident("x"), b.int(3))).unwrap();
        let ty = compiler.infer(&b.assign(b.ident("x"), b.long(4))).unwrap();
        assert_eq!(ty, SemanticType::LONG);
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Iconst3,
            Opcode::I2l,
            Opcode::Lstore,
            Opcode::Ldc,
            Opcode::Dup2,
            Opcode::Lstore,
        ]);
    }

    #[test]
    fn compound_narrows_back_to_target() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("s", SemanticType::SHORT, false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        compiler
            .infer(&b.compound(b.ident("s"), AssignOp::MulAssign, b.double(2.5)))
            .unwrap();
        ctx.emitter.emit(Opcode::Ireturn);
        let method = ctx.finish().method;
        method.assert_opcodes(&[
            Opcode::Iload,
            Opcode::I2d,
            Opcode::Ldc,
            Opcode::Dmul,
            Opcode::D2i,
            Opcode::I2s,
            Opcode::Dup,
            Opcode::Istore,
            Opcode::Ireturn,
        ]);
        let result = Evaluator::new()
            .run(&method.instructions, vec![Value::Int(3)])
            .unwrap();
        assert_eq!(result, Some(Value::Int(7)));
    }

    #[test]
    fn string_append_uses_concat() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("s", SemanticType::string(), false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        compiler
            .infer(&b.compound(b.ident("s"), AssignOp::AddAssign, b.int(1)))
            .unwrap();
        ctx.emitter.emit(Opcode::Areturn);
        let method = ctx.finish().method;
        let result = Evaluator::new()
            .run(&method.instructions, vec![Value::Str("n".into())])
            .unwrap();
        assert_eq!(result, Some(Value::Str("n1".into())));
    }

    #[test]
    fn constants_and_non_places_are_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("k", SemanticType::INT, true, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        let err = compiler.infer(&b.assign(b.ident("k"), b.int(1))).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Reassignment of constant 'k'.");
        let err = compiler.infer(&b.assign(b.int(2), b.int(1))).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Invalid lvalue - cannot assign");
        let err = compiler
            .infer(&b.compound(b.ident("k"), AssignOp::AddAssign, b.str("x")))
            .unwrap_err();
        assert!(matches!(err, CompilationError::InvalidLValue { .. }));
    }

    #[test]
    fn array_elements_and_static_fields() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let mut root = Scope::new();
        root.add_variable(Binding::field(
            "total",
            "mainixc",
            SemanticType::DOUBLE,
            true,
            false,
            Span::default(),
        ))
        .unwrap();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("xs", SemanticType::array(SemanticType::INT, 1), false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        compiler
            .discard(&b.compound(b.index(b.ident("xs"), b.int(0)), AssignOp::AddAssign, b.int(2)))
            .unwrap();
        compiler
            .infer(&b.assign(b.ident("total"), b.int(1)))
            .unwrap();
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Aload,
            Opcode::Iconst0,
            Opcode::Dup2,
            Opcode::Iaload,
            Opcode::Iconst2,
            Opcode::Iadd,
            Opcode::Iastore,
            Opcode::Iconst1,
            Opcode::I2d,
            Opcode::Dup2,
            Opcode::Putstatic,
        ]);
    }

    #[test]
    fn final_fields_and_setters() {
        let mut registry = HostRegistry::with_prelude();
        registry.register(
            HostClassDescriptor::class("app/Box")
                .field("id", SemanticType::INT, Modifiers::PUBLIC | Modifiers::FINAL)
                .method("setLabel", "(Ljava/lang/String;)V"),
        );
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture {
            registry,
            options: Default::default(),
        };
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("box", SemanticType::reference("app/Box"), false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        let err = compiler
            .discard(&b.assign(b.member(b.ident("box"), "id"), b.int(1)))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Cannot assign final member 'id'");
        compiler
            .discard(&b.assign(b.member(b.ident("box"), "label"), b.str("x")))
            .unwrap();
        ctx.emitter
            .method()
            .assert_opcodes(&[Opcode::Aload, Opcode::Ldc, Opcode::Invokevirtual]);
    }

    #[test]
    fn null_safe_assignment_is_a_statement() {
        let mut registry = HostRegistry::with_prelude();
        registry.register(HostClassDescriptor::class("app/Node").field(
            "value",
            SemanticType::INT,
            Modifiers::PUBLIC,
        ));
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture {
            registry,
            options: Default::default(),
        };
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("n", SemanticType::nullable_reference("app/Node"), false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        let target = b.null_safe_member(b.ident("n"), "value");
        assert!(compiler.infer(&b.assign(target, b.int(1))).is_err());
        compiler.discard(&b.assign(target, b.int(1))).unwrap();
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Aload,
            Opcode::Dup,
            Opcode::Ifnull,
            Opcode::Iconst1,
            Opcode::Putfield,
            Opcode::Goto,
            Opcode::Pop,
        ]);
    }
}
