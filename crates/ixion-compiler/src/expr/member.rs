//! Member access and indexing.
//!
//! `recv.name` resolves, in order, to an array's `length`, a visible field,
//! a `getName()` getter, and finally a zero-argument method `name()`. An
//! identifier receiver that names no variable but a class makes the access
//! static.

use ixion_ast::{Expr, Ident, IndexExpr, MemberExpr};
use ixion_core::{CompilationError, Modifiers, PrimitiveKind, SemanticType, Span};

use super::calls::MethodTarget;
use super::identifiers::class_reference;
use super::{ExprCompiler, Result, emit_operand_conversion, operand_kind};
use crate::bytecode::Opcode;

/// What a member's receiver expression denotes.
#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    /// A class name: static access.
    Class(String),
    /// `super`, naming the superclass of the current class.
    Super(String),
    /// A value of the given type.
    Value(SemanticType),
}

pub fn receiver_of(compiler: &ExprCompiler<'_, '_>, receiver: &Expr<'_>) -> Result<Receiver> {
    if let Some(class) = class_reference(compiler, receiver) {
        return Ok(Receiver::Class(class));
    }
    if let Expr::Super(span) = receiver.unparenthesized() {
        compiler.ctx().require_instance("super", *span)?;
        return Ok(Receiver::Super(compiler.ctx().owner.superclass.clone()));
    }
    compiler.type_of(receiver).map(Receiver::Value)
}

// =============================================================================
// Resolution
// =============================================================================

/// A field reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    /// Declaring class.
    pub owner: String,
    pub name: String,
    pub ty: SemanticType,
    pub modifiers: Modifiers,
}

impl FieldRef {
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }
}

/// A resolved member read.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    ArrayLength,
    Field(FieldRef),
    /// A getter or zero-argument method standing in for a field.
    Method(MethodTarget),
}

impl Access {
    pub fn result_type(&self) -> SemanticType {
        match self {
            Access::ArrayLength => SemanticType::INT,
            Access::Field(field) => field.ty.clone(),
            Access::Method(target) => target.return_type.clone(),
        }
    }
}

/// Resolve `name` on a receiver of type `owner_ty`.
pub fn resolve_access(
    compiler: &ExprCompiler<'_, '_>,
    owner_ty: &SemanticType,
    name: &Ident<'_>,
    static_access: bool,
) -> Result<Access> {
    let span = name.span;
    let owner = match owner_ty {
        SemanticType::Array { .. } if name.name == "length" && !static_access => {
            return Ok(Access::ArrayLength);
        }
        SemanticType::Reference { name, .. } => name.as_str(),
        other => {
            return Err(CompilationError::invalid_operation(
                format!("Cannot access member on type '{other}'"),
                span,
            ));
        }
    };

    if let Some(field) = find_visible_field(compiler, owner, name.name, span)? {
        if field.is_static() && !static_access {
            return Err(CompilationError::invalid_operation(
                "Cannot access static member from non-static object.",
                span,
            ));
        }
        if !field.is_static() && static_access {
            return Err(CompilationError::invalid_operation(
                "Cannot access non-static member from static class.",
                span,
            ));
        }
        return Ok(Access::Field(field));
    }

    let getter = format!("get{}", capitalize(name.name));
    for method_name in [getter.as_str(), name.name] {
        if let Some(target) = zero_argument_method(compiler, owner, method_name, static_access, span)? {
            return Ok(Access::Method(target));
        }
    }

    Err(CompilationError::UnknownMember {
        owner: owner_ty.as_non_nullable().to_string(),
        name: name.name.to_string(),
        span,
    })
}

/// A field visible from the current class: private fields only inside
/// their own class.
pub fn find_visible_field(
    compiler: &ExprCompiler<'_, '_>,
    owner: &str,
    name: &str,
    span: Span,
) -> Result<Option<FieldRef>> {
    let found = compiler
        .resolver()
        .find_field(owner, name)
        .map_err(|e| e.at(span))?;
    Ok(found
        .filter(|(class, field)| !field.modifiers.is_private() || class.name == compiler.ctx().owner.name)
        .map(|(class, field)| FieldRef {
            owner: class.name.clone(),
            name: field.name.clone(),
            ty: field.ty.clone(),
            modifiers: field.modifiers,
        }))
}

fn zero_argument_method(
    compiler: &ExprCompiler<'_, '_>,
    owner: &str,
    name: &str,
    static_access: bool,
    span: Span,
) -> Result<Option<MethodTarget>> {
    let current = compiler.ctx().owner.name.as_str();
    let methods = compiler
        .resolver()
        .find_methods(owner, name)
        .map_err(|e| e.at(span))?;
    Ok(methods
        .into_iter()
        .find(|(class, method)| {
            method.params.is_empty()
                && !method.return_type.is_void()
                && method.is_static() == static_access
                && (!method.modifiers.is_private() || class.name == current)
        })
        .map(|(class, method)| MethodTarget::from_host(class, method)))
}

pub(super) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Emit a read of `access` with its receiver (if any) on the stack.
pub fn emit_access(compiler: &mut ExprCompiler<'_, '_>, access: &Access) -> SemanticType {
    let emitter = compiler.emitter();
    match access {
        Access::ArrayLength => emitter.emit(Opcode::Arraylength),
        Access::Field(field) => {
            let op = if field.is_static() { Opcode::Getstatic } else { Opcode::Getfield };
            emitter.emit_field(op, &field.owner, &field.name, &field.ty);
        }
        Access::Method(target) => target.emit_invoke(emitter),
    }
    access.result_type()
}

// =============================================================================
// Member expressions
// =============================================================================

fn require_non_nullable(ty: &SemanticType, span: Span) -> Result<()> {
    if ty.is_nullable() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot use '.' to access members on a nullable type ('{ty}')"),
            span,
        ));
    }
    Ok(())
}

/// Resolve a plain (not null-safe) member expression.
pub fn resolve_member(compiler: &ExprCompiler<'_, '_>, member: &MemberExpr<'_>) -> Result<Access> {
    match receiver_of(compiler, member.receiver)? {
        Receiver::Class(class) => resolve_access(compiler, &SemanticType::reference(&class), &member.name, true),
        Receiver::Super(superclass) => {
            resolve_access(compiler, &SemanticType::reference(&superclass), &member.name, false)
        }
        Receiver::Value(ty) => {
            require_non_nullable(&ty, member.span)?;
            resolve_access(compiler, &ty, &member.name, false)
        }
    }
}

pub fn type_of_member(compiler: &ExprCompiler<'_, '_>, member: &MemberExpr<'_>) -> Result<SemanticType> {
    resolve_member(compiler, member).map(|access| access.result_type())
}

pub fn compile_member(compiler: &mut ExprCompiler<'_, '_>, member: &MemberExpr<'_>) -> Result<SemanticType> {
    let access = resolve_member(compiler, member)?;
    let static_field = matches!(&access, Access::Field(field) if field.is_static());
    let static_method = matches!(&access, Access::Method(target) if target.is_static);
    if !static_field && !static_method {
        compiler.infer(member.receiver)?;
    }
    Ok(emit_access(compiler, &access))
}

// =============================================================================
// Indexing
// =============================================================================

/// Element type of an indexed array.
pub fn element_of(target: &SemanticType, span: Span) -> Result<SemanticType> {
    target.element_type().ok_or_else(|| {
        CompilationError::invalid_operation(format!("Cannot get index of type '{target}'"), span)
    })
}

/// Type of an index expression, which must convert to int.
pub fn index_type(compiler: &ExprCompiler<'_, '_>, index: &Expr<'_>) -> Result<SemanticType> {
    let ty = compiler.type_of(index)?;
    match operand_kind(&ty) {
        Some(kind) if kind.is_integer() && kind != PrimitiveKind::Long => Ok(ty),
        _ => Err(CompilationError::type_mismatch(
            format!("Index must be an integer type (got '{ty}')"),
            index.span(),
        )),
    }
}

/// Emit an index converted to int.
pub fn emit_index(compiler: &mut ExprCompiler<'_, '_>, index: &Expr<'_>) -> Result<()> {
    let ty = index_type(compiler, index)?;
    compiler.infer(index)?;
    emit_operand_conversion(compiler.emitter(), &ty, PrimitiveKind::Int);
    Ok(())
}

fn indexed_type(compiler: &ExprCompiler<'_, '_>, index: &IndexExpr<'_>) -> Result<SemanticType> {
    let target = compiler.type_of(index.target)?;
    if target.is_nullable() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot use '[' to access members on a nullable type ('{target}')"),
            index.span,
        ));
    }
    Ok(target)
}

pub fn type_of_index(compiler: &ExprCompiler<'_, '_>, index: &IndexExpr<'_>) -> Result<SemanticType> {
    let target = indexed_type(compiler, index)?;
    element_of(&target, index.span)
}

pub fn compile_index(compiler: &mut ExprCompiler<'_, '_>, index: &IndexExpr<'_>) -> Result<SemanticType> {
    let target = indexed_type(compiler, index)?;
    element_of(&target, index.span)?;
    index_type(compiler, index.index)?;
    compiler.infer(index.target)?;
    compile_index_on(compiler, &target, index)
}

/// Index an array of type `target` already on the stack.
pub fn compile_index_on(
    compiler: &mut ExprCompiler<'_, '_>,
    target: &SemanticType,
    index: &IndexExpr<'_>,
) -> Result<SemanticType> {
    let element = element_of(target, index.span)?;
    emit_index(compiler, index.index)?;
    compiler.emitter().array_load(&element);
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{Fixture, static_context};
    use crate::scope::Scope;
    use bumpalo::Bump;
    use ixion_ast::AstBuilder;
    use ixion_registry::{HostClassDescriptor, HostRegistry};

    #[test]
    fn array_length_and_indexing() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("xs", SemanticType::array(SemanticType::LONG, 1), false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        assert_eq!(
            compiler.infer(&b.member(b.ident("xs"), "length")).unwrap(),
            SemanticType::INT
        );
        assert_eq!(
            compiler.infer(&b.index(b.ident("xs"), b.char('a'))).unwrap(),
            SemanticType::LONG
        );
        let err = compiler
            .infer(&b.index(b.ident("xs"), b.long(1)))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Index must be an integer type (got 'long')");

        ctx.emitter.method().assert_opcodes(&[
            Opcode::Aload,
            Opcode::Arraylength,
            Opcode::Aload,
            Opcode::Bipush,
            Opcode::Laload,
        ]);
    }

    #[test]
    fn static_fields_through_class_names() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("n", SemanticType::reference("java/lang/Integer"), false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        assert_eq!(
            compiler.infer(&b.member(b.ident("Integer"), "MAX_VALUE")).unwrap(),
            SemanticType::INT
        );
        let err = compiler
            .infer(&b.member(b.ident("n"), "MAX_VALUE"))
            .unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Cannot access static member from non-static object.");
        ctx.emitter.method().assert_opcodes(&[Opcode::Getstatic]);
    }

    #[test]
    fn getter_and_method_fallbacks() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("e", SemanticType::reference("java/lang/Throwable"), false, Span::default())
            .unwrap();
        ctx.scope
            .declare_local("s", SemanticType::string(), false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        let message = compiler.infer(&b.member(b.ident("e"), "message")).unwrap();
        assert_eq!(message, SemanticType::string());
        let length = compiler.infer(&b.member(b.ident("s"), "length")).unwrap();
        assert_eq!(length, SemanticType::INT);
        let err = compiler.infer(&b.member(b.ident("s"), "nope")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Could not resolve field 'nope' in class 'java.lang.String'"
        );
        ctx.emitter.method().assert_opcodes(&[
            Opcode::Aload,
            Opcode::Invokevirtual,
            Opcode::Aload,
            Opcode::Invokevirtual,
        ]);
    }

    #[test]
    fn private_fields_are_hidden_outside_their_class() {
        let mut registry = HostRegistry::with_prelude();
        registry.register(
            HostClassDescriptor::class("app/Point")
                .field("x", SemanticType::INT, Modifiers::PRIVATE)
                .field("y", SemanticType::INT, Modifiers::PUBLIC),
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
            .declare_local("p", SemanticType::reference("app/Point"), false, Span::default())
            .unwrap();

        let mut compiler = ExprCompiler::new(&mut ctx);
        assert_eq!(compiler.infer(&b.member(b.ident("p"), "y")).unwrap(), SemanticType::INT);
        assert!(matches!(
            compiler.infer(&b.member(b.ident("p"), "x")),
            Err(CompilationError::UnknownMember { .. })
        ));
        ctx.emitter
            .method()
            .assert_opcodes(&[Opcode::Aload, Opcode::Getfield]);
    }

    #[test]
    fn nullable_receivers_are_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("xs", SemanticType::array(SemanticType::INT, 1).as_nullable(), false, Span::default())
            .unwrap();
        let compiler = ExprCompiler::new(&mut ctx);
        let err = compiler.type_of(&b.index(b.ident("xs"), b.int(0))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Cannot use '[' to access members on a nullable type ('int[]?')"
        );
        assert!(compiler.type_of(&b.member(b.ident("xs"), "length")).is_err());
    }
}
