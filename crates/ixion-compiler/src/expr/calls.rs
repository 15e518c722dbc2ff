//! Calls: functions in scope, methods on objects and classes, constructors.
//!
//! Functions resolve against the scope's overload set. Methods and
//! constructors resolve against the host universe, where boxing is an
//! accepted (costly) conversion. Static and instance members are told
//! apart after ranking, so a call that only matches a member of the wrong
//! kind gets a specific message instead of "no overload".

use ixion_ast::{CallExpr, Expr, Ident, MethodCallExpr, NewExpr};
use ixion_core::{CompilationError, SemanticType, Span};
use ixion_registry::{HostClassDescriptor, HostMethod};
use tracing::debug;

use super::member::{Receiver, receiver_of};
use super::{ExprCompiler, Result};
use crate::bytecode::Opcode;
use crate::emit::BytecodeEmitter;
use crate::overload::{self, ArgInfo, Policy, no_applicable_overload, rank, render_arguments};
use crate::scope::{CallableCandidate, Dispatch};

// =============================================================================
// Method targets
// =============================================================================

/// A resolved host method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodTarget {
    /// Declaring class.
    pub owner: String,
    pub name: String,
    pub params: Vec<SemanticType>,
    pub return_type: SemanticType,
    pub is_static: bool,
    /// The declaring class is an interface.
    pub interface: bool,
}

impl MethodTarget {
    pub fn from_host(class: &HostClassDescriptor, method: &HostMethod) -> Self {
        Self {
            owner: class.name.clone(),
            name: method.name.clone(),
            params: method.params.clone(),
            return_type: method.return_type.clone(),
            is_static: method.is_static(),
            interface: class.is_interface(),
        }
    }

    pub fn descriptor(&self) -> String {
        SemanticType::method(self.params.clone(), self.return_type.clone()).descriptor()
    }

    /// Invoke with the receiver (if any) and arguments on the stack.
    pub fn emit_invoke(&self, emitter: &mut BytecodeEmitter) {
        let op = if self.is_static {
            Opcode::Invokestatic
        } else if self.interface {
            Opcode::Invokeinterface
        } else {
            Opcode::Invokevirtual
        };
        emitter.emit_invoke(op, &self.owner, &self.name, &self.descriptor(), self.interface);
    }
}

/// Static types of call arguments, lambdas marked.
pub fn argument_infos(compiler: &ExprCompiler<'_, '_>, args: &[Expr<'_>]) -> Result<Vec<ArgInfo>> {
    args.iter()
        .map(|arg| {
            let ty = compiler.type_of(arg)?;
            Ok(if arg.is_lambda() { ArgInfo::lambda(ty) } else { ArgInfo::new(ty) })
        })
        .collect()
}

/// Emit each argument converted to its parameter.
pub fn emit_arguments(compiler: &mut ExprCompiler<'_, '_>, args: &[Expr<'_>], params: &[SemanticType]) -> Result<()> {
    for (arg, param) in args.iter().zip(params) {
        compiler.check_argument(arg, param)?;
    }
    Ok(())
}

// =============================================================================
// Functions in scope
// =============================================================================

fn resolve_function(compiler: &ExprCompiler<'_, '_>, call: &CallExpr<'_>) -> Result<CallableCandidate> {
    let candidates = compiler.ctx().scope.lookup_functions(call.name.name);
    let args = argument_infos(compiler, call.args)?;
    // Host functions brought into scope keep host conversion rules.
    let policy = if candidates
        .iter()
        .any(|c| matches!(c.dispatch, Dispatch::HostLibraryBound { .. }))
    {
        Policy::HOST
    } else {
        Policy::SCOPE
    };
    let ranked = overload::resolve(compiler.resolver(), call.name.name, candidates, &args, policy, call.span)?;
    Ok(ranked.candidate.clone())
}

pub fn type_of_call(compiler: &ExprCompiler<'_, '_>, call: &CallExpr<'_>) -> Result<SemanticType> {
    resolve_function(compiler, call).map(|c| c.return_type().clone())
}

pub fn compile_call(compiler: &mut ExprCompiler<'_, '_>, call: &CallExpr<'_>) -> Result<SemanticType> {
    let candidate = resolve_function(compiler, call)?;
    let descriptor = candidate.descriptor();
    match &candidate.dispatch {
        Dispatch::Static => {
            emit_arguments(compiler, call.args, candidate.params())?;
            compiler
                .emitter()
                .emit_invoke(Opcode::Invokestatic, &candidate.owner, &candidate.name, &descriptor, false);
        }
        Dispatch::Instance => {
            if compiler.ctx().is_static {
                return Err(CompilationError::illegal_control_flow(
                    format!("Cannot invoke instance method '{}' from static context.", candidate.name),
                    call.name.span,
                ));
            }
            compiler.emitter().load(&SemanticType::object(), 0);
            emit_arguments(compiler, call.args, candidate.params())?;
            compiler
                .emitter()
                .emit_invoke(Opcode::Invokevirtual, &candidate.owner, &candidate.name, &descriptor, false);
        }
        Dispatch::HostLibraryBound { receiver } => {
            let receiver_ty = SemanticType::from_descriptor(&receiver.descriptor).ok_or_else(|| {
                CompilationError::internal(
                    format!("bad receiver descriptor '{}'", receiver.descriptor),
                    call.span,
                )
            })?;
            compiler
                .emitter()
                .emit_field(Opcode::Getstatic, &receiver.owner, &receiver.name, &receiver_ty);
            emit_arguments(compiler, call.args, candidate.params())?;
            compiler
                .emitter()
                .emit_invoke(Opcode::Invokevirtual, &candidate.owner, &candidate.name, &descriptor, false);
        }
    }
    Ok(candidate.return_type().clone())
}

// =============================================================================
// Methods
// =============================================================================

/// Resolve `name(args)` on `owner_ty`.
///
/// # Arguments
///
/// * `owner_ty` - Type of the receiver, or the class for static access
/// * `static_access` - The receiver names a class
///
/// # Returns
///
/// The cheapest method whose static-ness matches the access.
pub fn resolve_method(
    compiler: &ExprCompiler<'_, '_>,
    owner_ty: &SemanticType,
    name: &Ident<'_>,
    args: &[Expr<'_>],
    static_access: bool,
    span: Span,
) -> Result<MethodTarget> {
    let owner = match owner_ty {
        SemanticType::Reference { name, .. } => name.as_str(),
        SemanticType::Array { .. } => ixion_core::OBJECT_CLASS,
        other => {
            return Err(CompilationError::invalid_operation(
                format!("Cannot invoke method on type '{other}'"),
                span,
            ));
        }
    };
    let resolver = compiler.resolver();
    let current = compiler.ctx().owner.name.as_str();
    let found: Vec<(&HostClassDescriptor, &HostMethod)> = resolver
        .find_methods(owner, name.name)
        .map_err(|e| e.at(span))?
        .into_iter()
        .filter(|(class, method)| !method.modifiers.is_private() || class.name == current)
        .collect();

    let args = argument_infos(compiler, args)?;
    let ranked = rank(resolver, &found, &args, Policy::HOST);
    if ranked.is_empty() {
        debug!(callee = name.name, owner, arguments = %render_arguments(&args), "no applicable method");
        return Err(no_applicable_overload(name.name, &args, span));
    }
    let Some(best) = ranked
        .iter()
        .find(|r| r.candidate.1.is_static() == static_access)
    else {
        let message = if static_access {
            "Cannot invoke non-static method from static class."
        } else {
            "Cannot invoke static method from non-static object."
        };
        return Err(CompilationError::invalid_operation(message, span));
    };
    let (class, method) = *best.candidate;
    debug!(callee = name.name, owner = %class.name, cost = best.cost, "resolved method");
    Ok(MethodTarget::from_host(class, method))
}

pub fn type_of_method_call(compiler: &ExprCompiler<'_, '_>, call: &MethodCallExpr<'_>) -> Result<SemanticType> {
    let target = match receiver_of(compiler, call.receiver)? {
        Receiver::Class(class) => resolve_method(
            compiler,
            &SemanticType::reference(&class),
            &call.name,
            call.args,
            true,
            call.span,
        )?,
        Receiver::Super(superclass) => resolve_method(
            compiler,
            &SemanticType::reference(&superclass),
            &call.name,
            call.args,
            false,
            call.span,
        )?,
        Receiver::Value(ty) => {
            require_non_nullable(&ty, call.span)?;
            resolve_method(compiler, &ty, &call.name, call.args, false, call.span)?
        }
    };
    Ok(target.return_type)
}

pub fn compile_method_call(compiler: &mut ExprCompiler<'_, '_>, call: &MethodCallExpr<'_>) -> Result<SemanticType> {
    match receiver_of(compiler, call.receiver)? {
        Receiver::Class(class) => {
            let target = resolve_method(
                compiler,
                &SemanticType::reference(&class),
                &call.name,
                call.args,
                true,
                call.span,
            )?;
            emit_arguments(compiler, call.args, &target.params)?;
            target.emit_invoke(compiler.emitter());
            Ok(target.return_type)
        }
        Receiver::Super(superclass) => {
            let target = resolve_method(
                compiler,
                &SemanticType::reference(&superclass),
                &call.name,
                call.args,
                false,
                call.span,
            )?;
            compiler.emitter().load(&SemanticType::object(), 0);
            emit_arguments(compiler, call.args, &target.params)?;
            compiler.emitter().emit_invoke(
                Opcode::Invokespecial,
                &target.owner,
                &target.name,
                &target.descriptor(),
                target.interface,
            );
            Ok(target.return_type)
        }
        Receiver::Value(ty) => {
            require_non_nullable(&ty, call.span)?;
            compiler.infer(call.receiver)?;
            compile_method_on(compiler, &ty, call)
        }
    }
}

/// Call `call.name` on a receiver of type `receiver` already on the stack.
pub fn compile_method_on(
    compiler: &mut ExprCompiler<'_, '_>,
    receiver: &SemanticType,
    call: &MethodCallExpr<'_>,
) -> Result<SemanticType> {
    let target = resolve_method(compiler, receiver, &call.name, call.args, false, call.span)?;
    emit_arguments(compiler, call.args, &target.params)?;
    target.emit_invoke(compiler.emitter());
    Ok(target.return_type)
}

fn require_non_nullable(ty: &SemanticType, span: Span) -> Result<()> {
    if ty.is_nullable() {
        return Err(CompilationError::invalid_operation(
            format!("Cannot use '.' to call methods on a nullable type ('{ty}')"),
            span,
        ));
    }
    Ok(())
}

// =============================================================================
// Construction
// =============================================================================

pub fn type_of_new(compiler: &ExprCompiler<'_, '_>, new: &NewExpr<'_>) -> Result<SemanticType> {
    let ty = compiler.ctx().resolve_type(&new.ty)?;
    match ty {
        SemanticType::Reference { .. } => Ok(ty.as_non_nullable()),
        other => Err(CompilationError::invalid_operation(
            format!("Cannot create new instance of primitive type ({other})"),
            new.span,
        )),
    }
}

pub fn compile_new(compiler: &mut ExprCompiler<'_, '_>, new: &NewExpr<'_>) -> Result<SemanticType> {
    let ty = type_of_new(compiler, new)?;
    let name = ty.internal_name();
    let resolver = compiler.resolver();
    let class = resolver
        .resolve_host_class(&name)
        .map_err(|e| e.at(new.span))?;
    if class.is_interface() || class.modifiers.is_abstract() {
        return Err(CompilationError::invalid_operation(
            format!("Class '{ty}' cannot be instantiated."),
            new.span,
        ));
    }
    let current = compiler.ctx().owner.name.clone();
    let constructors: Vec<_> = class
        .constructors
        .iter()
        .filter(|c| !c.modifiers.is_private() || class.name == current)
        .collect();
    let args = argument_infos(compiler, new.args)?;
    let ranked = rank(resolver, &constructors, &args, Policy::HOST);
    let Some(best) = ranked.first() else {
        return Err(CompilationError::invalid_operation(
            format!(
                "Class '{ty}' cannot be instantiated with arguments: {}",
                render_arguments(&args)
            ),
            new.span,
        ));
    };
    let constructor = *best.candidate;
    debug!(class = %name, cost = best.cost, "resolved constructor");

    let emitter = compiler.emitter();
    emitter.emit_type(Opcode::New, name.clone());
    emitter.emit(Opcode::Dup);
    emit_arguments(compiler, new.args, &constructor.params)?;
    compiler
        .emitter()
        .emit_invoke(Opcode::Invokespecial, &name, "<init>", &constructor.descriptor(), false);
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
    use ixion_core::{Modifiers, Span};
    use ixion_registry::HostTypeResolver;

    fn invoked(instructions: &[Instruction]) -> Vec<(Opcode, String)> {
        instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::MethodInsn(op, m, _) => Some((*op, format!("{}.{}{}", m.owner, m.name, m.descriptor))),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn scope_function_picks_cheapest_overload() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let mut root = Scope::new();
        for param in [SemanticType::LONG, SemanticType::INT] {
            root.add_function(CallableCandidate::new(
                "f",
                "mainixc",
                vec![param],
                SemanticType::VOID,
                Dispatch::Static,
            ))
            .unwrap();
        }
        let mut ctx = static_context(&env, &root);
        ExprCompiler::new(&mut ctx)
            .infer(&b.call("f", &[b.int(3)]))
            .unwrap();
        let method = ctx.finish().method;
        assert_eq!(
            invoked(&method.instructions),
            vec![(Opcode::Invokestatic, "mainixc.f(I)V".to_string())]
        );
    }

    #[test]
    fn host_bound_function_loads_receiver_first() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let mut root = Scope::new();
        let receiver = crate::bytecode::MemberRef::new("java/lang/System", "out", "Ljava/io/PrintStream;");
        for descriptor in ["(I)V", "(D)V"] {
            let ty = SemanticType::from_descriptor(descriptor).unwrap();
            let (params, ret) = ty.method_parts().unwrap();
            root.add_function(CallableCandidate::new(
                "print",
                "java/io/PrintStream",
                params.to_vec(),
                ret.clone(),
                Dispatch::HostLibraryBound {
                    receiver: receiver.clone(),
                },
            ))
            .unwrap();
        }
        let mut ctx = static_context(&env, &root);
        let expr = b.call(
            "print",
            &[b.binary(b.int(1), ixion_ast::BinaryOp::Add, b.double(2.0))],
        );
        ExprCompiler::new(&mut ctx).infer(&expr).unwrap();
        let method = ctx.finish().method;
        method.assert_opcodes(&[
            Opcode::Getstatic,
            Opcode::Iconst1,
            Opcode::I2d,
            Opcode::Ldc,
            Opcode::Dadd,
            Opcode::Invokevirtual,
        ]);
        assert_eq!(
            invoked(&method.instructions),
            vec![(Opcode::Invokevirtual, "java/io/PrintStream.print(D)V".to_string())]
        );
    }

    #[test]
    fn static_and_instance_method_access() {
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
        let parse = b.method_call(b.ident("Integer"), "parseInt", &[b.ident("s")]);
        assert_eq!(compiler.infer(&parse).unwrap(), SemanticType::INT);
        let length = b.method_call(b.ident("s"), "length", &[]);
        assert_eq!(compiler.infer(&length).unwrap(), SemanticType::INT);

        let wrong_static = b.method_call(b.ident("s"), "valueOf", &[b.int(1)]);
        let err = compiler.infer(&wrong_static).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Cannot invoke static method from non-static object."
        );
        let wrong_instance = b.method_call(b.ident("String"), "length", &[]);
        let err = compiler.infer(&wrong_instance).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Cannot invoke non-static method from static class."
        );

        let method = ctx.finish().method;
        let calls = invoked(&method.instructions);
        assert_eq!(calls[0], (Opcode::Invokestatic, "java/lang/Integer.parseInt(Ljava/lang/String;)I".to_string()));
        assert_eq!(calls[1], (Opcode::Invokevirtual, "java/lang/String.length()I".to_string()));
    }

    #[test]
    fn host_methods_accept_boxing() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("s", SemanticType::string(), false, Span::default())
            .unwrap();

        let call = b.method_call(b.ident("s"), "equals", &[b.int(4)]);
        assert_eq!(ExprCompiler::new(&mut ctx).infer(&call).unwrap(), SemanticType::BOOLEAN);
        ctx.emitter
            .method()
            .assert_opcodes(&[Opcode::Aload, Opcode::Iconst4, Opcode::Invokestatic, Opcode::Invokevirtual]);
    }

    #[test]
    fn nullable_receiver_needs_null_safe_call() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        ctx.scope
            .declare_local("s", SemanticType::string().as_nullable(), false, Span::default())
            .unwrap();
        let err = ExprCompiler::new(&mut ctx)
            .infer(&b.method_call(b.ident("s"), "length", &[]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 1:1: Cannot use '.' to call methods on a nullable type ('java.lang.String?')"
        );
    }

    #[test]
    fn constructors_resolve_by_arguments() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);

        let mut compiler = ExprCompiler::new(&mut ctx);
        let ty = compiler
            .infer(&b.new_object(b.ty("String"), &[b.str("x")]))
            .unwrap();
        assert_eq!(ty, SemanticType::string());
        let err = compiler
            .infer(&b.new_object(b.ty("String"), &[b.int(1), b.int(2)]))
            .unwrap_err();
        assert!(err.to_string().contains("cannot be instantiated with arguments: int, int"));

        let method = ctx.finish().method;
        method.assert_opcodes(&[Opcode::New, Opcode::Dup, Opcode::Ldc, Opcode::Invokespecial]);
        assert_eq!(
            invoked(&method.instructions),
            vec![(Opcode::Invokespecial, "java/lang/String.<init>(Ljava/lang/String;)V".to_string())]
        );
    }

    #[test]
    fn abstract_classes_cannot_be_instantiated() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fixture = Fixture::new();
        let env = fixture.env();
        let root = Scope::new();
        let mut ctx = static_context(&env, &root);
        assert!(
            fixture
                .registry
                .resolve_host_class("java/lang/Number")
                .unwrap()
                .modifiers
                .contains(Modifiers::ABSTRACT)
        );
        let err = ExprCompiler::new(&mut ctx)
            .infer(&b.new_object(b.ty("java.lang.Number"), &[]))
            .unwrap_err();
        assert!(matches!(err, CompilationError::InvalidOperation { .. }));
    }
}
