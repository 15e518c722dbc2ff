//! Lambda literals.
//!
//! Each lambda body becomes a private static synthetic method `lambda$N` of
//! the class being compiled. The literal itself is an `invokedynamic` call
//! site bootstrapped by `LambdaMetafactory.metafactory`, which produces an
//! instance of the target functional interface.
//!
//! Lambdas do not capture: their body is compiled against the enclosing
//! class scope, not the method scope the literal appears in.

use ixion_ast::{LambdaBody, LambdaExpr};
use ixion_core::{CompilationError, Modifiers, SemanticType};
use ixion_registry::{MAX_FUNCTION_ARITY, function_interface};
use tracing::debug;

use super::{ExprCompiler, Result};
use crate::bytecode::{BootstrapArg, DynamicCall, MemberRef, MethodBuilder, MethodHandle, Opcode};
use crate::context::MethodState;
use crate::conversion::{classify_with_boxing, emit_conversion};
use crate::emit::BytecodeEmitter;
use crate::stmt;

const METAFACTORY_OWNER: &str = "java/lang/invoke/LambdaMetafactory";
const METAFACTORY_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;\
Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;\
Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";

/// Interface a lambda implements when nothing else is expected of it.
pub fn default_interface(lambda: &LambdaExpr<'_>) -> Result<SemanticType> {
    let arity = lambda.params.len();
    if arity > MAX_FUNCTION_ARITY {
        return Err(CompilationError::invalid_operation(
            format!("Lambdas may take at most {MAX_FUNCTION_ARITY} parameters (got {arity})"),
            lambda.span,
        ));
    }
    Ok(SemanticType::reference(&function_interface(arity)))
}

/// Compile a lambda literal.
///
/// # Arguments
///
/// * `lambda` - The literal
/// * `target` - Functional interface the context expects, if any
///
/// # Returns
///
/// The interface type of the produced instance.
pub fn compile_lambda(
    compiler: &mut ExprCompiler<'_, '_>,
    lambda: &LambdaExpr<'_>,
    target: Option<&SemanticType>,
) -> Result<SemanticType> {
    let interface = match target {
        Some(ty) => ty.as_non_nullable(),
        None => default_interface(lambda)?,
    };
    let interface_name = interface.internal_name();
    let Some(sam) = compiler.resolver().functional_method(&interface_name) else {
        return Err(CompilationError::type_mismatch(
            format!("'{interface}' is not a functional interface"),
            lambda.span,
        ));
    };
    if sam.params.len() != lambda.params.len() {
        return Err(CompilationError::type_mismatch(
            format!(
                "Lambda takes {} parameters but '{interface}' expects {}",
                lambda.params.len(),
                sam.params.len()
            ),
            lambda.span,
        ));
    }
    let sam_descriptor = SemanticType::method(sam.params.clone(), sam.return_type.clone()).descriptor();
    let sam_name = sam.name.clone();
    let return_type = sam.return_type.clone();

    let mut params = Vec::with_capacity(lambda.params.len());
    for (param, sam_param) in lambda.params.iter().zip(&sam.params) {
        let ty = match &param.ty {
            Some(ty) => compiler.ctx().resolve_type(ty)?,
            None => sam_param.clone(),
        };
        params.push(ty);
    }
    let descriptor = SemanticType::method(params.clone(), return_type.clone()).descriptor();

    let name = compiler.ctx_mut().reserve_lambda();
    debug!(%name, interface = %interface_name, "compiling lambda");

    let ctx = compiler.ctx();
    let mut scope = ctx.class_scope.for_method(return_type.clone(), 0);
    for (param, ty) in lambda.params.iter().zip(&params) {
        scope.declare_local(param.name.name, ty.clone(), false, param.name.span)?;
    }
    let builder = MethodBuilder::new(
        name.as_str(),
        descriptor.as_str(),
        Modifiers::PRIVATE | Modifiers::STATIC | Modifiers::SYNTHETIC,
    );
    let emitter = BytecodeEmitter::new(builder, ctx.env.options.emit_line_numbers);
    let outer = compiler
        .ctx_mut()
        .swap_method(MethodState::new(scope, emitter, true));

    let body = compile_body(compiler, lambda, &name, &return_type);
    let inner = compiler.ctx_mut().swap_method(outer);
    body?;
    compiler.ctx_mut().push_lambda(inner.emitter.finish());

    let owner = compiler.ctx().owner.name.clone();
    compiler.emitter().emit_dynamic(DynamicCall {
        name: sam_name,
        descriptor: format!("(){}", interface.descriptor()),
        bootstrap: MethodHandle {
            target: MemberRef::new(METAFACTORY_OWNER, "metafactory", METAFACTORY_DESCRIPTOR),
            interface: false,
        },
        bootstrap_args: vec![
            BootstrapArg::MethodType(sam_descriptor),
            BootstrapArg::Handle(MethodHandle {
                target: MemberRef::new(owner, name, descriptor.as_str()),
                interface: false,
            }),
            BootstrapArg::MethodType(descriptor),
        ],
    });
    Ok(interface)
}

/// Emit the body of the synthetic method currently swapped in.
fn compile_body(
    compiler: &mut ExprCompiler<'_, '_>,
    lambda: &LambdaExpr<'_>,
    name: &str,
    return_type: &SemanticType,
) -> Result<()> {
    match lambda.body {
        LambdaBody::Block(block) => stmt::compile_body(compiler.ctx_mut(), &block, name, lambda.span),
        LambdaBody::Expr(expr) if return_type.is_void() => {
            compiler.discard(expr)?;
            compiler.emitter().emit(Opcode::Return);
            Ok(())
        }
        LambdaBody::Expr(expr) => {
            let actual = compiler.infer(expr)?;
            if actual.is_void() {
                return Err(CompilationError::type_mismatch("Cannot return void value", expr.span()));
            }
            if classify_with_boxing(compiler.resolver(), return_type, &actual).is_none() {
                return Err(CompilationError::type_mismatch(
                    format!("Cannot return type '{actual}' from function expecting '{return_type}'"),
                    expr.span(),
                ));
            }
            let emitter = compiler.emitter();
            emit_conversion(emitter, return_type, &actual);
            emitter.return_value(return_type);
            Ok(())
        }
    }
}
