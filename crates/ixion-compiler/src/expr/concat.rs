//! String concatenation through `invokedynamic makeConcatWithConstants`.
//!
//! A left-leaning chain of `+` whose left side stays `String`-typed is
//! flattened into one call site. The recipe string holds `\u{1}` for each
//! dynamic argument; with `CONSTANT_STRING_CONCAT` enabled, constant
//! operands are written into the recipe instead of being pushed, unless
//! their text contains a recipe tag character or they are a lone surrogate.

use ixion_ast::{BinaryExpr, BinaryOp, Expr};
use ixion_core::{CompilationError, SemanticType};

use super::{ExprCompiler, Result};
use crate::bytecode::{BootstrapArg, DynamicCall, MemberRef, MethodHandle};
use crate::emit::BytecodeEmitter;
use crate::options::OptimizationFlags;

const ARGUMENT_TAG: char = '\u{1}';
const CONSTANT_TAG: char = '\u{2}';

const CONCAT_FACTORY: &str = "java/lang/invoke/StringConcatFactory";
const CONCAT_BOOTSTRAP: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/invoke/CallSite;";

/// Compile a concatenation chain rooted at `bin`.
pub fn compile_concat(compiler: &mut ExprCompiler<'_, '_>, bin: &BinaryExpr<'_>) -> Result<()> {
    let mut operands = Vec::new();
    flatten(compiler, bin, &mut operands)?;

    let fold = compiler
        .ctx()
        .optimizes(OptimizationFlags::CONSTANT_STRING_CONCAT);
    let mut recipe = String::new();
    let mut arguments = Vec::new();
    for operand in operands {
        if fold
            && let Some(value) = compiler.constant_value(operand)
            && value.has_exact_text()
        {
            let text = value.to_string();
            if !text.contains([ARGUMENT_TAG, CONSTANT_TAG]) {
                recipe.push_str(&text);
                continue;
            }
        }
        let ty = compiler.infer(operand)?;
        if ty.is_void() {
            return Err(CompilationError::invalid_operation(
                "Cannot concatenate a value of type 'void'.",
                operand.span(),
            ));
        }
        recipe.push(ARGUMENT_TAG);
        arguments.push(ty);
    }
    emit_concat_call(compiler.emitter(), recipe, &arguments);
    Ok(())
}

/// Operands of the chain, leftmost first.
fn flatten<'ast>(
    compiler: &ExprCompiler<'_, '_>,
    bin: &BinaryExpr<'ast>,
    out: &mut Vec<&'ast Expr<'ast>>,
) -> Result<()> {
    match *bin.left {
        Expr::Binary(left) if left.op == BinaryOp::Add && compiler.type_of(bin.left)?.is_string() => {
            flatten(compiler, left, out)?;
        }
        _ => out.push(bin.left),
    }
    out.push(bin.right);
    Ok(())
}

/// Emit the call site for `arguments` already on the stack.
pub fn emit_concat_call(emitter: &mut BytecodeEmitter, recipe: String, arguments: &[SemanticType]) {
    let mut descriptor = String::from("(");
    for argument in arguments {
        descriptor.push_str(&argument.descriptor());
    }
    descriptor.push_str(")Ljava/lang/String;");
    emitter.emit_dynamic(DynamicCall {
        name: "makeConcatWithConstants".to_string(),
        descriptor,
        bootstrap: MethodHandle {
            target: MemberRef::new(CONCAT_FACTORY, "makeConcatWithConstants", CONCAT_BOOTSTRAP),
            interface: false,
        },
        bootstrap_args: vec![BootstrapArg::String(recipe)],
    });
}
