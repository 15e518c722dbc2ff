//! Compiler passes.
//!
//! - [`preprocess`]: Pass 1 - collect every declared signature before any code is emitted
//! - [`compilation`]: Pass 2 - emit the unit class, declared classes and interfaces
//!
//! [`symbols`] holds what pass 1 produces and builds the scopes pass 2 runs in.

pub mod compilation;
pub mod preprocess;
pub mod symbols;

pub use compilation::CompilationPass;
pub use preprocess::{DeclaredClass, PreprocessPass, declared_classes, infer_pending, unit_class_name};
pub use symbols::{ClassSymbol, FunctionSymbol, UnitExports, UnitSymbols, VariableSymbol};

use ixion_ast::Param;
use ixion_core::{CompilationError, SemanticType};

use crate::context::EmissionContext;

/// Bind parameters to the first local slots of a method.
pub(crate) fn declare_params(
    ctx: &mut EmissionContext<'_>,
    params: &[Param<'_>],
    types: &[SemanticType],
) -> Result<(), CompilationError> {
    for (param, ty) in params.iter().zip(types) {
        ctx.scope
            .declare_local(param.name.name, ty.clone(), false, param.name.span)?;
    }
    Ok(())
}
