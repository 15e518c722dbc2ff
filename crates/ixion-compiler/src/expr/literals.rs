//! Literal expression compilation.

use ixion_ast::LiteralKind;
use ixion_core::{ConstValue, SemanticType};

use super::{ExprCompiler, Result};

/// Compile a literal expression.
pub fn compile_literal(compiler: &mut ExprCompiler<'_, '_>, kind: &LiteralKind<'_>) -> Result<SemanticType> {
    let value = literal_value(kind);
    compiler.emitter().push_const(&value);
    Ok(value.semantic_type())
}

pub fn literal_type(kind: &LiteralKind<'_>) -> SemanticType {
    literal_value(kind).semantic_type()
}

pub fn literal_value(kind: &LiteralKind<'_>) -> ConstValue {
    match kind {
        LiteralKind::Int(v) => ConstValue::Int(*v),
        LiteralKind::Long(v) => ConstValue::Long(*v),
        LiteralKind::Float(v) => ConstValue::float(*v),
        LiteralKind::Double(v) => ConstValue::double(*v),
        LiteralKind::Bool(v) => ConstValue::Bool(*v),
        LiteralKind::Char(v) => ConstValue::Char(*v),
        LiteralKind::String(s) => ConstValue::String((*s).to_string()),
        LiteralKind::Null => ConstValue::Null,
    }
}
