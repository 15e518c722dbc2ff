//! Type conversion system.
//!
//! This module decides whether a value of one type can flow into a slot of
//! another, what that costs for overload resolution, and which instructions
//! perform the conversion.
//!
//! ## Conversion Kinds
//!
//! Every legal implicit conversion is classified as one [`ConversionKind`];
//! the cost table lives in [`ConversionKind::cost`] and nowhere else.
//!
//! | Kind | Cost | Example |
//! |---|---|---|
//! | `Exact` | 0 | `int` → `int`, `int[]` → `int[]` |
//! | `NullToNullable` | 0 | `null` → `String?` |
//! | `ReferenceUpcast` | 1 | `String` → `Object` |
//! | `PrimitiveWidening` | 1 | `int` → `double` |
//! | `LambdaToFunctional` | 1 | `x -> x` → `Function1` |
//! | `IntegerRepresentable` | 2 | `int` → `char` |
//! | `Boxing` | 3 | `int` → `Object` (call arguments only) |
//!
//! Boxing is never part of plain assignability: declarations, returns and
//! assignments accept only the conversions [`classify`] returns.

use ixion_core::SemanticType;
use ixion_registry::HostTypeResolver;

use crate::emit::BytecodeEmitter;

mod boxing;
mod primitive;
mod reference;

pub use boxing::classify_with_boxing;
pub use primitive::classify_primitive;
pub use reference::classify_reference;

/// The kind of an implicit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    /// Identical types.
    Exact,
    /// `null` into a nullable reference or array.
    NullToNullable,
    /// Reference into a supertype.
    ReferenceUpcast,
    /// Primitive into a primitive of higher rank.
    PrimitiveWidening,
    /// Lambda literal into a functional interface parameter.
    LambdaToFunctional,
    /// Between single-slot integer kinds without a rank order.
    IntegerRepresentable,
    /// Primitive into its wrapper (or a supertype of it), or back.
    Boxing,
}

impl ConversionKind {
    /// Overload-resolution cost; lower is better.
    pub const fn cost(self) -> u32 {
        match self {
            ConversionKind::Exact | ConversionKind::NullToNullable => 0,
            ConversionKind::ReferenceUpcast
            | ConversionKind::PrimitiveWidening
            | ConversionKind::LambdaToFunctional => 1,
            ConversionKind::IntegerRepresentable => 2,
            ConversionKind::Boxing => 3,
        }
    }

    pub fn is_exact(self) -> bool {
        matches!(self, ConversionKind::Exact | ConversionKind::NullToNullable)
    }
}

/// Classify the implicit conversion of `source` into `target`.
///
/// Returns `None` when `source` is not assignable to `target`.
pub fn classify(
    resolver: &dyn HostTypeResolver,
    target: &SemanticType,
    source: &SemanticType,
) -> Option<ConversionKind> {
    if target == source {
        return Some(ConversionKind::Exact);
    }
    match (target, source) {
        (SemanticType::Primitive(to), SemanticType::Primitive(from)) => {
            classify_primitive(*to, *from)
        }
        (SemanticType::Method { .. }, _) | (_, SemanticType::Method { .. }) => None,
        _ => classify_reference(resolver, target, source),
    }
}

/// Whether `source` can flow into a slot of type `target`.
pub fn is_assignable_from(
    resolver: &dyn HostTypeResolver,
    target: &SemanticType,
    source: &SemanticType,
) -> bool {
    classify(resolver, target, source).is_some()
}

/// Cost of converting `source` into `target`, `None` if not assignable.
pub fn assign_changes_from(
    resolver: &dyn HostTypeResolver,
    target: &SemanticType,
    source: &SemanticType,
) -> Option<u32> {
    classify(resolver, target, source).map(ConversionKind::cost)
}

/// Check-and-convert: when `source` is assignable to `target`, emit the
/// conversion for the value on top of the stack and return `true`.
///
/// Nothing is emitted when the types are not assignable.
pub fn convert_if_assignable(
    resolver: &dyn HostTypeResolver,
    emitter: &mut BytecodeEmitter,
    target: &SemanticType,
    source: &SemanticType,
) -> bool {
    if !is_assignable_from(resolver, target, source) {
        return false;
    }
    emit_conversion(emitter, target, source);
    true
}

/// Emit the instructions turning a `source` value into a `target` value.
///
/// Primitive pairs go through the cast table; a primitive flowing into a
/// reference is boxed; a wrapper flowing into a primitive is unboxed and
/// then cast. Reference-to-reference conversions emit nothing.
pub fn emit_conversion(emitter: &mut BytecodeEmitter, target: &SemanticType, source: &SemanticType) {
    match (source.primitive(), target.primitive()) {
        (Some(from), Some(to)) => {
            emitter.cast_primitive(from, to);
        }
        (Some(from), None) if target.is_object_like() => emitter.box_primitive(from),
        (None, Some(to)) => {
            if let Some(kind) = source.unboxed_kind() {
                emitter.unbox(kind);
                emitter.cast_primitive(kind, to);
            }
        }
        _ => {}
    }
}
