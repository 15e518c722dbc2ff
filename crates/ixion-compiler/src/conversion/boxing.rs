//! Boxing conversions for call arguments.

use ixion_core::{PrimitiveKind, SemanticType};
use ixion_registry::HostTypeResolver;

use super::{ConversionKind, classify, classify_primitive};

/// Like [`classify`], additionally accepting a primitive flowing into a
/// reference its wrapper is assignable to, and a non-nullable wrapper flowing
/// into a primitive that accepts its kind.
pub fn classify_with_boxing(
    resolver: &dyn HostTypeResolver,
    target: &SemanticType,
    source: &SemanticType,
) -> Option<ConversionKind> {
    if let Some(kind) = classify(resolver, target, source) {
        return Some(kind);
    }
    match (target.primitive(), source.primitive()) {
        (None, Some(from)) if from != PrimitiveKind::Void && target.is_object_like() => {
            let wrapper = source.autobox_wrapper();
            classify(resolver, target, &wrapper).map(|_| ConversionKind::Boxing)
        }
        (Some(to), None) if !source.is_nullable() => {
            let from = source.unboxed_kind()?;
            classify_primitive(to, from).map(|_| ConversionKind::Boxing)
        }
        _ => None,
    }
}
