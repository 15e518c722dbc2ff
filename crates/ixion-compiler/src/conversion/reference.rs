//! Reference, array, and `null` conversions.

use ixion_core::{OBJECT_CLASS, SemanticType};
use ixion_registry::HostTypeResolver;

use super::ConversionKind;

/// Classify a conversion where at least one side is not a primitive.
///
/// - `null` flows into any nullable reference or array.
/// - A nullable source never flows into a non-nullable target.
/// - References need the target class among the source's supertypes.
/// - Arrays need equal dimensions and equal element types, where a nullable
///   target element also accepts the non-nullable variant.
/// - Any array flows into `Object`.
pub fn classify_reference(
    resolver: &dyn HostTypeResolver,
    target: &SemanticType,
    source: &SemanticType,
) -> Option<ConversionKind> {
    if source.is_null() {
        return (target.is_object_like() && target.is_nullable())
            .then_some(ConversionKind::NullToNullable);
    }
    if source.is_nullable() && !target.is_nullable() {
        return None;
    }
    match (target, source) {
        (
            SemanticType::Reference { name: to, .. },
            SemanticType::Reference { name: from, .. },
        ) => {
            if to == from {
                Some(ConversionKind::Exact)
            } else if resolver.is_subclass(from, to) {
                Some(ConversionKind::ReferenceUpcast)
            } else {
                None
            }
        }
        (SemanticType::Reference { name, .. }, SemanticType::Array { .. }) => {
            (name == OBJECT_CLASS).then_some(ConversionKind::ReferenceUpcast)
        }
        (SemanticType::Array { .. }, SemanticType::Array { .. }) => {
            let (Some(to), Some(from)) = (target.element_type(), source.element_type()) else {
                return None;
            };
            let matches = if to.is_nullable() {
                to == from.as_nullable()
            } else {
                to == from
            };
            matches.then_some(ConversionKind::Exact)
        }
        _ => None,
    }
}
