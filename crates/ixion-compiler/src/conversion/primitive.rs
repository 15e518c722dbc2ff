//! Primitive-to-primitive conversions.

use ixion_core::PrimitiveKind;

use super::ConversionKind;

/// Classify `from` flowing into `to`.
///
/// Rank order wins first (`int` → `long` is a widening); single-slot integer
/// kinds convert among each other regardless of rank. `void` converts to
/// nothing but itself.
pub fn classify_primitive(to: PrimitiveKind, from: PrimitiveKind) -> Option<ConversionKind> {
    if to == from {
        return Some(ConversionKind::Exact);
    }
    if to == PrimitiveKind::Void || from == PrimitiveKind::Void {
        return None;
    }
    match (to.rank(), from.rank()) {
        (Some(target), Some(source)) if target >= source => Some(ConversionKind::PrimitiveWidening),
        _ if to.is_integer_representable() && from.is_integer_representable() => {
            Some(ConversionKind::IntegerRepresentable)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PrimitiveKind::*;

    #[test]
    fn widening_by_rank() {
        assert_eq!(classify_primitive(Long, Int), Some(ConversionKind::PrimitiveWidening));
        assert_eq!(classify_primitive(Double, Long), Some(ConversionKind::PrimitiveWidening));
        assert_eq!(classify_primitive(Int, Byte), Some(ConversionKind::PrimitiveWidening));
    }

    #[test]
    fn integer_representable_kinds_mix() {
        assert_eq!(classify_primitive(Char, Int), Some(ConversionKind::IntegerRepresentable));
        assert_eq!(classify_primitive(Int, Boolean), Some(ConversionKind::IntegerRepresentable));
        assert_eq!(classify_primitive(Byte, Short), Some(ConversionKind::IntegerRepresentable));
    }

    #[test]
    fn narrowing_wide_kinds_is_rejected() {
        assert_eq!(classify_primitive(Int, Long), None);
        assert_eq!(classify_primitive(Float, Double), None);
        assert_eq!(classify_primitive(Boolean, Double), None);
        assert_eq!(classify_primitive(Void, Int), None);
    }
}
