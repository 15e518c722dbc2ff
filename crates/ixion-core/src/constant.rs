//! Compile-time constant values.
//!
//! Constants appear as literal operands, as folded results, and as `ldc`
//! payloads. Floats are wrapped in [`OrderedFloat`] so instructions holding a
//! constant stay `Eq + Hash`.

use std::fmt;

use ordered_float::OrderedFloat;

use crate::{PrimitiveKind, SemanticType};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    Bool(bool),
    /// UTF-16 code unit.
    Char(u16),
    String(String),
    Null,
}

impl ConstValue {
    /// False for a lone surrogate `char`, which has no exact text form.
    pub fn has_exact_text(&self) -> bool {
        !matches!(self, ConstValue::Char(0xD800..=0xDFFF))
    }

    pub fn double(value: f64) -> Self {
        ConstValue::Double(OrderedFloat(value))
    }

    pub fn float(value: f32) -> Self {
        ConstValue::Float(OrderedFloat(value))
    }

    /// Static type of the constant.
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            ConstValue::Int(_) => SemanticType::INT,
            ConstValue::Long(_) => SemanticType::LONG,
            ConstValue::Float(_) => SemanticType::FLOAT,
            ConstValue::Double(_) => SemanticType::DOUBLE,
            ConstValue::Bool(_) => SemanticType::BOOLEAN,
            ConstValue::Char(_) => SemanticType::CHAR,
            ConstValue::String(_) => SemanticType::string(),
            ConstValue::Null => SemanticType::Null,
        }
    }

    pub fn kind(&self) -> Option<PrimitiveKind> {
        self.semantic_type().primitive()
    }

    /// Numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            ConstValue::Int(v) => f64::from(*v),
            ConstValue::Long(v) => *v as f64,
            ConstValue::Float(v) => f64::from(v.0),
            ConstValue::Double(v) => v.0,
            ConstValue::Char(v) => f64::from(*v),
            _ => return None,
        })
    }

    /// Value of an int-represented constant.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ConstValue::Int(v) => Some(*v),
            ConstValue::Char(v) => Some(i32::from(*v)),
            ConstValue::Bool(v) => Some(i32::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the value the way the runtime's string conversion does, so a
/// folded concatenation matches the unfolded one.
impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Long(v) => write!(f, "{v}"),
            ConstValue::Float(v) => f.write_str(&format_floating(f64::from(v.0), v.0.to_string())),
            ConstValue::Double(v) => f.write_str(&format_floating(v.0, v.0.to_string())),
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Char(v) => {
                let c = char::from_u32(u32::from(*v)).unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(f, "{c}")
            }
            ConstValue::String(s) => f.write_str(s),
            ConstValue::Null => f.write_str("null"),
        }
    }
}

/// `shortest` is the shortest round-trip rendering of the value at its own
/// precision.
fn format_floating(value: f64, shortest: String) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if value == 0.0 || (1e-3..1e7).contains(&magnitude) {
        if shortest.contains('.') {
            shortest
        } else {
            format!("{shortest}.0")
        }
    } else {
        let scientific = format!("{:e}", shortest.parse::<f64>().unwrap_or(value));
        match scientific.split_once('e') {
            Some((mantissa, exponent)) if mantissa.contains('.') => format!("{mantissa}E{exponent}"),
            Some((mantissa, exponent)) => format!("{mantissa}.0E{exponent}"),
            None => scientific,
        }
    }
}
