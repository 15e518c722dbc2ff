//! Semantic types of the Ixion language.
//!
//! [`SemanticType`] is an immutable value: it is built while resolving type
//! annotations and compared structurally. Reference names are kept in
//! internal form (`java/lang/String`).
//!
//! ## Widening lattice
//!
//! Numeric primitives are totally ordered by [`PrimitiveKind::rank`]:
//!
//! ```text
//! byte < char < short < int < long < float < double
//! ```
//!
//! `boolean` and `void` have no rank. `boolean` still converts to and from the
//! other int-represented kinds (`byte`, `char`, `short`, `int`) because they
//! share one stack representation.

use std::fmt;

pub const OBJECT_CLASS: &str = "java/lang/Object";
pub const STRING_CLASS: &str = "java/lang/String";

// ============================================================================
// PrimitiveKind
// ============================================================================

/// The primitive kinds, including `void`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveKind {
    /// Every kind that takes part in widening, smallest first.
    pub const NUMERIC: [PrimitiveKind; 7] = [
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Position in the widening lattice, `None` for `boolean` and `void`.
    pub fn rank(self) -> Option<u8> {
        match self {
            PrimitiveKind::Byte => Some(0),
            PrimitiveKind::Char => Some(1),
            PrimitiveKind::Short => Some(2),
            PrimitiveKind::Int => Some(3),
            PrimitiveKind::Long => Some(4),
            PrimitiveKind::Float => Some(5),
            PrimitiveKind::Double => Some(6),
            PrimitiveKind::Boolean | PrimitiveKind::Void => None,
        }
    }

    /// Stack/local units occupied by a value of this kind.
    pub fn slot_width(self) -> u8 {
        match self {
            PrimitiveKind::Long | PrimitiveKind::Double => 2,
            PrimitiveKind::Void => 0,
            _ => 1,
        }
    }

    /// Kinds that live in a single 32-bit integer slot.
    pub fn is_integer_representable(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Boolean
                | PrimitiveKind::Byte
                | PrimitiveKind::Char
                | PrimitiveKind::Short
                | PrimitiveKind::Int
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Char
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    pub fn is_numeric(self) -> bool {
        self.rank().is_some()
    }

    /// Whether a `from` value may be stored into a slot of this kind.
    ///
    /// Holds when this kind ranks at least as high as `from`, or when both
    /// are integer-representable.
    pub fn accepts(self, from: PrimitiveKind) -> bool {
        if self == from {
            return true;
        }
        if let (Some(target), Some(source)) = (self.rank(), from.rank())
            && target >= source
        {
            return true;
        }
        self.is_integer_representable() && from.is_integer_representable()
    }

    /// Source keyword (`int`, `boolean`, ...).
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "boolean" => PrimitiveKind::Boolean,
            "char" => PrimitiveKind::Char,
            "byte" => PrimitiveKind::Byte,
            "short" => PrimitiveKind::Short,
            "int" => PrimitiveKind::Int,
            "long" => PrimitiveKind::Long,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            "void" => PrimitiveKind::Void,
            _ => return None,
        })
    }

    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
            PrimitiveKind::Void => 'V',
        }
    }

    fn from_descriptor(c: char) -> Option<Self> {
        Some(match c {
            'Z' => PrimitiveKind::Boolean,
            'C' => PrimitiveKind::Char,
            'B' => PrimitiveKind::Byte,
            'S' => PrimitiveKind::Short,
            'I' => PrimitiveKind::Int,
            'J' => PrimitiveKind::Long,
            'F' => PrimitiveKind::Float,
            'D' => PrimitiveKind::Double,
            'V' => PrimitiveKind::Void,
            _ => return None,
        })
    }

    /// Wrapper class used for autoboxing.
    pub fn wrapper_class(self) -> Option<&'static str> {
        Some(match self {
            PrimitiveKind::Boolean => "java/lang/Boolean",
            PrimitiveKind::Char => "java/lang/Character",
            PrimitiveKind::Byte => "java/lang/Byte",
            PrimitiveKind::Short => "java/lang/Short",
            PrimitiveKind::Int => "java/lang/Integer",
            PrimitiveKind::Long => "java/lang/Long",
            PrimitiveKind::Float => "java/lang/Float",
            PrimitiveKind::Double => "java/lang/Double",
            PrimitiveKind::Void => return None,
        })
    }

    pub fn from_wrapper_class(name: &str) -> Option<Self> {
        Some(match name {
            "java/lang/Boolean" => PrimitiveKind::Boolean,
            "java/lang/Character" => PrimitiveKind::Char,
            "java/lang/Byte" => PrimitiveKind::Byte,
            "java/lang/Short" => PrimitiveKind::Short,
            "java/lang/Integer" => PrimitiveKind::Int,
            "java/lang/Long" => PrimitiveKind::Long,
            "java/lang/Float" => PrimitiveKind::Float,
            "java/lang/Double" => PrimitiveKind::Double,
            _ => return None,
        })
    }

    /// Wrapper instance method that unboxes to this kind (`intValue`, ...).
    pub fn unbox_method(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "booleanValue",
            PrimitiveKind::Char => "charValue",
            PrimitiveKind::Byte => "byteValue",
            PrimitiveKind::Short => "shortValue",
            PrimitiveKind::Int => "intValue",
            PrimitiveKind::Long => "longValue",
            PrimitiveKind::Float => "floatValue",
            PrimitiveKind::Double => "doubleValue",
            PrimitiveKind::Void => "",
        }
    }
}

// ============================================================================
// SemanticType
// ============================================================================

/// A resolved Ixion type.
///
/// Arrays store their root (non-array) element type plus a dimension count.
/// Most dimensions an array type may have; one `nullable_mask` bit each.
pub const MAX_ARRAY_DIMENSIONS: u8 = 32;

/// Bit `i` of `nullable_mask` marks dimension `i` (0 = outermost) as
/// nullable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Primitive(PrimitiveKind),
    Reference {
        name: String,
        nullable: bool,
    },
    Array {
        element: Box<SemanticType>,
        dimensions: u8,
        nullable_mask: u32,
    },
    Method {
        arguments: Vec<SemanticType>,
        return_type: Box<SemanticType>,
    },
    Null,
}

impl SemanticType {
    pub const BOOLEAN: SemanticType = SemanticType::Primitive(PrimitiveKind::Boolean);
    pub const CHAR: SemanticType = SemanticType::Primitive(PrimitiveKind::Char);
    pub const BYTE: SemanticType = SemanticType::Primitive(PrimitiveKind::Byte);
    pub const SHORT: SemanticType = SemanticType::Primitive(PrimitiveKind::Short);
    pub const INT: SemanticType = SemanticType::Primitive(PrimitiveKind::Int);
    pub const LONG: SemanticType = SemanticType::Primitive(PrimitiveKind::Long);
    pub const FLOAT: SemanticType = SemanticType::Primitive(PrimitiveKind::Float);
    pub const DOUBLE: SemanticType = SemanticType::Primitive(PrimitiveKind::Double);
    pub const VOID: SemanticType = SemanticType::Primitive(PrimitiveKind::Void);

    /// Non-nullable reference to a class. Dotted names are normalized.
    pub fn reference(name: &str) -> Self {
        SemanticType::Reference {
            name: name.replace('.', "/"),
            nullable: false,
        }
    }

    pub fn nullable_reference(name: &str) -> Self {
        SemanticType::reference(name).as_nullable()
    }

    pub fn string() -> Self {
        SemanticType::reference(STRING_CLASS)
    }

    pub fn object() -> Self {
        SemanticType::reference(OBJECT_CLASS)
    }

    /// Non-nullable array of `element` with `dimensions` dimensions.
    ///
    /// An array element is flattened into the new type so that `element` of
    /// the result is never itself an array. Dimensions past
    /// [`MAX_ARRAY_DIMENSIONS`] are dropped; use [`try_array`](Self::try_array)
    /// where the count comes from source.
    pub fn array(element: SemanticType, dimensions: u8) -> Self {
        let element = match element {
            SemanticType::Array {
                element,
                dimensions: inner,
                nullable_mask,
            } => {
                return SemanticType::Array {
                    element,
                    dimensions: inner.saturating_add(dimensions).min(MAX_ARRAY_DIMENSIONS),
                    nullable_mask: nullable_mask.checked_shl(u32::from(dimensions)).unwrap_or(0),
                };
            }
            element => element,
        };
        SemanticType::Array {
            element: Box::new(element),
            dimensions: dimensions.min(MAX_ARRAY_DIMENSIONS),
            nullable_mask: 0,
        }
    }

    /// Like [`array`](Self::array), `None` when the total number of
    /// dimensions would exceed [`MAX_ARRAY_DIMENSIONS`].
    pub fn try_array(element: SemanticType, dimensions: usize) -> Option<Self> {
        let inner = match &element {
            SemanticType::Array { dimensions, .. } => usize::from(*dimensions),
            _ => 0,
        };
        let total = inner.checked_add(dimensions)?;
        if total > usize::from(MAX_ARRAY_DIMENSIONS) {
            return None;
        }
        Some(Self::array(element, u8::try_from(dimensions).ok()?))
    }

    pub fn method(arguments: Vec<SemanticType>, return_type: SemanticType) -> Self {
        SemanticType::Method {
            arguments,
            return_type: Box::new(return_type),
        }
    }

    /// Parse a JVM field or method descriptor (`I`, `[Ljava/lang/String;`, `(ID)V`).
    ///
    /// References parsed from descriptors are non-nullable.
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        let mut chars = descriptor.chars().peekable();
        let ty = parse_descriptor(&mut chars)?;
        chars.next().is_none().then_some(ty)
    }

    // ==========================================================================
    // Classification
    // ==========================================================================

    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            SemanticType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, SemanticType::Primitive(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, SemanticType::Primitive(PrimitiveKind::Void))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, SemanticType::Primitive(PrimitiveKind::Boolean))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, SemanticType::Reference { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, SemanticType::Array { .. })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SemanticType::Null)
    }

    /// References, arrays, and `null`: values held as object pointers.
    pub fn is_object_like(&self) -> bool {
        matches!(
            self,
            SemanticType::Reference { .. } | SemanticType::Array { .. } | SemanticType::Null
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(self, SemanticType::Reference { name, .. } if name == STRING_CLASS)
    }

    pub fn is_numeric(&self) -> bool {
        self.primitive().is_some_and(PrimitiveKind::is_numeric)
    }

    pub fn is_integer(&self) -> bool {
        self.primitive().is_some_and(PrimitiveKind::is_integer)
    }

    pub fn is_integer_representable(&self) -> bool {
        self.primitive()
            .is_some_and(PrimitiveKind::is_integer_representable)
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            SemanticType::Reference { nullable, .. } => *nullable,
            SemanticType::Array { nullable_mask, .. } => nullable_mask & 1 != 0,
            SemanticType::Null => true,
            _ => false,
        }
    }

    /// Widening rank of a numeric primitive.
    pub fn rank(&self) -> Option<u8> {
        self.primitive().and_then(PrimitiveKind::rank)
    }

    /// Stack/local units taken by a value of this type (0 for `void`).
    pub fn slot_width(&self) -> u8 {
        match self {
            SemanticType::Primitive(kind) => kind.slot_width(),
            SemanticType::Method { .. } => 0,
            _ => 1,
        }
    }

    // ==========================================================================
    // Derived types
    // ==========================================================================

    /// Nullable variant. Primitives are returned unchanged.
    pub fn as_nullable(&self) -> Self {
        match self {
            SemanticType::Reference { name, .. } => SemanticType::Reference {
                name: name.clone(),
                nullable: true,
            },
            SemanticType::Array {
                element,
                dimensions,
                nullable_mask,
            } => SemanticType::Array {
                element: element.clone(),
                dimensions: *dimensions,
                nullable_mask: nullable_mask | 1,
            },
            other => other.clone(),
        }
    }

    pub fn as_non_nullable(&self) -> Self {
        match self {
            SemanticType::Reference { name, .. } => SemanticType::Reference {
                name: name.clone(),
                nullable: false,
            },
            SemanticType::Array {
                element,
                dimensions,
                nullable_mask,
            } => SemanticType::Array {
                element: element.clone(),
                dimensions: *dimensions,
                nullable_mask: nullable_mask & !1,
            },
            other => other.clone(),
        }
    }

    /// Type produced by indexing an array once.
    pub fn element_type(&self) -> Option<SemanticType> {
        match self {
            SemanticType::Array {
                element,
                dimensions: 1,
                ..
            } => Some((**element).clone()),
            SemanticType::Array {
                element,
                dimensions,
                nullable_mask,
            } => Some(SemanticType::Array {
                element: element.clone(),
                dimensions: dimensions - 1,
                nullable_mask: nullable_mask >> 1,
            }),
            _ => None,
        }
    }

    /// Wrapper class for primitives; every other type boxes to itself.
    pub fn autobox_wrapper(&self) -> SemanticType {
        match self.primitive().and_then(PrimitiveKind::wrapper_class) {
            Some(wrapper) => SemanticType::reference(wrapper),
            None => self.clone(),
        }
    }

    /// Primitive kind a wrapper reference unboxes to.
    pub fn unboxed_kind(&self) -> Option<PrimitiveKind> {
        match self {
            SemanticType::Reference { name, .. } => PrimitiveKind::from_wrapper_class(name),
            _ => None,
        }
    }

    pub fn method_parts(&self) -> Option<(&[SemanticType], &SemanticType)> {
        match self {
            SemanticType::Method {
                arguments,
                return_type,
            } => Some((arguments, return_type)),
            _ => None,
        }
    }

    // ==========================================================================
    // Names and descriptors
    // ==========================================================================

    /// Class internal name of a reference, descriptor for arrays.
    pub fn internal_name(&self) -> String {
        match self {
            SemanticType::Reference { name, .. } => name.clone(),
            SemanticType::Null => OBJECT_CLASS.to_string(),
            other => other.descriptor(),
        }
    }

    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            SemanticType::Primitive(kind) => out.push(kind.descriptor()),
            SemanticType::Reference { name, .. } => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            SemanticType::Array {
                element,
                dimensions,
                ..
            } => {
                for _ in 0..*dimensions {
                    out.push('[');
                }
                element.write_descriptor(out);
            }
            SemanticType::Method {
                arguments,
                return_type,
            } => {
                out.push('(');
                for argument in arguments {
                    argument.write_descriptor(out);
                }
                out.push(')');
                return_type.write_descriptor(out);
            }
            SemanticType::Null => out.push_str("Ljava/lang/Object;"),
        }
    }
}

/// The operand with the higher widening rank; ties keep `a`.
///
/// Types without a rank never win over `a`.
pub fn get_larger<'a>(a: &'a SemanticType, b: &'a SemanticType) -> &'a SemanticType {
    match (a.rank(), b.rank()) {
        (Some(left), Some(right)) if right > left => b,
        _ => a,
    }
}

fn parse_descriptor<I: Iterator<Item = char>>(
    chars: &mut std::iter::Peekable<I>,
) -> Option<SemanticType> {
    match chars.next()? {
        'L' => {
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == ';' {
                    return Some(SemanticType::reference(&name));
                }
                name.push(c);
            }
            None
        }
        '[' => {
            let element = parse_descriptor(chars)?;
            SemanticType::try_array(element, 1)
        }
        '(' => {
            let mut arguments = Vec::new();
            while chars.peek() != Some(&')') {
                arguments.push(parse_descriptor(chars)?);
            }
            chars.next();
            let return_type = parse_descriptor(chars)?;
            Some(SemanticType::method(arguments, return_type))
        }
        c => PrimitiveKind::from_descriptor(c).map(SemanticType::Primitive),
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Primitive(kind) => f.write_str(kind.keyword()),
            SemanticType::Reference { name, nullable } => {
                f.write_str(&name.replace('/', "."))?;
                if *nullable {
                    f.write_str("?")?;
                }
                Ok(())
            }
            SemanticType::Array { .. } => {
                if let Some(element) = self.element_type() {
                    write!(f, "{element}[]")?;
                }
                if self.is_nullable() {
                    f.write_str("?")?;
                }
                Ok(())
            }
            SemanticType::Method { .. } => f.write_str("method"),
            SemanticType::Null => f.write_str("null"),
        }
    }
}

/// Render an argument list for diagnostics (`int, java.lang.String`).
pub fn render_types(types: &[SemanticType]) -> String {
    if types.is_empty() {
        return "(none)".to_string();
    }
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
