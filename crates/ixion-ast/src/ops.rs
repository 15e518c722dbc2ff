//! Operator definitions for Ixion expressions.

use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,

    // Bitwise
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `>>>`
    ShiftRightUnsigned,

    // Equality
    /// `==` (value equality, `equals` for references)
    Equal,
    /// `!=`
    NotEqual,
    /// `===` (reference identity)
    Identical,
    /// `!==`
    NotIdentical,

    // Relational
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // Logical
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,

    /// `??`
    Coalesce,
}

/// Operator families, each compiled by its own emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryCategory {
    Arithmetic,
    Bitwise,
    Equality,
    Relational,
    Logical,
    Coalesce,
}

impl BinaryOp {
    pub fn category(self) -> BinaryCategory {
        use BinaryOp::*;
        match self {
            Add | Sub | Mul | Div | Mod => BinaryCategory::Arithmetic,
            BitAnd | BitOr | BitXor | ShiftLeft | ShiftRight | ShiftRightUnsigned => {
                BinaryCategory::Bitwise
            }
            Equal | NotEqual | Identical | NotIdentical => BinaryCategory::Equality,
            Less | LessEqual | Greater | GreaterEqual => BinaryCategory::Relational,
            LogicalAnd | LogicalOr => BinaryCategory::Logical,
            Coalesce => BinaryCategory::Coalesce,
        }
    }

    pub fn is_shift(self) -> bool {
        matches!(
            self,
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight | BinaryOp::ShiftRightUnsigned
        )
    }

    /// Whether the operator yields a boolean that can be compiled as a branch.
    pub fn is_conditional(self) -> bool {
        matches!(
            self.category(),
            BinaryCategory::Equality | BinaryCategory::Relational | BinaryCategory::Logical
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let s = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            ShiftRightUnsigned => ">>>",
            Equal => "==",
            NotEqual => "!=",
            Identical => "===",
            NotIdentical => "!==",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            LogicalAnd => "&&",
            LogicalOr => "||",
            Coalesce => "??",
        };
        write!(f, "{}", s)
    }
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `~`
    BitNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
        };
        write!(f, "{}", s)
    }
}

/// `++` / `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn delta(self) -> i32 {
        match self {
            UpdateOp::Increment => 1,
            UpdateOp::Decrement => -1,
        }
    }
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `%=`
    ModAssign,
    /// `&=`
    AndAssign,
    /// `|=`
    OrAssign,
    /// `^=`
    XorAssign,
    /// `<<=`
    ShlAssign,
    /// `>>=`
    ShrAssign,
    /// `>>>=`
    UShrAssign,
}

impl AssignOp {
    /// The binary operator applied by a compound assignment.
    pub fn binary_op(self) -> Option<BinaryOp> {
        Some(match self {
            AssignOp::Assign => return None,
            AssignOp::AddAssign => BinaryOp::Add,
            AssignOp::SubAssign => BinaryOp::Sub,
            AssignOp::MulAssign => BinaryOp::Mul,
            AssignOp::DivAssign => BinaryOp::Div,
            AssignOp::ModAssign => BinaryOp::Mod,
            AssignOp::AndAssign => BinaryOp::BitAnd,
            AssignOp::OrAssign => BinaryOp::BitOr,
            AssignOp::XorAssign => BinaryOp::BitXor,
            AssignOp::ShlAssign => BinaryOp::ShiftLeft,
            AssignOp::ShrAssign => BinaryOp::ShiftRight,
            AssignOp::UShrAssign => BinaryOp::ShiftRightUnsigned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(BinaryOp::Identical.category(), BinaryCategory::Equality);
        assert_eq!(BinaryOp::ShiftRightUnsigned.category(), BinaryCategory::Bitwise);
        assert!(BinaryOp::LogicalOr.is_conditional());
        assert!(!BinaryOp::Coalesce.is_conditional());
    }

    #[test]
    fn compound_assignment_operator() {
        assert_eq!(AssignOp::UShrAssign.binary_op(), Some(BinaryOp::ShiftRightUnsigned));
        assert_eq!(AssignOp::Assign.binary_op(), None);
    }
}
