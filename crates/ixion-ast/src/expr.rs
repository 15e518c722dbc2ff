//! Expression AST nodes for Ixion.
//!
//! Provides nodes for all expression types including:
//! - Literals (numbers, characters, strings, booleans, null)
//! - Binary, unary, and update operations
//! - Calls, member access, and indexing (plain and null-safe)
//! - Construction (`new T(..)`, `new T[n]`, `new T[] {..}`)
//! - Type operations (`is`, `to`, `!`)
//! - Lambdas

use crate::Ident;
use crate::ops::{AssignOp, BinaryOp, UnaryOp, UpdateOp};
use crate::stmt::Block;
use crate::types::TypeExpr;
use ixion_core::Span;

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    /// Literal value
    Literal(LiteralExpr<'ast>),
    /// Identifier reference
    Ident(Ident<'ast>),
    /// `this`
    This(Span),
    /// `super`
    Super(Span),
    /// Binary operation
    Binary(&'ast BinaryExpr<'ast>),
    /// Unary prefix operation
    Unary(&'ast UnaryExpr<'ast>),
    /// `++`/`--`, prefix or postfix
    Update(&'ast UpdateExpr<'ast>),
    /// Assignment
    Assign(&'ast AssignExpr<'ast>),
    /// Free function call `f(args)`
    Call(&'ast CallExpr<'ast>),
    /// Method call `recv.m(args)` or `recv?.m(args)`
    MethodCall(&'ast MethodCallExpr<'ast>),
    /// Member access `recv.x` or `recv?.x`
    Member(&'ast MemberExpr<'ast>),
    /// Indexing `a[i]` or `a?[i]`
    Index(&'ast IndexExpr<'ast>),
    /// Non-null assertion `x!`
    NonNull(&'ast NonNullExpr<'ast>),
    /// Object construction
    New(&'ast NewExpr<'ast>),
    /// Array construction
    NewArray(&'ast NewArrayExpr<'ast>),
    /// Instance check `x is T`
    Is(&'ast IsExpr<'ast>),
    /// Conversion `x to T`
    Cast(&'ast CastExpr<'ast>),
    /// Ternary conditional
    Ternary(&'ast TernaryExpr<'ast>),
    /// Lambda literal
    Lambda(&'ast LambdaExpr<'ast>),
    /// Parenthesized expression
    Paren(&'ast ParenExpr<'ast>),
}

/// How an assignable expression stores its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LValueKind {
    Variable,
    Property,
    Array,
    NullableProperty,
    NullableArray,
}

impl<'ast> Expr<'ast> {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Ident(e) => e.span,
            Self::This(span) | Self::Super(span) => *span,
            Self::Binary(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Update(e) => e.span,
            Self::Assign(e) => e.span,
            Self::Call(e) => e.span,
            Self::MethodCall(e) => e.span,
            Self::Member(e) => e.span,
            Self::Index(e) => e.span,
            Self::NonNull(e) => e.span,
            Self::New(e) => e.span,
            Self::NewArray(e) => e.span,
            Self::Is(e) => e.span,
            Self::Cast(e) => e.span,
            Self::Ternary(e) => e.span,
            Self::Lambda(e) => e.span,
            Self::Paren(e) => e.span,
        }
    }

    /// Storage kind when the expression is the target of an assignment.
    pub fn lvalue_kind(&self) -> Option<LValueKind> {
        match self {
            Self::Ident(_) => Some(LValueKind::Variable),
            Self::Member(m) if m.null_safe => Some(LValueKind::NullableProperty),
            Self::Member(_) => Some(LValueKind::Property),
            Self::Index(i) if i.null_safe => Some(LValueKind::NullableArray),
            Self::Index(_) => Some(LValueKind::Array),
            Self::Paren(p) => p.expr.lvalue_kind(),
            _ => None,
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expr<'ast> {
        match self {
            Self::Paren(p) => p.expr.unparenthesized(),
            other => other,
        }
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self.unparenthesized(), Self::Lambda(_))
    }
}

/// A literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    /// The literal kind
    pub kind: LiteralKind<'ast>,
    /// Source location
    pub span: Span,
}

/// The kind of literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind<'ast> {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    /// UTF-16 code unit
    Char(u16),
    /// String literal with escapes already processed
    String(&'ast str),
    Null,
}

/// A binary operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    /// Left operand
    pub left: &'ast Expr<'ast>,
    /// Operator
    pub op: BinaryOp,
    /// Right operand
    pub right: &'ast Expr<'ast>,
    /// Source location
    pub span: Span,
}

/// A unary prefix operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

/// `++x`, `x++`, `--x`, `x--`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateExpr<'ast> {
    pub op: UpdateOp,
    /// `true` for the prefix form, which yields the updated value.
    pub prefix: bool,
    pub target: &'ast Expr<'ast>,
    pub span: Span,
}

/// An assignment, plain or compound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignExpr<'ast> {
    pub target: &'ast Expr<'ast>,
    pub op: AssignOp,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// A call to a function in scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    pub name: Ident<'ast>,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

/// A method call on a receiver expression.
///
/// An identifier receiver that names no variable is a class name, making the
/// call static.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodCallExpr<'ast> {
    pub receiver: &'ast Expr<'ast>,
    pub name: Ident<'ast>,
    pub args: &'ast [Expr<'ast>],
    /// `?.` instead of `.`
    pub null_safe: bool,
    pub span: Span,
}

/// Member access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberExpr<'ast> {
    pub receiver: &'ast Expr<'ast>,
    pub name: Ident<'ast>,
    /// `?.` instead of `.`
    pub null_safe: bool,
    pub span: Span,
}

/// Array indexing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexExpr<'ast> {
    pub target: &'ast Expr<'ast>,
    pub index: &'ast Expr<'ast>,
    /// `?[` instead of `[`
    pub null_safe: bool,
    pub span: Span,
}

/// `x!`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonNullExpr<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}

/// `new T(args)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewExpr<'ast> {
    pub ty: TypeExpr<'ast>,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

/// `new T[a][b][]` or `new T[] { .. }`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewArrayExpr<'ast> {
    /// Element type of the innermost dimension.
    pub element: TypeExpr<'ast>,
    /// Sized dimensions, outermost first.
    pub sizes: &'ast [Expr<'ast>],
    /// Trailing unsized `[]` after the sized ones.
    pub unsized_dimensions: u8,
    /// Initializer list, present only for the `new T[] {..}` form.
    pub initializer: Option<&'ast [Expr<'ast>]>,
    pub span: Span,
}

impl<'ast> NewArrayExpr<'ast> {
    pub fn dimensions(&self) -> usize {
        self.sizes.len() + usize::from(self.unsized_dimensions)
    }
}

/// `x is T`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsExpr<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

/// `x to T`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastExpr<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

/// `c ? a : b`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TernaryExpr<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub then_expr: &'ast Expr<'ast>,
    pub else_expr: &'ast Expr<'ast>,
    pub span: Span,
}

/// A lambda literal `(a, b) -> a + b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaExpr<'ast> {
    pub params: &'ast [LambdaParam<'ast>],
    pub body: LambdaBody<'ast>,
    pub span: Span,
}

/// A lambda parameter. Untyped parameters are `Object`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaParam<'ast> {
    pub name: Ident<'ast>,
    pub ty: Option<TypeExpr<'ast>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LambdaBody<'ast> {
    Expr(&'ast Expr<'ast>),
    Block(Block<'ast>),
}

/// `( expr )`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParenExpr<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}
