//! Statement AST nodes for Ixion.

use crate::Ident;
use crate::expr::Expr;
use crate::types::TypeExpr;
use ixion_core::Span;

/// A statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// Expression statement (expr;)
    Expr(ExprStmt<'ast>),
    /// Variable declaration
    VarDecl(VarDeclStmt<'ast>),
    /// Block statement
    Block(Block<'ast>),
    /// If statement
    If(&'ast IfStmt<'ast>),
    /// While loop
    While(&'ast WhileStmt<'ast>),
    /// For loop
    For(&'ast ForStmt<'ast>),
    /// Break statement
    Break(Span),
    /// Continue statement
    Continue(Span),
    /// Return statement
    Return(ReturnStmt<'ast>),
    /// Throw statement
    Throw(ThrowStmt<'ast>),
    /// Try/catch/finally
    Try(&'ast TryStmt<'ast>),
}

impl<'ast> Stmt<'ast> {
    /// Get the span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(s) => s.span,
            Self::VarDecl(s) => s.span,
            Self::Block(s) => s.span,
            Self::If(s) => s.span,
            Self::While(s) => s.span,
            Self::For(s) => s.span,
            Self::Break(span) | Self::Continue(span) => *span,
            Self::Return(s) => s.span,
            Self::Throw(s) => s.span,
            Self::Try(s) => s.span,
        }
    }
}

/// `expr;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}

/// `var x: T = init;` or `const x = init;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDeclStmt<'ast> {
    pub name: Ident<'ast>,
    /// Declared type; inferred from `init` when absent.
    pub ty: Option<TypeExpr<'ast>>,
    pub init: Option<&'ast Expr<'ast>>,
    pub is_const: bool,
    pub span: Span,
}

/// `{ stmts }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    pub condition: Expr<'ast>,
    pub then_branch: Stmt<'ast>,
    pub else_branch: Option<Stmt<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    pub condition: Expr<'ast>,
    pub body: Stmt<'ast>,
    pub span: Span,
}

/// `for (init; condition; update) body`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStmt<'ast> {
    pub init: Option<Stmt<'ast>>,
    /// Missing condition loops until `break`.
    pub condition: Option<Expr<'ast>>,
    pub update: Option<Expr<'ast>>,
    pub body: Stmt<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub value: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowStmt<'ast> {
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// `try { body } catch (e: T) { ... } finally { ... }`
///
/// At least one of `catches` and `finally` is present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TryStmt<'ast> {
    pub body: Block<'ast>,
    pub catches: &'ast [CatchClause<'ast>],
    pub finally: Option<Block<'ast>>,
    pub span: Span,
}

/// `catch (name: ty) { body }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchClause<'ast> {
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    pub body: Block<'ast>,
    pub span: Span,
}
