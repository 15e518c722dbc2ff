//! Abstract Syntax Tree (AST) for Ixion.
//!
//! Nodes are arena-allocated (`bumpalo`) sum types with `&'ast` children.
//! The tree is produced by an external parser; the compiler only reads it.
//! [`AstBuilder`] assembles trees by hand for tests and embedders.

pub mod builder;
pub mod decl;
pub mod expr;
pub mod ops;
pub mod stmt;
pub mod types;

pub use builder::AstBuilder;
pub use decl::*;
pub use expr::*;
pub use ops::*;
pub use stmt::*;
pub use types::*;

use ixion_core::Span;

/// An identifier with its source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}
