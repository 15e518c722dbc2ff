//! Type annotations as written in source.

use ixion_core::Span;

/// A type reference such as `int`, `String?`, or `int[]?[]`.
///
/// `array_suffixes` lists one entry per `[]` in source order (innermost
/// dimension first); each flag records whether that `[]` was followed by `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeExpr<'ast> {
    /// Primitive keyword, alias, or dotted class name.
    pub name: &'ast str,
    /// `?` directly after the name.
    pub nullable: bool,
    pub array_suffixes: &'ast [bool],
    pub span: Span,
}

impl<'ast> TypeExpr<'ast> {
    pub fn named(name: &'ast str, span: Span) -> Self {
        Self {
            name,
            nullable: false,
            array_suffixes: &[],
            span,
        }
    }

    pub fn is_array(&self) -> bool {
        !self.array_suffixes.is_empty()
    }
}
