//! Top-level declaration AST nodes for Ixion.
//!
//! A [`CompilationUnit`] is one source file: imports followed by functions,
//! classes, interfaces, and global variables in declaration order.

use crate::Ident;
use crate::expr::Expr;
use crate::stmt::Block;
use crate::types::TypeExpr;
use ixion_core::Span;

/// One parsed source file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompilationUnit<'ast> {
    /// File stem (`main` for `main.ix`).
    pub name: &'ast str,
    /// Source file name recorded in emitted classes.
    pub file_name: &'ast str,
    pub imports: &'ast [ImportDecl<'ast>],
    pub items: &'ast [Item<'ast>],
}

/// A top-level item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'ast> {
    Function(&'ast FunctionDecl<'ast>),
    Class(&'ast ClassDecl<'ast>),
    Interface(&'ast InterfaceDecl<'ast>),
    Global(&'ast GlobalDecl<'ast>),
}

impl<'ast> Item<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Item::Function(f) => f.span,
            Item::Class(c) => c.span,
            Item::Interface(i) => i.span,
            Item::Global(g) => g.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// `import java.util.ArrayList`, `import other`, optionally `as Alias`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportDecl<'ast> {
    /// Dotted host class name or unit name.
    pub path: &'ast str,
    pub alias: Option<Ident<'ast>>,
    pub span: Span,
}

impl<'ast> ImportDecl<'ast> {
    /// Name the import is visible under.
    pub fn visible_name(&self) -> &'ast str {
        match self.alias {
            Some(alias) => alias.name,
            None => self.path.rsplit('.').next().unwrap_or(self.path),
        }
    }
}

/// A function or method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionDecl<'ast> {
    pub name: Ident<'ast>,
    pub params: &'ast [Param<'ast>],
    /// Declared return type. `None` means `void` for block bodies and
    /// inferred for expression bodies.
    pub return_type: Option<TypeExpr<'ast>>,
    pub body: FunctionBody<'ast>,
    pub visibility: Visibility,
    /// Only meaningful for class methods; top-level functions are always static.
    pub is_static: bool,
    /// `export fn`: visible to importing units.
    pub is_exported: bool,
    pub throws: &'ast [TypeExpr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FunctionBody<'ast> {
    Block(Block<'ast>),
    /// `=> expr`
    Expr(&'ast Expr<'ast>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'ast> {
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
}

/// A class declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassDecl<'ast> {
    pub name: Ident<'ast>,
    pub superclass: Option<TypeExpr<'ast>>,
    /// `implements` clause.
    pub interfaces: &'ast [TypeExpr<'ast>],
    pub visibility: Visibility,
    pub fields: &'ast [FieldDecl<'ast>],
    pub methods: &'ast [FunctionDecl<'ast>],
    pub constructors: &'ast [ConstructorDecl<'ast>],
    pub span: Span,
}

/// An interface declaration: abstract instance methods only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceDecl<'ast> {
    pub name: Ident<'ast>,
    /// Interfaces this one extends.
    pub extends: &'ast [TypeExpr<'ast>],
    pub visibility: Visibility,
    pub methods: &'ast [MethodSignature<'ast>],
    pub span: Span,
}

/// A method without a body. `None` return type means `void`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodSignature<'ast> {
    pub name: Ident<'ast>,
    pub params: &'ast [Param<'ast>],
    pub return_type: Option<TypeExpr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDecl<'ast> {
    pub name: Ident<'ast>,
    pub ty: Option<TypeExpr<'ast>>,
    pub init: Option<&'ast Expr<'ast>>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_const: bool,
    pub span: Span,
}

/// `this(params) : super(args) { body }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructorDecl<'ast> {
    pub params: &'ast [Param<'ast>],
    pub super_args: &'ast [Expr<'ast>],
    pub body: Block<'ast>,
    pub visibility: Visibility,
    pub span: Span,
}

/// A top-level variable, stored as a static field of the unit class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalDecl<'ast> {
    pub name: Ident<'ast>,
    pub ty: Option<TypeExpr<'ast>>,
    pub init: Option<&'ast Expr<'ast>>,
    pub is_const: bool,
    pub is_exported: bool,
    pub span: Span,
}
