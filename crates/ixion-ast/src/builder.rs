//! Arena-backed construction helpers.
//!
//! The parser is an external collaborator, so tests, benches, and embedders
//! assemble trees by hand. [`AstBuilder`] allocates every node in one
//! [`Bump`] and stamps it with the current line.
//!
//! ```
//! use bumpalo::Bump;
//! use ixion_ast::{AstBuilder, BinaryOp};
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let sum = b.binary(b.int(1), BinaryOp::Add, b.double(2.0));
//! let stmt = b.expr_stmt(b.call("print", &[sum]));
//! # let _ = stmt;
//! ```

use std::cell::Cell;

use bumpalo::Bump;
use ixion_core::Span;

use crate::*;

pub struct AstBuilder<'ast> {
    arena: &'ast Bump,
    line: Cell<u32>,
}

impl<'ast> AstBuilder<'ast> {
    pub fn new(arena: &'ast Bump) -> Self {
        Self {
            arena,
            line: Cell::new(1),
        }
    }

    /// Stamp subsequently built nodes with `line`.
    pub fn at_line(&self, line: u32) -> &Self {
        self.line.set(line);
        self
    }

    /// Span on the current line.
    pub fn span(&self) -> Span {
        Span::new(self.line.get(), 1, 1)
    }

    pub fn arena(&self) -> &'ast Bump {
        self.arena
    }

    fn alloc<T>(&self, value: T) -> &'ast T {
        self.arena.alloc(value)
    }

    fn slice<T: Copy>(&self, values: &[T]) -> &'ast [T] {
        self.arena.alloc_slice_copy(values)
    }

    pub fn name(&self, name: &str) -> Ident<'ast> {
        Ident {
            name: self.arena.alloc_str(name),
            span: self.span(),
        }
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    pub fn ty(&self, name: &str) -> TypeExpr<'ast> {
        TypeExpr::named(self.arena.alloc_str(name), self.span())
    }

    pub fn nullable_ty(&self, name: &str) -> TypeExpr<'ast> {
        TypeExpr {
            nullable: true,
            ..self.ty(name)
        }
    }

    /// `name[]...` with one entry per `[]` (innermost first), `true` for `[]?`.
    pub fn array_ty(&self, name: &str, suffixes: &[bool]) -> TypeExpr<'ast> {
        TypeExpr {
            array_suffixes: self.slice(suffixes),
            ..self.ty(name)
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn literal(&self, kind: LiteralKind<'ast>) -> Expr<'ast> {
        Expr::Literal(LiteralExpr {
            kind,
            span: self.span(),
        })
    }

    pub fn int(&self, value: i32) -> Expr<'ast> {
        self.literal(LiteralKind::Int(value))
    }

    pub fn long(&self, value: i64) -> Expr<'ast> {
        self.literal(LiteralKind::Long(value))
    }

    pub fn float(&self, value: f32) -> Expr<'ast> {
        self.literal(LiteralKind::Float(value))
    }

    pub fn double(&self, value: f64) -> Expr<'ast> {
        self.literal(LiteralKind::Double(value))
    }

    pub fn bool(&self, value: bool) -> Expr<'ast> {
        self.literal(LiteralKind::Bool(value))
    }

    pub fn char(&self, value: char) -> Expr<'ast> {
        let mut units = [0u16; 2];
        self.char_unit(value.encode_utf16(&mut units)[0])
    }

    /// A `char` literal holding a raw UTF-16 code unit, surrogates included.
    pub fn char_unit(&self, unit: u16) -> Expr<'ast> {
        self.literal(LiteralKind::Char(unit))
    }

    pub fn str(&self, value: &str) -> Expr<'ast> {
        self.literal(LiteralKind::String(self.arena.alloc_str(value)))
    }

    pub fn null(&self) -> Expr<'ast> {
        self.literal(LiteralKind::Null)
    }

    pub fn ident(&self, name: &str) -> Expr<'ast> {
        Expr::Ident(self.name(name))
    }

    pub fn this(&self) -> Expr<'ast> {
        Expr::This(self.span())
    }

    pub fn super_(&self) -> Expr<'ast> {
        Expr::Super(self.span())
    }

    pub fn binary(&self, left: Expr<'ast>, op: BinaryOp, right: Expr<'ast>) -> Expr<'ast> {
        Expr::Binary(self.alloc(BinaryExpr {
            left: self.alloc(left),
            op,
            right: self.alloc(right),
            span: self.span(),
        }))
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr<'ast>) -> Expr<'ast> {
        Expr::Unary(self.alloc(UnaryExpr {
            op,
            operand: self.alloc(operand),
            span: self.span(),
        }))
    }

    pub fn update(&self, op: UpdateOp, prefix: bool, target: Expr<'ast>) -> Expr<'ast> {
        Expr::Update(self.alloc(UpdateExpr {
            op,
            prefix,
            target: self.alloc(target),
            span: self.span(),
        }))
    }

    pub fn assign(&self, target: Expr<'ast>, value: Expr<'ast>) -> Expr<'ast> {
        self.compound(target, AssignOp::Assign, value)
    }

    pub fn compound(&self, target: Expr<'ast>, op: AssignOp, value: Expr<'ast>) -> Expr<'ast> {
        Expr::Assign(self.alloc(AssignExpr {
            target: self.alloc(target),
            op,
            value: self.alloc(value),
            span: self.span(),
        }))
    }

    pub fn call(&self, name: &str, args: &[Expr<'ast>]) -> Expr<'ast> {
        Expr::Call(self.alloc(CallExpr {
            name: self.name(name),
            args: self.slice(args),
            span: self.span(),
        }))
    }

    fn method_call_impl(
        &self,
        receiver: Expr<'ast>,
        name: &str,
        args: &[Expr<'ast>],
        null_safe: bool,
    ) -> Expr<'ast> {
        Expr::MethodCall(self.alloc(MethodCallExpr {
            receiver: self.alloc(receiver),
            name: self.name(name),
            args: self.slice(args),
            null_safe,
            span: self.span(),
        }))
    }

    pub fn method_call(&self, receiver: Expr<'ast>, name: &str, args: &[Expr<'ast>]) -> Expr<'ast> {
        self.method_call_impl(receiver, name, args, false)
    }

    pub fn null_safe_call(
        &self,
        receiver: Expr<'ast>,
        name: &str,
        args: &[Expr<'ast>],
    ) -> Expr<'ast> {
        self.method_call_impl(receiver, name, args, true)
    }

    pub fn member(&self, receiver: Expr<'ast>, name: &str) -> Expr<'ast> {
        Expr::Member(self.alloc(MemberExpr {
            receiver: self.alloc(receiver),
            name: self.name(name),
            null_safe: false,
            span: self.span(),
        }))
    }

    pub fn null_safe_member(&self, receiver: Expr<'ast>, name: &str) -> Expr<'ast> {
        Expr::Member(self.alloc(MemberExpr {
            receiver: self.alloc(receiver),
            name: self.name(name),
            null_safe: true,
            span: self.span(),
        }))
    }

    pub fn index(&self, target: Expr<'ast>, index: Expr<'ast>) -> Expr<'ast> {
        Expr::Index(self.alloc(IndexExpr {
            target: self.alloc(target),
            index: self.alloc(index),
            null_safe: false,
            span: self.span(),
        }))
    }

    pub fn null_safe_index(&self, target: Expr<'ast>, index: Expr<'ast>) -> Expr<'ast> {
        Expr::Index(self.alloc(IndexExpr {
            target: self.alloc(target),
            index: self.alloc(index),
            null_safe: true,
            span: self.span(),
        }))
    }

    pub fn non_null(&self, expr: Expr<'ast>) -> Expr<'ast> {
        Expr::NonNull(self.alloc(NonNullExpr {
            expr: self.alloc(expr),
            span: self.span(),
        }))
    }

    pub fn new_object(&self, ty: TypeExpr<'ast>, args: &[Expr<'ast>]) -> Expr<'ast> {
        Expr::New(self.alloc(NewExpr {
            ty,
            args: self.slice(args),
            span: self.span(),
        }))
    }

    pub fn new_array(
        &self,
        element: TypeExpr<'ast>,
        sizes: &[Expr<'ast>],
        unsized_dimensions: u8,
    ) -> Expr<'ast> {
        Expr::NewArray(self.alloc(NewArrayExpr {
            element,
            sizes: self.slice(sizes),
            unsized_dimensions,
            initializer: None,
            span: self.span(),
        }))
    }

    /// `new T[] { items }`
    pub fn array_init(&self, element: TypeExpr<'ast>, items: &[Expr<'ast>]) -> Expr<'ast> {
        Expr::NewArray(self.alloc(NewArrayExpr {
            element,
            sizes: &[],
            unsized_dimensions: 1,
            initializer: Some(self.slice(items)),
            span: self.span(),
        }))
    }

    pub fn is(&self, expr: Expr<'ast>, ty: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::Is(self.alloc(IsExpr {
            expr: self.alloc(expr),
            ty,
            span: self.span(),
        }))
    }

    pub fn cast(&self, expr: Expr<'ast>, ty: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::Cast(self.alloc(CastExpr {
            expr: self.alloc(expr),
            ty,
            span: self.span(),
        }))
    }

    pub fn ternary(
        &self,
        condition: Expr<'ast>,
        then_expr: Expr<'ast>,
        else_expr: Expr<'ast>,
    ) -> Expr<'ast> {
        Expr::Ternary(self.alloc(TernaryExpr {
            condition: self.alloc(condition),
            then_expr: self.alloc(then_expr),
            else_expr: self.alloc(else_expr),
            span: self.span(),
        }))
    }

    /// Lambda with untyped parameters and an expression body.
    pub fn lambda(&self, params: &[&str], body: Expr<'ast>) -> Expr<'ast> {
        let params: Vec<_> = params
            .iter()
            .map(|p| LambdaParam {
                name: self.name(p),
                ty: None,
            })
            .collect();
        Expr::Lambda(self.alloc(LambdaExpr {
            params: self.slice(&params),
            body: LambdaBody::Expr(self.alloc(body)),
            span: self.span(),
        }))
    }

    pub fn lambda_block(&self, params: &[LambdaParam<'ast>], body: Block<'ast>) -> Expr<'ast> {
        Expr::Lambda(self.alloc(LambdaExpr {
            params: self.slice(params),
            body: LambdaBody::Block(body),
            span: self.span(),
        }))
    }

    pub fn paren(&self, expr: Expr<'ast>) -> Expr<'ast> {
        Expr::Paren(self.alloc(ParenExpr {
            expr: self.alloc(expr),
            span: self.span(),
        }))
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    pub fn expr_stmt(&self, expr: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Expr(ExprStmt {
            expr: self.alloc(expr),
            span: self.span(),
        })
    }

    /// `var name = init;`
    pub fn var(&self, name: &str, init: Expr<'ast>) -> Stmt<'ast> {
        Stmt::VarDecl(VarDeclStmt {
            name: self.name(name),
            ty: None,
            init: Some(self.alloc(init)),
            is_const: false,
            span: self.span(),
        })
    }

    /// `var name: ty = init;`
    pub fn var_typed(&self, name: &str, ty: TypeExpr<'ast>, init: Option<Expr<'ast>>) -> Stmt<'ast> {
        Stmt::VarDecl(VarDeclStmt {
            name: self.name(name),
            ty: Some(ty),
            init: init.map(|e| self.alloc(e)),
            is_const: false,
            span: self.span(),
        })
    }

    pub fn const_(&self, name: &str, init: Expr<'ast>) -> Stmt<'ast> {
        Stmt::VarDecl(VarDeclStmt {
            name: self.name(name),
            ty: None,
            init: Some(self.alloc(init)),
            is_const: true,
            span: self.span(),
        })
    }

    pub fn block(&self, stmts: &[Stmt<'ast>]) -> Block<'ast> {
        Block {
            stmts: self.slice(stmts),
            span: self.span(),
        }
    }

    pub fn block_stmt(&self, stmts: &[Stmt<'ast>]) -> Stmt<'ast> {
        Stmt::Block(self.block(stmts))
    }

    pub fn if_(
        &self,
        condition: Expr<'ast>,
        then_branch: Stmt<'ast>,
        else_branch: Option<Stmt<'ast>>,
    ) -> Stmt<'ast> {
        Stmt::If(self.alloc(IfStmt {
            condition,
            then_branch,
            else_branch,
            span: self.span(),
        }))
    }

    pub fn while_(&self, condition: Expr<'ast>, body: Stmt<'ast>) -> Stmt<'ast> {
        Stmt::While(self.alloc(WhileStmt {
            condition,
            body,
            span: self.span(),
        }))
    }

    pub fn for_(
        &self,
        init: Option<Stmt<'ast>>,
        condition: Option<Expr<'ast>>,
        update: Option<Expr<'ast>>,
        body: Stmt<'ast>,
    ) -> Stmt<'ast> {
        Stmt::For(self.alloc(ForStmt {
            init,
            condition,
            update,
            body,
            span: self.span(),
        }))
    }

    pub fn break_(&self) -> Stmt<'ast> {
        Stmt::Break(self.span())
    }

    pub fn continue_(&self) -> Stmt<'ast> {
        Stmt::Continue(self.span())
    }

    pub fn ret(&self, value: Option<Expr<'ast>>) -> Stmt<'ast> {
        Stmt::Return(ReturnStmt {
            value: value.map(|e| self.alloc(e)),
            span: self.span(),
        })
    }

    pub fn throw(&self, value: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Throw(ThrowStmt {
            value: self.alloc(value),
            span: self.span(),
        })
    }

    pub fn try_(&self, body: Block<'ast>, catches: &[CatchClause<'ast>], finally: Option<Block<'ast>>) -> Stmt<'ast> {
        Stmt::Try(self.alloc(TryStmt {
            body,
            catches: self.slice(catches),
            finally,
            span: self.span(),
        }))
    }

    pub fn catch(&self, name: &str, ty: TypeExpr<'ast>, body: Block<'ast>) -> CatchClause<'ast> {
        CatchClause {
            name: self.name(name),
            ty,
            body,
            span: self.span(),
        }
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    pub fn param(&self, name: &str, ty: TypeExpr<'ast>) -> Param<'ast> {
        Param {
            name: self.name(name),
            ty,
        }
    }

    /// Public function with a block body. Adjust the returned value's fields
    /// for other shapes.
    pub fn function(
        &self,
        name: &str,
        params: &[Param<'ast>],
        return_type: Option<TypeExpr<'ast>>,
        body: Block<'ast>,
    ) -> FunctionDecl<'ast> {
        FunctionDecl {
            name: self.name(name),
            params: self.slice(params),
            return_type,
            body: FunctionBody::Block(body),
            visibility: Visibility::Public,
            is_static: false,
            is_exported: false,
            throws: &[],
            span: self.span(),
        }
    }

    /// `fn name(params) => expr`
    pub fn expr_function(
        &self,
        name: &str,
        params: &[Param<'ast>],
        return_type: Option<TypeExpr<'ast>>,
        body: Expr<'ast>,
    ) -> FunctionDecl<'ast> {
        FunctionDecl {
            body: FunctionBody::Expr(self.alloc(body)),
            ..self.function(name, params, return_type, self.block(&[]))
        }
    }

    pub fn field(&self, name: &str, ty: TypeExpr<'ast>, init: Option<Expr<'ast>>) -> FieldDecl<'ast> {
        FieldDecl {
            name: self.name(name),
            ty: Some(ty),
            init: init.map(|e| self.alloc(e)),
            visibility: Visibility::Public,
            is_static: false,
            is_const: false,
            span: self.span(),
        }
    }

    pub fn constructor(
        &self,
        params: &[Param<'ast>],
        super_args: &[Expr<'ast>],
        body: Block<'ast>,
    ) -> ConstructorDecl<'ast> {
        ConstructorDecl {
            params: self.slice(params),
            super_args: self.slice(super_args),
            body,
            visibility: Visibility::Public,
            span: self.span(),
        }
    }

    pub fn class(
        &self,
        name: &str,
        superclass: Option<TypeExpr<'ast>>,
        fields: &[FieldDecl<'ast>],
        methods: &[FunctionDecl<'ast>],
        constructors: &[ConstructorDecl<'ast>],
    ) -> ClassDecl<'ast> {
        ClassDecl {
            name: self.name(name),
            superclass,
            interfaces: &[],
            visibility: Visibility::Public,
            fields: self.slice(fields),
            methods: self.slice(methods),
            constructors: self.slice(constructors),
            span: self.span(),
        }
    }

    /// `class` with an `implements` clause.
    pub fn implementing(&self, class: ClassDecl<'ast>, interfaces: &[TypeExpr<'ast>]) -> ClassDecl<'ast> {
        ClassDecl {
            interfaces: self.slice(interfaces),
            ..class
        }
    }

    pub fn interface(&self, name: &str, extends: &[TypeExpr<'ast>], methods: &[MethodSignature<'ast>]) -> InterfaceDecl<'ast> {
        InterfaceDecl {
            name: self.name(name),
            extends: self.slice(extends),
            visibility: Visibility::Public,
            methods: self.slice(methods),
            span: self.span(),
        }
    }

    pub fn signature(
        &self,
        name: &str,
        params: &[Param<'ast>],
        return_type: Option<TypeExpr<'ast>>,
    ) -> MethodSignature<'ast> {
        MethodSignature {
            name: self.name(name),
            params: self.slice(params),
            return_type,
            span: self.span(),
        }
    }

    pub fn global(&self, name: &str, ty: Option<TypeExpr<'ast>>, init: Option<Expr<'ast>>) -> GlobalDecl<'ast> {
        GlobalDecl {
            name: self.name(name),
            ty,
            init: init.map(|e| self.alloc(e)),
            is_const: false,
            is_exported: false,
            span: self.span(),
        }
    }

    pub fn import(&self, path: &str) -> ImportDecl<'ast> {
        ImportDecl {
            path: self.arena.alloc_str(path),
            alias: None,
            span: self.span(),
        }
    }

    pub fn function_item(&self, decl: FunctionDecl<'ast>) -> Item<'ast> {
        Item::Function(self.alloc(decl))
    }

    pub fn class_item(&self, decl: ClassDecl<'ast>) -> Item<'ast> {
        Item::Class(self.alloc(decl))
    }

    pub fn interface_item(&self, decl: InterfaceDecl<'ast>) -> Item<'ast> {
        Item::Interface(self.alloc(decl))
    }

    pub fn global_item(&self, decl: GlobalDecl<'ast>) -> Item<'ast> {
        Item::Global(self.alloc(decl))
    }

    pub fn unit(
        &self,
        name: &str,
        imports: &[ImportDecl<'ast>],
        items: &[Item<'ast>],
    ) -> CompilationUnit<'ast> {
        CompilationUnit {
            name: self.arena.alloc_str(name),
            file_name: self.arena.alloc_str(&format!("{name}.ix")),
            imports: self.slice(imports),
            items: self.slice(items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_member_chain() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let chain = b.null_safe_member(b.null_safe_member(b.ident("a"), "b"), "c");
        assert_eq!(chain.lvalue_kind(), Some(LValueKind::NullableProperty));
        match chain {
            Expr::Member(m) => assert_eq!(m.name.name, "c"),
            other => panic!("expected member, got {other:?}"),
        }
    }

    #[test]
    fn line_stamping() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let first = b.int(1);
        b.at_line(7);
        let second = b.int(2);
        assert_eq!(first.span().line, 1);
        assert_eq!(second.span().line, 7);
    }

    #[test]
    fn import_visible_name() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        assert_eq!(b.import("java.util.ArrayList").visible_name(), "ArrayList");
        assert_eq!(b.import("other").visible_name(), "other");
    }

    #[test]
    fn try_statement_shape() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let handler = b.catch("e", b.ty("Exception"), b.block(&[]));
        match b.try_(b.block(&[b.break_()]), &[handler], None) {
            Stmt::Try(t) => {
                assert_eq!(t.body.stmts.len(), 1);
                assert_eq!(t.catches[0].name.name, "e");
                assert!(t.finally.is_none());
            }
            other => panic!("expected try, got {other:?}"),
        }
    }

    #[test]
    fn array_dimensions() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        match b.new_array(b.ty("int"), &[b.int(3)], 1) {
            Expr::NewArray(a) => assert_eq!(a.dimensions(), 2),
            other => panic!("expected array, got {other:?}"),
        }
    }
}
