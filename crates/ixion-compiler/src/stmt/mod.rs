//! Statement compiler.
//!
//! The [`StmtCompiler`] compiles statements into the method open in an
//! [`EmissionContext`]:
//! - Blocks, each in a nested scope
//! - Variable declarations, typed or inferred from the initializer
//! - `if`/`else`, with `is` narrowing inside the guarded branch
//! - `while` and `for` loops with `break`/`continue`
//! - `return` and `throw`
//! - `try`/`catch`/`finally`, with an exception table entry per handler
//!
//! Each scope tracks whether every path through it has returned, so that
//! [`compile_body`] can reject a non-void body that falls off its end.
//!
//! # Example
//!
//! ```ignore
//! let mut compiler = StmtCompiler::new(&mut ctx);
//! compiler.compile(&stmt)?;
//! ```

mod block;
mod for_stmt;
mod if_stmt;
mod return_stmt;
mod try_stmt;
mod var_decl;
mod while_stmt;

use ixion_ast::{Block, Stmt};
use ixion_core::{CompilationError, Span};

use crate::bytecode::Opcode;
use crate::context::EmissionContext;
use crate::expr::ExprCompiler;

type Result<T> = std::result::Result<T, CompilationError>;

/// Compiles statements into the method open in a context.
pub struct StmtCompiler<'c, 'a> {
    ctx: &'c mut EmissionContext<'a>,
}

impl<'c, 'a> StmtCompiler<'c, 'a> {
    pub fn new(ctx: &'c mut EmissionContext<'a>) -> Self {
        Self { ctx }
    }

    /// Compile a statement.
    pub fn compile(&mut self, stmt: &Stmt<'_>) -> Result<()> {
        self.ctx.set_line(stmt.span());

        match stmt {
            Stmt::Expr(expr_stmt) => self.expr_compiler().discard(expr_stmt.expr),
            Stmt::VarDecl(decl) => self.compile_var_decl(decl),
            Stmt::Block(block) => self.compile_block(block),
            Stmt::If(if_stmt) => self.compile_if(if_stmt),
            Stmt::While(while_stmt) => self.compile_while(while_stmt),
            Stmt::For(for_stmt) => self.compile_for(for_stmt),
            Stmt::Break(span) => self.compile_jump(true, *span),
            Stmt::Continue(span) => self.compile_jump(false, *span),
            Stmt::Return(ret) => self.compile_return(ret),
            Stmt::Throw(throw) => self.compile_throw(throw),
            Stmt::Try(try_stmt) => self.compile_try(try_stmt),
        }
    }

    /// `break` jumps past the innermost loop, `continue` to its next
    /// iteration.
    fn compile_jump(&mut self, is_break: bool, span: Span) -> Result<()> {
        let Some(labels) = self.ctx.loops.current() else {
            return Err(CompilationError::illegal_control_flow(
                "Uses of 'break' or 'continue' without cycle",
                span,
            ));
        };
        if self.ctx.loops.jump_crosses_guard() {
            return Err(CompilationError::illegal_control_flow(
                "Cannot leave a 'try' block with a 'finally' clause through 'break' or 'continue'",
                span,
            ));
        }
        let target = if is_break { labels.end } else { labels.start };
        self.ctx.emitter.emit_jump(Opcode::Goto, target);
        Ok(())
    }

    fn expr_compiler(&mut self) -> ExprCompiler<'_, 'a> {
        ExprCompiler::new(self.ctx)
    }
}

/// Compile the statements of a method body into its own scope.
///
/// A body that can complete normally gets an implicit `return` when the
/// method is void, and is a `MissingReturn` error otherwise.
///
/// # Arguments
///
/// * `ctx` - Context whose scope already holds the parameters
/// * `body` - The body block
/// * `name` - Method name, for diagnostics
/// * `span` - Declaration site
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile_body(ctx: &mut EmissionContext<'_>, body: &Block<'_>, name: &str, span: Span) -> Result<()> {
    let mut compiler = StmtCompiler::new(ctx);
    for stmt in body.stmts {
        compiler.compile(stmt)?;
    }
    if ctx.scope.has_returned() {
        return Ok(());
    }
    match ctx.scope.return_type() {
        Some(ty) if !ty.is_void() => Err(CompilationError::MissingReturn {
            name: name.to_string(),
            span,
        }),
        _ => {
            ctx.emitter.emit(Opcode::Return);
            Ok(())
        }
    }
}
