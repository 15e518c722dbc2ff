//! `try`/`catch`/`finally`.
//!
//! ```text
//! start:    body
//! end:      [finally]  goto after
//! catch_i:  astore e  body_i  [finally]  goto after
//! any:      astore t  finally  aload t  athrow
//! after:
//! ```
//!
//! Every catch clause gets a table entry over `start..end`, in source order.
//! A `finally` block is inlined on each normal exit, and a catch-any entry
//! over the body and every catch body runs it before rethrowing.

use ixion_ast::{Block, CatchClause, Stmt, TryStmt};
use ixion_core::{CompilationError, SemanticType};

use super::{Result, StmtCompiler};
use crate::bytecode::{Label, Opcode};
use crate::conversion::is_assignable_from;

const THROWABLE: &str = "java/lang/Throwable";

impl<'c, 'a> StmtCompiler<'c, 'a> {
    /// Compile a `try` statement. It returns when the body and every catch
    /// clause return, or when the `finally` block does.
    pub fn compile_try(&mut self, try_stmt: &TryStmt<'_>) -> Result<()> {
        if try_stmt.catches.is_empty() && try_stmt.finally.is_none() {
            return Err(CompilationError::illegal_control_flow(
                "'try' block must have at least one catch/finally block",
                try_stmt.span,
            ));
        }
        let caught = self.catch_types(try_stmt.catches)?;
        let finally = try_stmt.finally.as_ref();

        let start = self.ctx.emitter.new_label();
        let end = self.ctx.emitter.new_label();
        let after = self.ctx.emitter.new_label();
        // Regions the catch-any handler covers.
        let mut guarded = Vec::new();

        self.ctx.emitter.mark(start);
        let code_before = self.ctx.emitter.code_len();
        let mut returns = self.compile_guarded(&Stmt::Block(try_stmt.body), finally.is_some())?;
        self.ctx.emitter.mark(end);
        let has_body = self.ctx.emitter.code_len() > code_before;
        if has_body {
            guarded.push((start, end));
        }
        if !returns {
            self.exit_normally(finally, after)?;
        }

        for (clause, ty) in try_stmt.catches.iter().zip(&caught) {
            let handler = self.ctx.emitter.new_label();
            let handler_end = self.ctx.emitter.new_label();
            if has_body {
                self.ctx
                    .emitter
                    .add_handler(start, end, handler, Some(ty.internal_name()));
            }
            self.ctx.emitter.mark(handler);
            let clause_returns = self.compile_catch(clause, ty, finally.is_some())?;
            self.ctx.emitter.mark(handler_end);
            guarded.push((handler, handler_end));
            if !clause_returns {
                self.exit_normally(finally, after)?;
            }
            returns &= clause_returns;
        }

        if let Some(block) = finally {
            let any = self.ctx.emitter.new_label();
            for (from, to) in guarded {
                self.ctx.emitter.add_handler(from, to, any, None);
            }
            self.ctx.emitter.mark(any);

            let throwable = SemanticType::reference(THROWABLE);
            self.ctx.enter_scope();
            let slot = self.ctx.scope.allocate(&throwable);
            self.ctx.emitter.store(&throwable, slot);
            let finally_returns = self.compile_nested(&Stmt::Block(*block));
            self.ctx.exit_scope();
            if !finally_returns? {
                self.ctx.emitter.load(&throwable, slot);
                self.ctx.emitter.emit(Opcode::Athrow);
            } else {
                returns = true;
            }
        }

        self.ctx.emitter.mark(after);
        if returns {
            self.ctx.scope.set_returned(true);
        }
        Ok(())
    }

    /// Resolve each caught type. It must be a `Throwable` not already
    /// caught by an earlier clause.
    fn catch_types(&mut self, catches: &[CatchClause<'_>]) -> Result<Vec<SemanticType>> {
        let resolver = self.ctx.resolver();
        let throwable = SemanticType::reference(THROWABLE);
        let mut caught: Vec<SemanticType> = Vec::with_capacity(catches.len());
        for clause in catches {
            let ty = self.ctx.resolve_type(&clause.ty)?.as_non_nullable();
            if !ty.is_reference() || !is_assignable_from(resolver, &throwable, &ty) {
                return Err(CompilationError::type_mismatch(
                    format!("Caught type must be an extension of java.lang.Throwable (got '{ty}')."),
                    clause.ty.span,
                ));
            }
            if let Some(earlier) = caught.iter().find(|earlier| is_assignable_from(resolver, earlier, &ty)) {
                return Err(CompilationError::invalid_operation(
                    format!("Exception '{ty}' has already been caught by '{earlier}'."),
                    clause.ty.span,
                ));
            }
            caught.push(ty);
        }
        Ok(caught)
    }

    /// Compile the try body or a catch body, inside a `finally` guard when
    /// one is pending. Reports whether it returned on every path.
    fn compile_guarded(&mut self, stmt: &Stmt<'_>, has_finally: bool) -> Result<bool> {
        if has_finally {
            self.ctx.loops.enter_guard();
        }
        let result = self.compile_nested(stmt);
        if has_finally {
            self.ctx.loops.exit_guard();
        }
        result
    }

    /// The handler body: the exception is stored into the clause's local,
    /// which shares its scope with the clause's statements.
    fn compile_catch(&mut self, clause: &CatchClause<'_>, ty: &SemanticType, has_finally: bool) -> Result<bool> {
        self.ctx.set_line(clause.span);
        self.ctx.enter_scope();
        let result = self.compile_catch_body(clause, ty, has_finally);
        let inner = self.ctx.exit_scope();
        result.map(|()| inner.has_returned())
    }

    fn compile_catch_body(&mut self, clause: &CatchClause<'_>, ty: &SemanticType, has_finally: bool) -> Result<()> {
        let slot = self
            .ctx
            .scope
            .declare_local(clause.name.name, ty.clone(), false, clause.name.span)?;
        self.ctx.emitter.store(ty, slot);

        if has_finally {
            self.ctx.loops.enter_guard();
        }
        let result = clause.body.stmts.iter().try_for_each(|stmt| self.compile(stmt));
        if has_finally {
            self.ctx.loops.exit_guard();
        }
        result
    }

    /// Leave the statement normally: run the `finally` block, then jump
    /// past the handlers unless it returned.
    fn exit_normally(&mut self, finally: Option<&Block<'_>>, after: Label) -> Result<()> {
        if let Some(block) = finally
            && self.compile_nested(&Stmt::Block(*block))?
        {
            return Ok(());
        }
        self.ctx.emitter.emit_jump(Opcode::Goto, after);
        Ok(())
    }
}
