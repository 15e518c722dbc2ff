//! `for` loops.

use ixion_ast::ForStmt;

use super::{Result, StmtCompiler};
use crate::bytecode::Opcode;

impl<'c, 'a> StmtCompiler<'c, 'a> {
    /// Compile `for (init; condition; update) body`.
    ///
    /// The initializer's variables are scoped to the loop. `continue` jumps
    /// to the update, not to the condition.
    pub fn compile_for(&mut self, for_stmt: &ForStmt<'_>) -> Result<()> {
        self.ctx.enter_scope();
        let result = self.compile_for_in_scope(for_stmt);
        self.ctx.exit_scope();
        result
    }

    fn compile_for_in_scope(&mut self, for_stmt: &ForStmt<'_>) -> Result<()> {
        if let Some(init) = &for_stmt.init {
            self.compile(init)?;
        }

        let condition = self.ctx.emitter.new_label();
        let step = self.ctx.emitter.new_label();
        let end = self.ctx.emitter.new_label();

        self.ctx.emitter.mark(condition);
        if let Some(cond) = &for_stmt.condition {
            self.expr_compiler().condition(cond, end)?;
        }

        self.ctx.loops.enter_loop(step, end);
        let body = self.compile_nested(&for_stmt.body);
        self.ctx.loops.exit_loop();
        body?;

        self.ctx.emitter.mark(step);
        if let Some(update) = &for_stmt.update {
            self.expr_compiler().discard(update)?;
        }
        self.ctx.emitter.emit_jump(Opcode::Goto, condition);
        self.ctx.emitter.mark(end);
        Ok(())
    }
}
