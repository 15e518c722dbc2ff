//! `while` loops.

use ixion_ast::WhileStmt;

use super::{Result, StmtCompiler};
use crate::bytecode::Opcode;

impl<'c, 'a> StmtCompiler<'c, 'a> {
    pub fn compile_while(&mut self, while_stmt: &WhileStmt<'_>) -> Result<()> {
        let start = self.ctx.emitter.new_label();
        let end = self.ctx.emitter.new_label();

        self.ctx.emitter.mark(start);
        self.expr_compiler().condition(&while_stmt.condition, end)?;

        self.ctx.loops.enter_loop(start, end);
        let body = self.compile_nested(&while_stmt.body);
        self.ctx.loops.exit_loop();
        body?;

        self.ctx.emitter.emit_jump(Opcode::Goto, start);
        self.ctx.emitter.mark(end);
        Ok(())
    }
}
