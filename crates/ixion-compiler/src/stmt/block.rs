//! Block statements.

use ixion_ast::{Block, Stmt};

use super::{Result, StmtCompiler};

impl<'c, 'a> StmtCompiler<'c, 'a> {
    /// Compile a block in a nested scope. A block that returns on every
    /// path makes its enclosing scope return too.
    pub fn compile_block(&mut self, block: &Block<'_>) -> Result<()> {
        self.ctx.enter_scope();
        for stmt in block.stmts {
            self.compile(stmt)?;
        }
        let inner = self.ctx.exit_scope();
        if inner.has_returned() {
            self.ctx.scope.set_returned(true);
        }
        Ok(())
    }

    /// Compile one branch or loop body in a nested scope and report whether
    /// it returned on every path.
    pub(super) fn compile_nested(&mut self, stmt: &Stmt<'_>) -> Result<bool> {
        self.ctx.enter_scope();
        let result = self.compile(stmt);
        let inner = self.ctx.exit_scope();
        result.map(|()| inner.has_returned())
    }
}
