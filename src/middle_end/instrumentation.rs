//! Instrumentation: injects counters that record, at run time, how often each
//! scope is entered, each loop body runs and each call site is evaluated.
//!
//! For a scope named `s` (`script`, or the function name):
//!
//! - `s_func` is zeroed as the first statement of the body and displayed as
//!   the last one, and before every `return`;
//! - `s_func` is incremented before every statement that evaluates a call;
//! - every loop gets a counter `s_loop_N`, zeroed before the loop, incremented
//!   as the first statement of its body and displayed after the loop.  `N`
//!   counts loops across the whole program, starting at 1.
//!
//! Statements and expressions that were injected or already handled are kept
//! in skip sets so that the walk over the mutated tree never instruments
//! them again.  The statement skip set is cleared at the end of each scope.

use derive_more::Display;
use tracing::{debug, info};

use crate::front_end::kinds::{self, KindAnalysis};
use crate::front_end::*;

pub mod counters;

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InstrumentOptions {
    // build a name-kind classifier per scope; without one no name is a
    // function, so calls are never charged.
    pub classify_calls: bool,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        InstrumentOptions {
            classify_calls: true,
        }
    }
}

/// What an instrumentation run inserted.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
#[display(
    fmt = "{} scopes, {} loop counters, {} call increments, {} return displays",
    scopes,
    loops,
    calls,
    returns
)]
pub struct InstrumentReport {
    pub scopes: usize,
    pub loops: usize,
    pub calls: usize,
    pub returns: usize,
}

/// Instruments every scope of `program` in place.
pub fn instrument(
    program: &mut Program,
    options: &InstrumentOptions,
) -> Result<InstrumentReport, AstError> {
    let mut rewriter = Rewriter::new(program, *options);
    for scope in rewriter.program.scopes() {
        rewriter.scope(scope)?;
    }
    info!(report = %rewriter.report, "instrumentation finished");
    Ok(rewriter.report)
}

// the scope being instrumented.
struct ScopeCtx {
    name: String,
    kinds: Option<KindAnalysis>,
}

impl ScopeCtx {
    fn is_function(&self, name: &str) -> bool {
        kinds::is_function(self.kinds.as_ref(), name)
    }

    fn func_counter(&self) -> String {
        counters::func_counter(&self.name)
    }
}

struct Rewriter<'a> {
    program: &'a mut Program,
    options: InstrumentOptions,
    // the number of the next loop counter.
    next_loop: u32,
    skip_stmts: Set<StmtId>,
    skip_exprs: Set<ExprId>,
    report: InstrumentReport,
}

impl<'a> Rewriter<'a> {
    fn new(program: &'a mut Program, options: InstrumentOptions) -> Self {
        Rewriter {
            program,
            options,
            next_loop: 1,
            skip_stmts: Set::new(),
            skip_exprs: Set::new(),
            report: InstrumentReport::default(),
        }
    }

    fn scope(&mut self, scope: Scope) -> Result<(), AstError> {
        let Some(body) = self.program.scope_body(scope) else {
            return Ok(());
        };
        let ctx = ScopeCtx {
            name: self.program.scope_name(scope).to_string(),
            kinds: self
                .options
                .classify_calls
                .then(|| KindAnalysis::of(self.program, scope)),
        };
        debug!(scope = %ctx.name, "instrumenting scope");

        let counter = ctx.func_counter();
        let init = self.inject(counters::init, &counter);
        self.program.ast.insert_stmt(body, 0, init);
        let display = self.inject(counters::display, &counter);
        self.program.ast.push_stmt(body, display);

        self.block(body, &ctx)?;
        self.skip_stmts.clear();
        self.report.scopes += 1;
        Ok(())
    }

    // builds a counter statement and marks it, and everything in it, as
    // processed.
    fn inject(&mut self, build: fn(&mut Ast, &str) -> StmtId, name: &str) -> StmtId {
        let ast = &mut self.program.ast;
        let stmt = build(ast, name);
        self.skip_stmts.insert(stmt);
        for expr in ast.stmt_exprs(stmt) {
            self.skip_exprs.extend(ast.exprs_within(expr));
        }
        stmt
    }

    fn block(&mut self, block: BlockId, ctx: &ScopeCtx) -> Result<(), AstError> {
        // statements inserted during the walk are in the skip set already.
        let stmts = self.program.ast.block(block).to_vec();
        for stmt in stmts {
            self.stmt(stmt, ctx)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: StmtId, ctx: &ScopeCtx) -> Result<(), AstError> {
        if self.skip_stmts.contains(&stmt) {
            return Ok(());
        }

        match self.program.ast.stmt(stmt) {
            Stmt::For { .. } | Stmt::While { .. } => {
                self.skip_stmts.insert(stmt);
                self.instrument_loop(stmt, ctx)?;
                self.charge_calls(stmt, ctx)?;
                self.children(stmt, ctx)
            }
            Stmt::If { .. } | Stmt::Switch { .. } => {
                self.charge_calls(stmt, ctx)?;
                self.children(stmt, ctx)
            }
            Stmt::Assign { rhs, .. } => {
                self.skip_stmts.insert(stmt);
                let calls = self
                    .program
                    .ast
                    .name_exprs(*rhs)
                    .into_iter()
                    .any(|n| ctx.is_function(n));
                if calls {
                    self.charge(stmt, ctx)?;
                }
                Ok(())
            }
            Stmt::Return => {
                self.skip_stmts.insert(stmt);
                let display = self.inject(counters::display, &ctx.func_counter());
                self.program.ast.insert_before(stmt, display)?;
                self.report.returns += 1;
                Ok(())
            }
            Stmt::Expr { .. } => self.charge_calls(stmt, ctx),
            Stmt::Break | Stmt::Continue | Stmt::Global(_) | Stmt::Persistent(_) => Ok(()),
        }
    }

    fn children(&mut self, stmt: StmtId, ctx: &ScopeCtx) -> Result<(), AstError> {
        for body in self.program.ast.child_blocks(stmt) {
            self.block(body, ctx)?;
        }
        Ok(())
    }

    fn instrument_loop(&mut self, stmt: StmtId, ctx: &ScopeCtx) -> Result<(), AstError> {
        let Some(body) = self.program.ast.stmt(stmt).loop_body() else {
            return Ok(());
        };
        let counter = counters::loop_counter(&ctx.name, self.next_loop);
        self.next_loop += 1;
        debug!(%counter, "loop counter");

        let init = self.inject(counters::init, &counter);
        self.program.ast.insert_before(stmt, init)?;
        let increment = self.inject(counters::increment, &counter);
        self.program.ast.insert_stmt(body, 0, increment);
        let display = self.inject(counters::display, &counter);
        self.program.ast.insert_after(stmt, display)?;
        self.report.loops += 1;
        Ok(())
    }

    // charges every unprocessed call site directly in `stmt` (its own
    // expressions, not those of nested statements).
    fn charge_calls(&mut self, stmt: StmtId, ctx: &ScopeCtx) -> Result<(), AstError> {
        let ast = &self.program.ast;
        let calls: Vec<ExprId> = ast
            .stmt_exprs(stmt)
            .into_iter()
            .flat_map(|e| ast.exprs_within(e))
            .filter(|e| !self.skip_exprs.contains(e))
            .filter(|e| ast.call_head(*e).map_or(false, |head| ctx.is_function(head)))
            .collect();
        for call in calls {
            self.skip_exprs.insert(call);
            self.charge(stmt, ctx)?;
        }
        Ok(())
    }

    // increments the scope's call counter right before `stmt`.
    fn charge(&mut self, stmt: StmtId, ctx: &ScopeCtx) -> Result<(), AstError> {
        let increment = self.inject(counters::increment, &ctx.func_counter());
        self.program.ast.insert_before(stmt, increment)?;
        self.report.calls += 1;
        Ok(())
    }
}
