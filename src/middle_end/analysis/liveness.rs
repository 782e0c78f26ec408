//! The "live variables" analysis.
//!
//! This uses the same kill/gen table as [super::reaching_defs]: uses on the
//! right-hand side and in guards generate, assignments kill.  That is not
//! textbook liveness (a use is tagged with the statement it occurs in, and a
//! guard never feeds the statements it controls), so results differ from a
//! classical liveness solver on branching code.  Only the report differs from
//! the reaching-style analysis: it lists variable names alone.

use super::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct LiveVariables;

pub fn analyze(program: &Program) -> Result<Annotations, AnalysisError> {
    analyze_program(&LiveVariables, program)
}

pub fn analyze_scope(program: &Program, scope: Scope) -> Result<Annotations, AnalysisError> {
    super::analyze_scope(&LiveVariables, program, scope)
}

impl GenKill for LiveVariables {
    const NAME: &'static str = "live variables";

    fn render_entry(&self, _ast: &Ast, var: &str, _stmts: &Set<StmtId>) -> String {
        var.to_string()
    }
}
