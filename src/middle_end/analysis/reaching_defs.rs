//! Reaching-style analysis.
//!
//! Each variable maps to the statements that read it and whose value can
//! flow backward to the current point.  The report lists those statements
//! with their source position.

use crate::front_end::pretty::stmt_to_string;

use super::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct ReachingDefs;

pub fn analyze(program: &Program) -> Result<Annotations, AnalysisError> {
    analyze_program(&ReachingDefs, program)
}

pub fn analyze_scope(program: &Program, scope: Scope) -> Result<Annotations, AnalysisError> {
    super::analyze_scope(&ReachingDefs, program, scope)
}

impl GenKill for ReachingDefs {
    const NAME: &'static str = "reaching definitions";

    fn render_entry(&self, ast: &Ast, var: &str, stmts: &Set<StmtId>) -> String {
        let defs = stmts
            .iter()
            .map(|s| format!("[{} at {}]", headline(ast, *s), ast.span(*s)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{var}: {defs}")
    }
}

// the first line of a statement's surface text.
fn headline(ast: &Ast, stmt: StmtId) -> String {
    let text = stmt_to_string(ast, stmt);
    text.lines().next().unwrap_or_default().trim().to_string()
}
