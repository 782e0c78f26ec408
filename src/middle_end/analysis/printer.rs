// annotated report: every analysed statement between its IN and OUT values.

use std::io::{self, Write};

use crate::front_end::pretty::stmt_to_string;

use super::*;

pub struct Printer<'a, A: GenKill> {
    analysis: &'a A,
    program: &'a Program,
    annotations: &'a Annotations,
}

impl<'a, A: GenKill> Printer<'a, A> {
    pub fn new(analysis: &'a A, program: &'a Program, annotations: &'a Annotations) -> Self {
        Printer {
            analysis,
            program,
            annotations,
        }
    }

    /// Writes the report for every scope, in program order.  Statements with
    /// no recorded values print nothing, but their bodies are still visited.
    pub fn print(&self, out: &mut impl Write) -> io::Result<()> {
        for scope in self.program.scopes() {
            if let Some(body) = self.program.scope_body(scope) {
                self.block(body, out)?;
            }
        }
        Ok(())
    }

    fn block(&self, block: BlockId, out: &mut impl Write) -> io::Result<()> {
        let ast = &self.program.ast;
        for stmt in ast.block(block) {
            if let (Some(in_flow), Some(out_flow)) =
                (self.annotations.in_of(*stmt), self.annotations.out_of(*stmt))
            {
                writeln!(out, "in {{")?;
                self.entries(in_flow, out)?;
                writeln!(out, "}}")?;
                writeln!(out, "{}", stmt_to_string(ast, *stmt))?;
                writeln!(out, "out {{")?;
                self.entries(out_flow, out)?;
                writeln!(out, "}}")?;
                writeln!(out)?;
            }
            for body in ast.child_blocks(*stmt) {
                self.block(body, out)?;
            }
        }
        Ok(())
    }

    fn entries(&self, flow: &FlowValue, out: &mut impl Write) -> io::Result<()> {
        for (var, stmts) in flow.iter() {
            writeln!(
                out,
                "{}",
                self.analysis.render_entry(&self.program.ast, var, stmts)
            )?;
        }
        Ok(())
    }
}

// the report as a string.
pub fn report<A: GenKill>(analysis: &A, program: &Program, annotations: &Annotations) -> String {
    let mut buf = vec![];
    // writing to a vector cannot fail.
    let _ = Printer::new(analysis, program, annotations).print(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
