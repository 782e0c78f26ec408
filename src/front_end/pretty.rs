// pretty-printer producing surface syntax.
//
// Expressions get the fewest parentheses their precedence allows; matrix
// elements are always separated by commas so the output never depends on
// whitespace-sensitive parsing.

use std::fmt::Write;

use super::*;

const INDENT: &str = "  ";

pub fn expr_to_string(ast: &Ast, expr: ExprId) -> String {
    let mut out = String::new();
    write_expr(ast, expr, &mut out);
    out
}

/// Renders a statement; compound statements span several lines, with their
/// bodies indented.
pub fn stmt_to_string(ast: &Ast, stmt: StmtId) -> String {
    let mut out = String::new();
    write_stmt(ast, stmt, 0, &mut out);
    out.truncate(out.trim_end().len());
    out
}

pub fn program_to_string(program: &Program) -> String {
    let mut out = String::new();
    if let Some(script) = program.script {
        write_block(&program.ast, script, 0, &mut out);
    }
    for f in &program.functions {
        write_function(&program.ast, *f, 0, &mut out);
    }
    out
}

// SECTION: statements

fn write_line(out: &mut String, indent: usize, text: &str) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn write_block(ast: &Ast, block: BlockId, indent: usize, out: &mut String) {
    for stmt in ast.block(block) {
        write_stmt(ast, *stmt, indent, out);
    }
}

fn with_semicolon(text: String, quiet: bool) -> String {
    if quiet {
        text + ";"
    } else {
        text
    }
}

fn write_stmt(ast: &Ast, stmt: StmtId, indent: usize, out: &mut String) {
    let e = |id| expr_to_string(ast, id);
    match ast.stmt(stmt) {
        Stmt::Expr { expr, quiet: q } => write_line(out, indent, &with_semicolon(e(*expr), *q)),
        Stmt::Assign { lhs, rhs, quiet: q } => {
            write_line(out, indent, &with_semicolon(format!("{} = {}", e(*lhs), e(*rhs)), *q))
        }
        Stmt::If { clauses, else_body } => {
            for (i, clause) in clauses.iter().enumerate() {
                let keyword = if i == 0 { "if" } else { "elseif" };
                write_line(out, indent, &format!("{keyword} {}", e(clause.cond)));
                write_block(ast, clause.body, indent + 1, out);
            }
            if let Some(body) = else_body {
                write_line(out, indent, "else");
                write_block(ast, *body, indent + 1, out);
            }
            write_line(out, indent, "end");
        }
        Stmt::Switch {
            subject,
            cases,
            otherwise,
        } => {
            write_line(out, indent, &format!("switch {}", e(*subject)));
            for case in cases {
                write_line(out, indent + 1, &format!("case {}", e(case.label)));
                write_block(ast, case.body, indent + 2, out);
            }
            if let Some(body) = otherwise {
                write_line(out, indent + 1, "otherwise");
                write_block(ast, *body, indent + 2, out);
            }
            write_line(out, indent, "end");
        }
        Stmt::For { var, range, body } => {
            write_line(out, indent, &format!("for {var} = {}", e(*range)));
            write_block(ast, *body, indent + 1, out);
            write_line(out, indent, "end");
        }
        Stmt::While { cond, body } => {
            write_line(out, indent, &format!("while {}", e(*cond)));
            write_block(ast, *body, indent + 1, out);
            write_line(out, indent, "end");
        }
        Stmt::Break => write_line(out, indent, "break"),
        Stmt::Continue => write_line(out, indent, "continue"),
        Stmt::Return => write_line(out, indent, "return"),
        Stmt::Global(names) => write_line(out, indent, &format!("global {}", names.join(" "))),
        Stmt::Persistent(names) => {
            write_line(out, indent, &format!("persistent {}", names.join(" ")))
        }
    }
}

fn write_function(ast: &Ast, func: FuncId, indent: usize, out: &mut String) {
    let f = ast.function(func);
    let outputs = match f.outputs.len() {
        0 => String::new(),
        1 => format!("{} = ", f.outputs[0]),
        _ => format!("[{}] = ", f.outputs.join(", ")),
    };
    write_line(
        out,
        indent,
        &format!("function {outputs}{}({})", f.name, f.inputs.join(", ")),
    );
    write_block(ast, f.body, indent + 1, out);
    for nested in &f.nested {
        write_function(ast, *nested, indent + 1, out);
    }
    write_line(out, indent, "end");
}

// SECTION: expressions

// binding strength of the operator at the root of `expr`; atoms bind tightest.
fn precedence(ast: &Ast, expr: ExprId) -> u8 {
    use BinaryOp::*;

    match ast.expr(expr) {
        Expr::Binary(_, op, _) => match op {
            ShortOr => 0,
            ShortAnd => 1,
            ElOr => 2,
            ElAnd => 3,
            Eq | NotEq | Lt | Lte | Gt | Gte => 4,
            Add | Sub => 6,
            MatMul | MatDiv | MatLeftDiv | ElMul | ElDiv | ElLeftDiv => 7,
            MatPow | ElPow => 9,
        },
        Expr::Range { .. } => 5,
        Expr::Unary(..) => 8,
        _ => 10,
    }
}

// writes `expr`, parenthesised if it binds looser than `min`.
fn write_operand(ast: &Ast, expr: ExprId, min: u8, out: &mut String) {
    if precedence(ast, expr) < min {
        out.push('(');
        write_expr(ast, expr, out);
        out.push(')');
    } else {
        write_expr(ast, expr, out);
    }
}

fn write_list(ast: &Ast, exprs: &[ExprId], out: &mut String) {
    for (i, arg) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(ast, *arg, out);
    }
}

fn write_rows(ast: &Ast, rows: &[Vec<ExprId>], out: &mut String) {
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        write_list(ast, row, out);
    }
}

fn write_expr(ast: &Ast, expr: ExprId, out: &mut String) {
    match ast.expr(expr) {
        Expr::Num(n) => out.push_str(n),
        Expr::Str {
            text,
            double: false,
        } => {
            let _ = write!(out, "'{}'", text.replace('\'', "''"));
        }
        Expr::Str { text, double: true } => {
            let _ = write!(out, "\"{}\"", text.replace('"', "\"\""));
        }
        Expr::Name(n) => out.push_str(n),
        Expr::Colon => out.push(':'),
        Expr::End => out.push_str("end"),
        Expr::Param { head, args } => {
            write_operand(ast, *head, 10, out);
            out.push('(');
            write_list(ast, args, out);
            out.push(')');
        }
        Expr::CellIndex { head, args } => {
            write_operand(ast, *head, 10, out);
            out.push('{');
            write_list(ast, args, out);
            out.push('}');
        }
        Expr::Field { base, field } => {
            write_operand(ast, *base, 10, out);
            out.push('.');
            out.push_str(field);
        }
        Expr::Matrix(rows) => {
            out.push('[');
            write_rows(ast, rows, out);
            out.push(']');
        }
        Expr::Cell(rows) => {
            out.push('{');
            write_rows(ast, rows, out);
            out.push('}');
        }
        Expr::Unary(op, operand) => {
            let _ = write!(out, "{op}");
            write_operand(ast, *operand, 8, out);
        }
        Expr::Postfix(op, operand) => {
            write_operand(ast, *operand, 10, out);
            let _ = write!(out, "{op}");
        }
        Expr::Binary(lhs, op, rhs) => {
            let p = precedence(ast, expr);
            write_operand(ast, *lhs, p, out);
            let _ = write!(out, " {op} ");
            write_operand(ast, *rhs, p + 1, out);
        }
        Expr::Range { start, step, stop } => {
            write_operand(ast, *start, 6, out);
            if let Some(step) = step {
                out.push(':');
                write_operand(ast, *step, 6, out);
            }
            out.push(':');
            write_operand(ast, *stop, 6, out);
        }
    }
}
