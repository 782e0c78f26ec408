// builders for the counter statements injected by instrumentation.  Injected
// statements carry the default (0, 0) span.

use crate::front_end::*;

pub fn func_counter(scope: &str) -> String {
    format!("{scope}_func")
}

pub fn loop_counter(scope: &str, n: u32) -> String {
    format!("{scope}_loop_{n}")
}

// `name = 0;`
pub fn init(ast: &mut Ast, name: &str) -> StmtId {
    let lhs = ast.add_expr(Expr::Name(name.to_string()));
    let rhs = ast.add_expr(Expr::Num("0".to_string()));
    ast.add_stmt(
        Stmt::Assign {
            lhs,
            rhs,
            quiet: true,
        },
        Span::default(),
    )
}

// `name = name + 1;`
pub fn increment(ast: &mut Ast, name: &str) -> StmtId {
    let lhs = ast.add_expr(Expr::Name(name.to_string()));
    let current = ast.add_expr(Expr::Name(name.to_string()));
    let one = ast.add_expr(Expr::Num("1".to_string()));
    let rhs = ast.add_expr(Expr::Binary(current, BinaryOp::Add, one));
    ast.add_stmt(
        Stmt::Assign {
            lhs,
            rhs,
            quiet: true,
        },
        Span::default(),
    )
}

// `fprintf('%s %d\n', 'name', name);`, which prints `name value` on a line.
pub fn display(ast: &mut Ast, name: &str) -> StmtId {
    let head = ast.add_expr(Expr::Name("fprintf".to_string()));
    let format = ast.add_expr(Expr::Str {
        text: "%s %d\\n".to_string(),
        double: false,
    });
    let label = ast.add_expr(Expr::Str {
        text: name.to_string(),
        double: false,
    });
    let value = ast.add_expr(Expr::Name(name.to_string()));
    let call = ast.add_expr(Expr::Param {
        head,
        args: vec![format, label, value],
    });
    ast.add_stmt(
        Stmt::Expr {
            expr: call,
            quiet: true,
        },
        Span::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::pretty::stmt_to_string;

    #[test]
    fn counter_statements() {
        let mut ast = Ast::new();
        let name = loop_counter("script", 3);
        assert_eq!(name, "script_loop_3");

        let s = init(&mut ast, &name);
        assert_eq!(stmt_to_string(&ast, s), "script_loop_3 = 0;");
        let s = increment(&mut ast, &func_counter("f"));
        assert_eq!(stmt_to_string(&ast, s), "f_func = f_func + 1;");
        let s = display(&mut ast, "f_func");
        assert_eq!(
            stmt_to_string(&ast, s),
            r"fprintf('%s %d\n', 'f_func', f_func);"
        );
        // injected statements start out detached.
        assert_eq!(ast.parent_block(s), None);
    }
}
