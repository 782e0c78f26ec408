//! Name-kind classification.
//!
//! A name in this language can refer to a variable or to a function, and the
//! syntax does not tell the two apart: `a(i)` indexes an array if `a` is a
//! variable and calls a function otherwise.  [KindAnalysis] settles this for
//! one scope at a time, flow-insensitively:
//!
//! - a name bound anywhere in the scope (assigned, a loop variable, a
//!   parameter, or declared global/persistent) is a [Kind::Variable];
//! - otherwise, a name defined as a function in the program, a builtin, or
//!   used with call syntax is a [Kind::Function].  Arguments using `end` or
//!   a lone `:` can only index, so such a use is not call syntax;
//! - any other name is [Kind::Unknown].

use derive_more::Display;
use tracing::debug;

use super::*;

// builtin functions that are commonly called without arguments or whose
// calls look like plain names.
const BUILTINS: &[&str] = &[
    "abs", "all", "any", "ceil", "cell", "cos", "cumsum", "diag", "disp", "eps", "error", "exp",
    "eye", "false", "fieldnames", "find", "floor", "fprintf", "Inf", "inf", "input", "inv",
    "isempty", "isequal", "length", "linspace", "log", "max", "mean", "min", "mod", "NaN", "nan",
    "num2str", "numel", "ones", "pi", "prod", "rand", "randn", "rem", "repmat", "reshape",
    "round", "sin", "size", "sort", "sprintf", "sqrt", "std", "str2num", "strcat", "struct",
    "sum", "tan", "tic", "toc", "true", "warning", "zeros",
];

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Kind {
    #[display(fmt = "var")]
    Variable,
    #[display(fmt = "fun")]
    Function,
    #[display(fmt = "unknown")]
    Unknown,
}

/// The kinds of all names occurring in one scope.
#[derive(Clone, Debug, Default)]
pub struct KindAnalysis {
    kinds: Map<String, Kind>,
}

impl KindAnalysis {
    pub fn of(program: &Program, scope: Scope) -> Self {
        let ast = &program.ast;
        let mut bound = Set::new();
        let mut called = Set::new();
        let mut names = Set::new();

        if let Scope::Function(f) = scope {
            let f = ast.function(f);
            bound.extend(f.inputs.iter().chain(&f.outputs).filter(|n| *n != "~").cloned());
        }

        let stmts = match program.scope_body(scope) {
            Some(body) => ast.stmts_within(body),
            None => vec![],
        };
        for stmt in stmts {
            // an ill-formed target binds nothing; the analyses report it.
            if let Ok(lvalues) = ast.lvalues(stmt) {
                bound.extend(lvalues);
            }
            if let Stmt::Global(vars) | Stmt::Persistent(vars) = ast.stmt(stmt) {
                bound.extend(vars.iter().cloned());
            }
            for expr in ast.stmt_exprs(stmt) {
                for e in ast.exprs_within(expr) {
                    if let Expr::Param { args, .. } = ast.expr(e) {
                        match ast.call_head(e) {
                            Some(head) if !indexes_only(ast, args) => {
                                called.insert(head.to_string());
                            }
                            _ => {}
                        }
                    }
                    if let Expr::Name(n) = ast.expr(e) {
                        names.insert(n.clone());
                    }
                }
            }
        }

        let functions = program.function_names();
        let kinds: Map<String, Kind> = names
            .into_iter()
            .chain(bound.iter().cloned())
            .map(|name| {
                let kind = if bound.contains(&name) {
                    Kind::Variable
                } else if functions.contains(&name)
                    || BUILTINS.contains(&name.as_str())
                    || called.contains(&name)
                {
                    Kind::Function
                } else {
                    Kind::Unknown
                };
                (name, kind)
            })
            .collect();

        debug!(
            scope = program.scope_name(scope),
            names = kinds.len(),
            "classified names"
        );
        KindAnalysis { kinds }
    }

    pub fn kind(&self, name: &str) -> Kind {
        self.kinds.get(name).copied().unwrap_or(Kind::Unknown)
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.kind(name) == Kind::Function
    }
}

// whether the arguments of `name(args)` use `end` or a lone `:` at this level
// (not inside a nested index or call).
fn indexes_only(ast: &Ast, args: &[ExprId]) -> bool {
    let mut stack = args.to_vec();
    while let Some(e) = stack.pop() {
        match ast.expr(e) {
            Expr::End | Expr::Colon => return true,
            Expr::Param { .. } | Expr::CellIndex { .. } => {}
            _ => stack.extend(ast.sub_exprs(e)),
        }
    }
    false
}

/// Whether `name` denotes a function.  Without a classifier every name is
/// treated as a non-function.
pub fn is_function(kinds: Option<&KindAnalysis>, name: &str) -> bool {
    kinds.map_or(false, |k| k.is_function(name))
}
