// arena-backed syntax tree.
//
// Nodes are referred to by stable integer handles.  Statements can be inserted
// into any statement list without invalidating handles held elsewhere, which
// is what lets the instrumentation pass rewrite a tree while keeping
// identity-keyed tables about it.

use arbitrary::Arbitrary;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::commons::{Set, Span};

// SECTION: handles

#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    Arbitrary,
)]
#[display(fmt = "s{}", _0)]
pub struct StmtId(pub u32);

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[display(fmt = "e{}", _0)]
pub struct ExprId(pub u32);

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[display(fmt = "b{}", _0)]
pub struct BlockId(pub u32);

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[display(fmt = "f{}", _0)]
pub struct FuncId(pub u32);

// SECTION: nodes

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
pub enum UnaryOp {
    #[display(fmt = "-")]
    Neg,
    #[display(fmt = "+")]
    Plus,
    #[display(fmt = "~")]
    Not,
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
pub enum PostfixOp {
    #[display(fmt = "'")]
    CTranspose,
    #[display(fmt = ".'")]
    Transpose,
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
pub enum BinaryOp {
    #[display(fmt = "+")]
    Add,
    #[display(fmt = "-")]
    Sub,
    #[display(fmt = "*")]
    MatMul,
    #[display(fmt = "/")]
    MatDiv,
    #[display(fmt = "\\")]
    MatLeftDiv,
    #[display(fmt = "^")]
    MatPow,
    #[display(fmt = ".*")]
    ElMul,
    #[display(fmt = "./")]
    ElDiv,
    #[display(fmt = ".\\")]
    ElLeftDiv,
    #[display(fmt = ".^")]
    ElPow,
    #[display(fmt = "==")]
    Eq,
    #[display(fmt = "~=")]
    NotEq,
    #[display(fmt = "<")]
    Lt,
    #[display(fmt = "<=")]
    Lte,
    #[display(fmt = ">")]
    Gt,
    #[display(fmt = ">=")]
    Gte,
    #[display(fmt = "&")]
    ElAnd,
    #[display(fmt = "|")]
    ElOr,
    #[display(fmt = "&&")]
    ShortAnd,
    #[display(fmt = "||")]
    ShortOr,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    // number literal, kept as written.
    Num(String),
    // string literal contents; `double` is true for "..." strings.
    Str { text: String, double: bool },
    Name(String),
    // magic colon in an index, as in `a(:)`.
    Colon,
    // `end` in an index, as in `a(end)`.
    End,
    // a(x, y): either an array index or a function call.
    Param { head: ExprId, args: Vec<ExprId> },
    // c{x}
    CellIndex { head: ExprId, args: Vec<ExprId> },
    // s.f
    Field { base: ExprId, field: String },
    Matrix(Vec<Vec<ExprId>>),
    Cell(Vec<Vec<ExprId>>),
    Unary(UnaryOp, ExprId),
    Postfix(PostfixOp, ExprId),
    Binary(ExprId, BinaryOp, ExprId),
    Range {
        start: ExprId,
        step: Option<ExprId>,
        stop: ExprId,
    },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IfClause {
    pub cond: ExprId,
    pub body: BlockId,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub label: ExprId,
    pub body: BlockId,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr {
        expr: ExprId,
        quiet: bool,
    },
    Assign {
        lhs: ExprId,
        rhs: ExprId,
        quiet: bool,
    },
    If {
        clauses: Vec<IfClause>,
        else_body: Option<BlockId>,
    },
    Switch {
        subject: ExprId,
        cases: Vec<SwitchCase>,
        otherwise: Option<BlockId>,
    },
    For {
        var: String,
        range: ExprId,
        body: BlockId,
    },
    While {
        cond: ExprId,
        body: BlockId,
    },
    Break,
    Continue,
    Return,
    Global(Vec<String>),
    Persistent(Vec<String>),
}

impl Stmt {
    pub fn is_loop(&self) -> bool {
        matches!(self, Stmt::For { .. } | Stmt::While { .. })
    }

    // the body of a loop statement.
    pub fn loop_body(&self) -> Option<BlockId> {
        match self {
            Stmt::For { body, .. } | Stmt::While { body, .. } => Some(*body),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StmtNode {
    pub kind: Stmt,
    pub span: Span,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub body: BlockId,
    pub nested: Vec<FuncId>,
    pub span: Span,
}

// SECTION: errors

/// A tree that does not have the shape a query expects.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum AstError {
    #[display(fmt = "ill-formed assignment target `{}` at {}", _1, _0)]
    IllFormedLvalue(Span, String),
    #[display(fmt = "statement {} is not in any statement list", _0)]
    Detached(StmtId),
}
impl std::error::Error for AstError {}

// SECTION: the arena

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    stmts: Vec<StmtNode>,
    exprs: Vec<Expr>,
    blocks: Vec<Vec<StmtId>>,
    // the statement list each statement currently belongs to.
    parents: Vec<Option<BlockId>>,
    functions: Vec<Function>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0 as usize].kind
    }

    pub fn span(&self, id: StmtId) -> Span {
        self.stmts[id.0 as usize].span
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn block(&self, id: BlockId) -> &[StmtId] {
        &self.blocks[id.0 as usize]
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn num_stmts(&self) -> usize {
        self.stmts.len()
    }

    pub fn parent_block(&self, id: StmtId) -> Option<BlockId> {
        self.parents[id.0 as usize]
    }

    pub fn add_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.push(expr);
        ExprId(self.exprs.len() as u32 - 1)
    }

    // adds a statement that does not belong to any list yet.
    pub fn add_stmt(&mut self, kind: Stmt, span: Span) -> StmtId {
        self.stmts.push(StmtNode { kind, span });
        self.parents.push(None);
        StmtId(self.stmts.len() as u32 - 1)
    }

    pub fn add_block(&mut self, stmts: Vec<StmtId>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        for s in &stmts {
            self.parents[s.0 as usize] = Some(id);
        }
        self.blocks.push(stmts);
        id
    }

    pub fn add_function(&mut self, function: Function) -> FuncId {
        self.functions.push(function);
        FuncId(self.functions.len() as u32 - 1)
    }

    pub fn insert_stmt(&mut self, block: BlockId, index: usize, stmt: StmtId) {
        self.blocks[block.0 as usize].insert(index, stmt);
        self.parents[stmt.0 as usize] = Some(block);
    }

    pub fn push_stmt(&mut self, block: BlockId, stmt: StmtId) {
        self.blocks[block.0 as usize].push(stmt);
        self.parents[stmt.0 as usize] = Some(block);
    }

    // the list containing `stmt` and its index in it.
    pub fn position(&self, stmt: StmtId) -> Result<(BlockId, usize), AstError> {
        let block = self.parent_block(stmt).ok_or(AstError::Detached(stmt))?;
        let index = self
            .block(block)
            .iter()
            .position(|s| *s == stmt)
            .ok_or(AstError::Detached(stmt))?;
        Ok((block, index))
    }

    pub fn insert_before(&mut self, anchor: StmtId, stmt: StmtId) -> Result<(), AstError> {
        let (block, index) = self.position(anchor)?;
        self.insert_stmt(block, index, stmt);
        Ok(())
    }

    pub fn insert_after(&mut self, anchor: StmtId, stmt: StmtId) -> Result<(), AstError> {
        let (block, index) = self.position(anchor)?;
        self.insert_stmt(block, index + 1, stmt);
        Ok(())
    }

    // SECTION: structural queries

    // statement lists nested directly inside `stmt`, in source order.
    pub fn child_blocks(&self, stmt: StmtId) -> Vec<BlockId> {
        match self.stmt(stmt) {
            Stmt::If { clauses, else_body } => clauses
                .iter()
                .map(|c| c.body)
                .chain(else_body.iter().copied())
                .collect(),
            Stmt::Switch {
                cases, otherwise, ..
            } => cases
                .iter()
                .map(|c| c.body)
                .chain(otherwise.iter().copied())
                .collect(),
            Stmt::For { body, .. } | Stmt::While { body, .. } => vec![*body],
            _ => vec![],
        }
    }

    // every statement in `block`, nested ones included, in preorder.
    pub fn stmts_within(&self, block: BlockId) -> Vec<StmtId> {
        let mut stmts = vec![];
        let mut stack: Vec<StmtId> = self.block(block).iter().rev().copied().collect();
        while let Some(s) = stack.pop() {
            stmts.push(s);
            for b in self.child_blocks(s).into_iter().rev() {
                stack.extend(self.block(b).iter().rev().copied());
            }
        }
        stmts
    }

    // `expr` and every expression inside it, in preorder.
    pub fn exprs_within(&self, expr: ExprId) -> Vec<ExprId> {
        let mut exprs = vec![];
        let mut stack = vec![expr];
        while let Some(e) = stack.pop() {
            exprs.push(e);
            stack.extend(self.sub_exprs(e).into_iter().rev());
        }
        exprs
    }

    // expressions directly owned by `stmt` (not those of nested statements).
    pub fn stmt_exprs(&self, stmt: StmtId) -> Vec<ExprId> {
        match self.stmt(stmt) {
            Stmt::Expr { expr, .. } => vec![*expr],
            Stmt::Assign { lhs, rhs, .. } => vec![*lhs, *rhs],
            _ => self.guard_exprs(stmt),
        }
    }

    // the guard expressions of a conditional or loop.
    pub fn guard_exprs(&self, stmt: StmtId) -> Vec<ExprId> {
        match self.stmt(stmt) {
            Stmt::If { clauses, .. } => clauses.iter().map(|c| c.cond).collect(),
            Stmt::Switch { subject, cases, .. } => std::iter::once(*subject)
                .chain(cases.iter().map(|c| c.label))
                .collect(),
            Stmt::For { range, .. } => vec![*range],
            Stmt::While { cond, .. } => vec![*cond],
            _ => vec![],
        }
    }

    pub fn sub_exprs(&self, expr: ExprId) -> Vec<ExprId> {
        match self.expr(expr) {
            Expr::Num(_) | Expr::Str { .. } | Expr::Name(_) | Expr::Colon | Expr::End => vec![],
            Expr::Param { head, args } | Expr::CellIndex { head, args } => {
                std::iter::once(*head).chain(args.iter().copied()).collect()
            }
            Expr::Field { base, .. } => vec![*base],
            Expr::Matrix(rows) | Expr::Cell(rows) => rows.iter().flatten().copied().collect(),
            Expr::Unary(_, e) | Expr::Postfix(_, e) => vec![*e],
            Expr::Binary(l, _, r) => vec![*l, *r],
            Expr::Range { start, step, stop } => std::iter::once(*start)
                .chain(step.iter().copied())
                .chain(std::iter::once(*stop))
                .collect(),
        }
    }

    // every name occurrence in `expr`, in source order.  The head of an
    // index/call is a name occurrence; a field name is not.
    pub fn name_exprs(&self, expr: ExprId) -> Vec<&str> {
        let mut names = vec![];
        self.collect_names(expr, &mut names);
        names
    }

    fn collect_names<'a>(&'a self, expr: ExprId, names: &mut Vec<&'a str>) {
        if let Expr::Name(n) = self.expr(expr) {
            names.push(n);
        }
        for e in self.sub_exprs(expr) {
            self.collect_names(e, names);
        }
    }

    pub fn guard_names(&self, stmt: StmtId) -> Vec<&str> {
        self.guard_exprs(stmt)
            .into_iter()
            .flat_map(|e| self.name_exprs(e))
            .collect()
    }

    pub fn rhs(&self, stmt: StmtId) -> Option<ExprId> {
        match self.stmt(stmt) {
            Stmt::Assign { rhs, .. } => Some(*rhs),
            _ => None,
        }
    }

    // the name called/indexed by a `name(...)` expression.
    pub fn call_head(&self, expr: ExprId) -> Option<&str> {
        match self.expr(expr) {
            Expr::Param { head, .. } => match self.expr(*head) {
                Expr::Name(n) => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    /// The variables assigned by `stmt`.
    ///
    /// Indexed, cell and field targets assign their base variable, so
    /// `a(i).b = x` assigns `a`; `[x, y] = f()` assigns both `x` and `y`; a
    /// `for` statement assigns its loop variable.
    pub fn lvalues(&self, stmt: StmtId) -> Result<Set<String>, AstError> {
        let mut names = Set::new();
        match self.stmt(stmt) {
            Stmt::Assign { lhs, .. } => match self.expr(*lhs) {
                Expr::Matrix(rows) => {
                    for target in rows.iter().flatten() {
                        names.insert(self.lvalue_base(stmt, *target)?);
                    }
                }
                _ => {
                    names.insert(self.lvalue_base(stmt, *lhs)?);
                }
            },
            Stmt::For { var, .. } => {
                names.insert(var.clone());
            }
            _ => {}
        }
        Ok(names)
    }

    fn lvalue_base(&self, stmt: StmtId, target: ExprId) -> Result<String, AstError> {
        match self.expr(target) {
            Expr::Name(n) => Ok(n.clone()),
            Expr::Param { head, .. } | Expr::CellIndex { head, .. } => {
                self.lvalue_base(stmt, *head)
            }
            Expr::Field { base, .. } => self.lvalue_base(stmt, *base),
            _ => Err(AstError::IllFormedLvalue(
                self.span(stmt),
                super::pretty::expr_to_string(self, target),
            )),
        }
    }
}

// SECTION: programs

/// The unit a counter namespace and a classifier belong to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Scope {
    Script,
    Function(FuncId),
}

/// A parsed source file: an optional script body followed by functions.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub ast: Ast,
    pub script: Option<BlockId>,
    pub functions: Vec<FuncId>,
}

impl Program {
    // every scope, in traversal order: the script first, then each function
    // followed by its nested functions.
    pub fn scopes(&self) -> Vec<Scope> {
        let mut scopes = vec![];
        if self.script.is_some() {
            scopes.push(Scope::Script);
        }
        let mut stack: Vec<FuncId> = self.functions.iter().rev().copied().collect();
        while let Some(f) = stack.pop() {
            scopes.push(Scope::Function(f));
            stack.extend(self.ast.function(f).nested.iter().rev().copied());
        }
        scopes
    }

    pub fn scope_name(&self, scope: Scope) -> &str {
        match scope {
            Scope::Script => "script",
            Scope::Function(f) => &self.ast.function(f).name,
        }
    }

    pub fn scope_body(&self, scope: Scope) -> Option<BlockId> {
        match scope {
            Scope::Script => self.script,
            Scope::Function(f) => Some(self.ast.function(f).body),
        }
    }

    // the scope of the function with the given name, if any.
    pub fn find_function(&self, name: &str) -> Option<Scope> {
        self.scopes()
            .into_iter()
            .find(|s| matches!(s, Scope::Function(_)) && self.scope_name(*s) == name)
    }

    // names of every function defined anywhere in the program.
    pub fn function_names(&self) -> Set<String> {
        self.scopes()
            .into_iter()
            .filter_map(|s| match s {
                Scope::Function(f) => Some(self.ast.function(f).name.clone()),
                Scope::Script => None,
            })
            .collect()
    }
}
