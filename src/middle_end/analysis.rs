//! Structural dataflow analysis of syntax trees.
//!
//! There is no control-flow graph here: an analysis walks each statement list
//! right to left, carrying a flow value from a statement's successor to the
//! statement itself.  Conditionals and loops contribute their guard as an
//! ordinary gen/kill transfer, and their bodies are walked once, each starting
//! from the compound statement's own IN value.  Branches are never merged back
//! and loops are never iterated to a fixed point.

use arbitrary::Arbitrary;
use derive_more::{Display, From};
use tracing::{debug, info, trace};

use crate::front_end::kinds::{is_function, KindAnalysis};
use crate::front_end::*;

pub mod liveness;
pub mod printer;
pub mod reaching_defs;

#[cfg(test)]
mod tests;

// SECTION: flow values

/// A map from variable names to per-variable facts.
#[derive(Clone, Debug, Default, Eq, PartialEq, Arbitrary)]
pub struct FlowMap<V> {
    values: Map<String, V>,
}

/// For every variable, the statements it is attributed to.
pub type FlowValue = FlowMap<Set<StmtId>>;

impl<V: Clone> FlowMap<V> {
    pub fn new() -> Self {
        FlowMap { values: Map::new() }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, val: V) {
        self.values.insert(key.into(), val);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // deletes every entry whose key is in `keys`; absent keys are ignored.
    pub fn remove_keys(&mut self, keys: &Set<String>) {
        self.values.retain(|k, _| !keys.contains(k));
    }

    /// The pointwise union of `self` and `other`: keys present on both sides
    /// get `merge(a, b)`, keys present on one side keep their value.
    pub fn union(&self, other: &Self, merge: impl Fn(&V, &V) -> V) -> Self {
        let mut result = self.clone();
        result.union_with(other, merge);
        result
    }

    // in-place version of `union`.
    pub fn union_with(&mut self, other: &Self, merge: impl Fn(&V, &V) -> V) {
        for (k, b) in &other.values {
            let merged = match self.values.get(k) {
                Some(a) => merge(a, b),
                None => b.clone(),
            };
            self.values.insert(k.clone(), merged);
        }
    }

    // overwrites the entries of `dest` with the entries of `self`.
    pub fn copy_into(&self, dest: &mut Self) {
        dest.values.clone_from(&self.values);
    }
}

impl<V> FromIterator<(String, V)> for FlowMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        FlowMap {
            values: iter.into_iter().collect(),
        }
    }
}

// the standard merger: set union.
pub fn set_union<T: Ord + Clone>(a: &Set<T>, b: &Set<T>) -> Set<T> {
    a.union(b).cloned().collect()
}

/// Merges two flow values, unioning the sets of keys present in both.
pub fn merge(a: &FlowValue, b: &FlowValue) -> FlowValue {
    a.union(b, set_union)
}

// SECTION: errors

#[derive(Clone, Debug, Display, Eq, PartialEq, From)]
pub enum AnalysisError {
    #[display(fmt = "ill-formed input: {}", _0)]
    IllFormed(AstError),
}
impl std::error::Error for AnalysisError {}

// SECTION: transfer functions

/// A backward analysis described by per-statement kill and gen sets.
///
/// The defaults implement the shared table:
///
/// - an assignment kills its lvalues and generates every non-function name
///   on its right-hand side;
/// - a conditional or loop kills what its guard assigns (only a `for`
///   variable) and generates every non-function name in its guard;
/// - every other statement kills and generates nothing.
///
/// Generated names are attributed to the statement being transferred.
pub trait GenKill {
    const NAME: &'static str;

    fn kill(&self, ast: &Ast, stmt: StmtId) -> Result<Set<String>, AstError> {
        ast.lvalues(stmt)
    }

    fn gen(&self, ast: &Ast, stmt: StmtId, kinds: Option<&KindAnalysis>) -> FlowValue {
        let names = match ast.stmt(stmt) {
            Stmt::Assign { .. } => ast
                .rhs(stmt)
                .map(|rhs| ast.name_exprs(rhs))
                .unwrap_or_default(),
            Stmt::If { .. } | Stmt::Switch { .. } | Stmt::For { .. } | Stmt::While { .. } => {
                ast.guard_names(stmt)
            }
            Stmt::Expr { .. }
            | Stmt::Break
            | Stmt::Continue
            | Stmt::Return
            | Stmt::Global(_)
            | Stmt::Persistent(_) => vec![],
        };
        names
            .into_iter()
            .filter(|n| !is_function(kinds, n))
            .map(|n| (n.to_string(), Set::from([stmt])))
            .collect()
    }

    /// One line of the report: the facts about variable `var`.
    fn render_entry(&self, ast: &Ast, var: &str, stmts: &Set<StmtId>) -> String;
}

// SECTION: the driver

/// The IN and OUT values recorded for each analysed statement.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Annotations {
    pub in_flow: Map<StmtId, FlowValue>,
    pub out_flow: Map<StmtId, FlowValue>,
}

impl Annotations {
    pub fn in_of(&self, stmt: StmtId) -> Option<&FlowValue> {
        self.in_flow.get(&stmt)
    }

    pub fn out_of(&self, stmt: StmtId) -> Option<&FlowValue> {
        self.out_flow.get(&stmt)
    }

    pub fn is_annotated(&self, stmt: StmtId) -> bool {
        self.in_flow.contains_key(&stmt)
    }

    pub fn extend(&mut self, other: Annotations) {
        self.in_flow.extend(other.in_flow);
        self.out_flow.extend(other.out_flow);
    }
}

/// Runs one [GenKill] analysis over one scope.
pub struct StructuralBackward<'a, A: GenKill> {
    analysis: &'a A,
    program: &'a Program,
    kinds: Option<&'a KindAnalysis>,
    annotations: Annotations,
}

impl<'a, A: GenKill> StructuralBackward<'a, A> {
    pub fn new(analysis: &'a A, program: &'a Program, kinds: Option<&'a KindAnalysis>) -> Self {
        StructuralBackward {
            analysis,
            program,
            kinds,
            annotations: Annotations::default(),
        }
    }

    // analyses `body` starting from the empty flow value.
    pub fn run(mut self, body: BlockId) -> Result<Annotations, AnalysisError> {
        self.block(body, FlowValue::new())?;
        Ok(self.annotations)
    }

    fn block(&mut self, block: BlockId, mut current: FlowValue) -> Result<(), AstError> {
        let program = self.program;
        for stmt in program.ast.block(block).iter().rev() {
            self.stmt(*stmt, &mut current)?;
        }
        Ok(())
    }

    // transfers `current` (the OUT value of `stmt`) to the IN value of `stmt`.
    fn stmt(&mut self, stmt: StmtId, current: &mut FlowValue) -> Result<(), AstError> {
        let program = self.program;
        let ast = &program.ast;
        self.annotations.out_flow.insert(stmt, current.clone());

        let kill = self.analysis.kill(ast, stmt)?;
        let gen = self.analysis.gen(ast, stmt, self.kinds);
        trace!(%stmt, ?kill, gen = ?gen.keys().collect::<Vec<_>>(), "transfer");
        current.remove_keys(&kill);
        current.union_with(&gen, set_union);

        self.annotations.in_flow.insert(stmt, current.clone());

        for body in ast.child_blocks(stmt) {
            self.block(body, current.clone())?;
        }
        Ok(())
    }
}

/// Analyses one scope with its own classifier.
pub fn analyze_scope<A: GenKill>(
    analysis: &A,
    program: &Program,
    scope: Scope,
) -> Result<Annotations, AnalysisError> {
    let Some(body) = program.scope_body(scope) else {
        return Ok(Annotations::default());
    };
    debug!(
        analysis = A::NAME,
        scope = program.scope_name(scope),
        "analyzing scope"
    );
    let kinds = KindAnalysis::of(program, scope);
    StructuralBackward::new(analysis, program, Some(&kinds)).run(body)
}

/// Analyses the script and every function of `program`.
pub fn analyze_program<A: GenKill>(
    analysis: &A,
    program: &Program,
) -> Result<Annotations, AnalysisError> {
    let mut annotations = Annotations::default();
    for scope in program.scopes() {
        annotations.extend(analyze_scope(analysis, program, scope)?);
    }
    info!(
        analysis = A::NAME,
        statements = annotations.in_flow.len(),
        "analysis finished"
    );
    Ok(annotations)
}
