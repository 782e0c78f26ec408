// tests for the reaching-style analysis and the driver.

use collapse::*;

use crate::front_end::kinds::KindAnalysis;
use crate::front_end::*;
use crate::middle_end::analysis::{
    printer::report, reaching_defs, reaching_defs::ReachingDefs, AnalysisError, FlowValue,
    GenKill,
};

// the i-th top-level statement of the script.
fn script_stmt(program: &Program, i: usize) -> StmtId {
    program.ast.block(program.script.unwrap())[i]
}

fn keys(flow: &FlowValue) -> Vec<&str> {
    flow.keys().map(|k| k.as_str()).collect()
}

#[test]
fn kill_and_gen_of_an_assignment() {
    let program = parse("x = f(y) + z;").unwrap();
    let kinds = KindAnalysis::of(&program, Scope::Script);
    let s = script_stmt(&program, 0);

    let kill = ReachingDefs.kill(&program.ast, s).unwrap();
    assert_eq!(kill, Set::from(["x".to_string()]));

    let gen = ReachingDefs.gen(&program.ast, s, Some(&kinds));
    assert_eq!(keys(&gen), vec!["y", "z"]);
    assert_eq!(gen.get("y"), Some(&Set::from([s])));
    assert_eq!(gen.get("z"), Some(&Set::from([s])));

    // without a classifier `f` is an ordinary name.
    let gen = ReachingDefs.gen(&program.ast, s, None);
    assert_eq!(keys(&gen), vec!["f", "y", "z"]);
}

#[test]
fn straight_line_code() {
    let program = parse("x = 1;\ny = x;\nx = 2;\n").unwrap();
    let result = reaching_defs::analyze(&program).unwrap();
    let (s1, s2, s3) = (
        script_stmt(&program, 0),
        script_stmt(&program, 1),
        script_stmt(&program, 2),
    );

    // nothing flows past the end of the block.
    assert!(result.out_of(s3).unwrap().is_empty());
    assert!(result.in_of(s3).unwrap().is_empty());

    assert_eq!(result.in_of(s2).unwrap().get("x"), Some(&Set::from([s2])));
    assert_eq!(result.out_of(s1), result.in_of(s2));
    assert_eq!(result.out_of(s2), result.in_of(s3));

    // the first write kills the read below it.
    assert!(result.in_of(s1).unwrap().is_empty());
}

#[test]
fn branches_start_from_the_conditional() {
    let code = r#"
if c
  x = a;
else
  x = b;
end
y = x;
"#;
    let program = parse(code).unwrap();
    let result = reaching_defs::analyze(&program).unwrap();
    let cond = script_stmt(&program, 0);
    let after = script_stmt(&program, 1);

    let in_cond = result.in_of(cond).unwrap();
    assert_eq!(keys(in_cond), vec!["c", "x"]);
    assert_eq!(in_cond.get("c"), Some(&Set::from([cond])));
    assert_eq!(in_cond.get("x"), Some(&Set::from([after])));

    let Stmt::If { clauses, else_body } = program.ast.stmt(cond) else {
        panic!("expected a conditional");
    };
    let then_stmt = program.ast.block(clauses[0].body)[0];
    let else_stmt = program.ast.block(else_body.unwrap())[0];

    // each branch restarts from IN of the conditional; no meet.
    assert_eq!(result.out_of(then_stmt), Some(in_cond));
    assert_eq!(result.out_of(else_stmt), Some(in_cond));
    assert_eq!(keys(result.in_of(then_stmt).unwrap()), vec!["a", "c"]);
    assert_eq!(keys(result.in_of(else_stmt).unwrap()), vec!["b", "c"]);
}

#[test]
fn loops_are_visited_once() {
    let code = "s = 0;\nfor i = 1:n\n  s = s + i;\nend\n";
    let program = parse(code).unwrap();
    let result = reaching_defs::analyze(&program).unwrap();
    let init = script_stmt(&program, 0);
    let lp = script_stmt(&program, 1);
    let body = program.ast.block(program.ast.child_blocks(lp)[0])[0];

    // the loop variable is killed, the range is generated.
    assert_eq!(keys(result.in_of(lp).unwrap()), vec!["n"]);
    assert_eq!(keys(result.in_of(body).unwrap()), vec!["i", "n", "s"]);
    assert_eq!(keys(result.in_of(init).unwrap()), vec!["n"]);
}

#[test]
fn function_names_are_not_generated() {
    let code = "y = zeros(n) + helper(x);\nfunction r = helper(v)\n  r = v * 2;\nend\n";
    let program = parse(code).unwrap();
    let result = reaching_defs::analyze(&program).unwrap();
    let s = script_stmt(&program, 0);
    assert_eq!(keys(result.in_of(s).unwrap()), vec!["n", "x"]);

    let Some(Scope::Function(f)) = program.find_function("helper") else {
        panic!("expected a function");
    };
    let body = program.ast.function(f).body;
    let r = program.ast.block(body)[0];
    assert_eq!(keys(result.in_of(r).unwrap()), vec!["v"]);
}

#[test]
fn scopes_can_be_analysed_alone() {
    let code = "a = b;\nfunction f(p)\n  q = p;\nend\n";
    let program = parse(code).unwrap();
    let scope = program.find_function("f").unwrap();
    let result = reaching_defs::analyze_scope(&program, scope).unwrap();
    assert!(!result.is_annotated(script_stmt(&program, 0)));
    assert_eq!(result.in_flow.len(), 1);
}

#[test]
fn ill_formed_targets_abort_the_run() {
    let program = parse("x = 1;\n1 = x;\n").unwrap();
    let err = reaching_defs::analyze(&program).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::IllFormed(AstError::IllFormedLvalue(span, ref target))
            if span == Span::new(2, 1) && target == "1"
    ));
    assert_eq!(
        err.to_string(),
        "ill-formed input: ill-formed assignment target `1` at [2, 1]"
    );
}

#[test]
fn straight_line_report() {
    let program = parse("x = 1;\ny = x;\nx = 2;\n").unwrap();
    let result = reaching_defs::analyze(&program).unwrap();

    let expected = r#"
    in {
    }
    x = 1;
    out {
    x: [y = x; at [2, 1]]
    }

    in {
    x: [y = x; at [2, 1]]
    }
    y = x;
    out {
    }

    in {
    }
    x = 2;
    out {
    }
    "#;
    collapsed_eq!(report(&ReachingDefs, &program, &result).as_str(), expected);
}

#[test]
fn report_of_compound_statements() {
    let program = parse("while k > 0\n  k = k - 1;\nend\n").unwrap();
    let result = reaching_defs::analyze(&program).unwrap();

    let expected = r#"
    in {
    k: [while k > 0 at [1, 1]]
    }
    while k > 0
      k = k - 1;
    end
    out {
    }

    in {
    k: [k = k - 1; at [2, 3]]
    }
    k = k - 1;
    out {
    k: [while k > 0 at [1, 1]]
    }
    "#;
    collapsed_eq!(report(&ReachingDefs, &program, &result).as_str(), expected);
}

#[test]
fn switch_subject_and_labels_are_generated() {
    let code = r#"
switch k
  case c1
    x = a;
  otherwise
    x = b;
end
y = x;
"#;
    let program = parse(code).unwrap();
    let result = reaching_defs::analyze(&program).unwrap();
    let sw = script_stmt(&program, 0);
    let after = script_stmt(&program, 1);

    let in_switch = result.in_of(sw).unwrap();
    assert_eq!(keys(in_switch), vec!["c1", "k", "x"]);
    assert_eq!(in_switch.get("k"), Some(&Set::from([sw])));
    assert_eq!(in_switch.get("c1"), Some(&Set::from([sw])));
    assert_eq!(in_switch.get("x"), Some(&Set::from([after])));

    let bodies = program.ast.child_blocks(sw);
    assert_eq!(bodies.len(), 2);
    let case_stmt = program.ast.block(bodies[0])[0];
    let otherwise_stmt = program.ast.block(bodies[1])[0];
    assert_eq!(result.out_of(case_stmt), Some(in_switch));
    assert_eq!(result.out_of(otherwise_stmt), Some(in_switch));
    assert_eq!(keys(result.in_of(case_stmt).unwrap()), vec!["a", "c1", "k"]);
    assert_eq!(keys(result.in_of(otherwise_stmt).unwrap()), vec!["b", "c1", "k"]);
}

#[test]
fn every_clause_restarts_from_the_conditional() {
    let code = r#"
if p
  x = 1;
elseif q
  x = r;
else
  x = 2;
end
"#;
    let program = parse(code).unwrap();
    let result = reaching_defs::analyze(&program).unwrap();
    let cond = script_stmt(&program, 0);

    let in_cond = result.in_of(cond).unwrap();
    assert_eq!(keys(in_cond), vec!["p", "q"]);
    assert!(result.out_of(cond).unwrap().is_empty());

    let bodies = program.ast.child_blocks(cond);
    assert_eq!(bodies.len(), 3);
    let clause_ins: Vec<Vec<&str>> = bodies
        .iter()
        .map(|b| {
            let s = program.ast.block(*b)[0];
            assert_eq!(result.out_of(s), Some(in_cond));
            keys(result.in_of(s).unwrap())
        })
        .collect();
    assert_eq!(
        clause_ins,
        vec![vec!["p", "q"], vec!["p", "q", "r"], vec!["p", "q"]]
    );
}
