// tests for the "live variables" analysis.

use collapse::*;

use crate::front_end::*;
use crate::middle_end::analysis::{
    liveness, liveness::LiveVariables, printer::report, reaching_defs,
};

#[test]
fn same_table_as_reaching_defs() {
    let code = "a = b + c;\nif a > 0\n  d = a;\nend\ne = d;\n";
    let program = parse(code).unwrap();
    assert_eq!(
        liveness::analyze(&program).unwrap(),
        reaching_defs::analyze(&program).unwrap()
    );
}

#[test]
fn report_lists_names_only() {
    let code = "x = 1;\ny = x + disp;\nz = y;\n";
    let program = parse(code).unwrap();
    let result = liveness::analyze(&program).unwrap();

    let expected = r#"
    in {
    }
    x = 1;
    out {
    x
    }

    in {
    x
    }
    y = x + disp;
    out {
    y
    }

    in {
    y
    }
    z = y;
    out {
    }
    "#;
    collapsed_eq!(report(&LiveVariables, &program, &result).as_str(), expected);
}

#[test]
fn functions_are_reported_after_the_script() {
    let code = "r = g(1);\nfunction out = g(v)\n  out = v;\nend\n";
    let program = parse(code).unwrap();
    let result = liveness::analyze(&program).unwrap();

    let expected = r#"
    in {
    }
    r = g(1);
    out {
    }

    in {
    v
    }
    out = v;
    out {
    }
    "#;
    collapsed_eq!(report(&LiveVariables, &program, &result).as_str(), expected);
}
