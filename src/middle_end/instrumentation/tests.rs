// tests for the instrumentation pass.

use collapse::*;

use super::*;
use crate::front_end::pretty::program_to_string;

fn instrumented(code: &str, options: InstrumentOptions) -> (String, InstrumentReport) {
    let mut program = parse(code).unwrap();
    let report = instrument(&mut program, &options).unwrap();
    (program_to_string(&program), report)
}

#[test]
fn counts_a_loop() {
    let mut program = parse("for i = 1:3\n  a(i) = i;\nend\n").unwrap();
    let script = program.script.unwrap();
    let lp = program.ast.block(script)[0];
    let body = program.ast.stmt(lp).loop_body().unwrap();
    let assign = program.ast.block(body)[0];

    let report = instrument(&mut program, &InstrumentOptions::default()).unwrap();

    let expected = r#"
    script_func = 0;
    script_loop_1 = 0;
    for i = 1:3
      script_loop_1 = script_loop_1 + 1;
      a(i) = i;
    end
    fprintf('%s %d\n', 'script_loop_1', script_loop_1);
    fprintf('%s %d\n', 'script_func', script_func);
    "#;
    collapsed_eq!(program_to_string(&program).as_str(), expected);

    // the loop and its assignment keep their handles.
    assert_eq!(program.ast.block(script)[2], lp);
    assert_eq!(program.ast.block(body)[1], assign);
    assert_eq!(
        report,
        InstrumentReport {
            scopes: 1,
            loops: 1,
            calls: 0,
            returns: 0,
        }
    );
}

#[test]
fn loops_are_numbered_across_scopes() {
    let code = r#"
for i = 1:2
  x = i;
end
while y > 0
  y = y - 1;
end
function f(n)
  for k = 1:n
    disp(k);
  end
end
"#;
    let (printed, report) = instrumented(code, InstrumentOptions::default());

    let expected = r#"
    script_func = 0;
    script_loop_1 = 0;
    for i = 1:2
      script_loop_1 = script_loop_1 + 1;
      x = i;
    end
    fprintf('%s %d\n', 'script_loop_1', script_loop_1);
    script_loop_2 = 0;
    while y > 0
      script_loop_2 = script_loop_2 + 1;
      y = y - 1;
    end
    fprintf('%s %d\n', 'script_loop_2', script_loop_2);
    fprintf('%s %d\n', 'script_func', script_func);
    function f(n)
      f_func = 0;
      f_loop_3 = 0;
      for k = 1:n
        f_loop_3 = f_loop_3 + 1;
        f_func = f_func + 1;
        disp(k);
      end
      fprintf('%s %d\n', 'f_loop_3', f_loop_3);
      fprintf('%s %d\n', 'f_func', f_func);
    end
    "#;
    collapsed_eq!(printed.as_str(), expected);
    assert_eq!(report.loops, 3);
    assert_eq!(report.calls, 1);
}

#[test]
fn calls_and_returns() {
    let code = r#"
function r = g(x)
  y = h(x) + 1;
  if x > 0
    return
  end
  disp(y);
  r = y;
end
function v = h(w)
  v = w;
end
"#;
    let (printed, report) = instrumented(code, InstrumentOptions::default());

    let expected = r#"
    function r = g(x)
      g_func = 0;
      g_func = g_func + 1;
      y = h(x) + 1;
      if x > 0
        fprintf('%s %d\n', 'g_func', g_func);
        return
      end
      g_func = g_func + 1;
      disp(y);
      r = y;
      fprintf('%s %d\n', 'g_func', g_func);
    end
    function v = h(w)
      h_func = 0;
      v = w;
      fprintf('%s %d\n', 'h_func', h_func);
    end
    "#;
    collapsed_eq!(printed.as_str(), expected);
    assert_eq!(
        report,
        InstrumentReport {
            scopes: 2,
            loops: 0,
            calls: 2,
            returns: 1,
        }
    );
}

#[test]
fn nested_functions_follow_their_parent() {
    let code = r#"
function outer()
  inner();
  function inner()
    z = 1;
  end
end
"#;
    let (printed, report) = instrumented(code, InstrumentOptions::default());

    let expected = r#"
    function outer()
      outer_func = 0;
      outer_func = outer_func + 1;
      inner();
      fprintf('%s %d\n', 'outer_func', outer_func);
      function inner()
        inner_func = 0;
        z = 1;
        fprintf('%s %d\n', 'inner_func', inner_func);
      end
    end
    "#;
    collapsed_eq!(printed.as_str(), expected);
    assert_eq!(report.scopes, 2);
}

#[test]
fn without_a_classifier_no_call_is_charged() {
    let code = "x = f(1);\nwhile g(x)\n  disp(x);\nend\n";
    let (printed, report) = instrumented(
        code,
        InstrumentOptions {
            classify_calls: false,
        },
    );

    let expected = r#"
    script_func = 0;
    x = f(1);
    script_loop_1 = 0;
    while g(x)
      script_loop_1 = script_loop_1 + 1;
      disp(x);
    end
    fprintf('%s %d\n', 'script_loop_1', script_loop_1);
    fprintf('%s %d\n', 'script_func', script_func);
    "#;
    collapsed_eq!(printed.as_str(), expected);
    assert_eq!(report.calls, 0);
}

#[test]
fn guard_calls_are_charged_before_the_loop() {
    let (printed, report) = instrumented(
        "while g(x)\n  x = x - 1;\nend\n",
        InstrumentOptions::default(),
    );

    let expected = r#"
    script_func = 0;
    script_loop_1 = 0;
    script_func = script_func + 1;
    while g(x)
      script_loop_1 = script_loop_1 + 1;
      x = x - 1;
    end
    fprintf('%s %d\n', 'script_loop_1', script_loop_1);
    fprintf('%s %d\n', 'script_func', script_func);
    "#;
    collapsed_eq!(printed.as_str(), expected);
    assert_eq!(report.calls, 1);
}

#[test]
fn revisiting_a_scope_inserts_nothing() {
    let mut program = parse("for i = 1:3\n  s = f(i);\nend\ndisp(s);\n").unwrap();
    let body = program.script.unwrap();
    let mut rewriter = Rewriter::new(&mut program, InstrumentOptions::default());
    let ctx = ScopeCtx {
        name: "script".to_string(),
        kinds: Some(KindAnalysis::of(rewriter.program, Scope::Script)),
    };

    rewriter.block(body, &ctx).unwrap();
    let once = program_to_string(rewriter.program);
    let report = rewriter.report;
    assert_eq!(report.loops, 1);
    assert_eq!(report.calls, 2);

    rewriter.block(body, &ctx).unwrap();
    assert_eq!(program_to_string(rewriter.program), once);
    assert_eq!(rewriter.report, report);
}

#[test]
fn conditional_guard_calls_are_charged_before_the_statement() {
    let code = r#"
if f(x) > 0
  y = 1;
elseif g(x)
  y = 2;
end
switch h(y)
  case 1
    z = 1;
end
"#;
    let (printed, report) = instrumented(code, InstrumentOptions::default());

    let expected = r#"
    script_func = 0;
    script_func = script_func + 1;
    script_func = script_func + 1;
    if f(x) > 0
      y = 1;
    elseif g(x)
      y = 2;
    end
    script_func = script_func + 1;
    switch h(y)
      case 1
        z = 1;
    end
    fprintf('%s %d\n', 'script_func', script_func);
    "#;
    collapsed_eq!(printed.as_str(), expected);
    assert_eq!(report.calls, 3);
}

#[test]
fn nested_loops_get_consecutive_numbers() {
    let code = r#"
for i = 1:2
  for j = 1:3
    s = i;
  end
end
while s > 0
  s = s - 1;
end
"#;
    let (printed, report) = instrumented(code, InstrumentOptions::default());

    let expected = r#"
    script_func = 0;
    script_loop_1 = 0;
    for i = 1:2
      script_loop_1 = script_loop_1 + 1;
      script_loop_2 = 0;
      for j = 1:3
        script_loop_2 = script_loop_2 + 1;
        s = i;
      end
      fprintf('%s %d\n', 'script_loop_2', script_loop_2);
    end
    fprintf('%s %d\n', 'script_loop_1', script_loop_1);
    script_loop_3 = 0;
    while s > 0
      script_loop_3 = script_loop_3 + 1;
      s = s - 1;
    end
    fprintf('%s %d\n', 'script_loop_3', script_loop_3);
    fprintf('%s %d\n', 'script_func', script_func);
    "#;
    collapsed_eq!(printed.as_str(), expected);
    assert_eq!(report.loops, 3);
}

#[test]
fn indexing_with_end_is_not_a_call() {
    let (printed, report) = instrumented("x = a(end);\ny = b(:, 2);\n", InstrumentOptions::default());

    let expected = r#"
    script_func = 0;
    x = a(end);
    y = b(:, 2);
    fprintf('%s %d\n', 'script_func', script_func);
    "#;
    collapsed_eq!(printed.as_str(), expected);
    assert_eq!(report.calls, 0);
}
