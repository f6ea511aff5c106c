// tests/roundtrip_tests.rs
//
// The canonical rendering must reparse to the same tree, and rendering is a
// fixed point after one pass.

mod common;

use common::{good_fixtures, parse_ok};
use proptest::prelude::*;
use sas_lineage::ast::{
    BinaryOperator, Expression, FunctionCall, Literal, Statement, Step, UnaryOperator,
};

fn assert_stable(source: &str) {
    let program = parse_ok(source);
    let rendered = program.to_string();
    let reparsed = parse_ok(&rendered);
    assert_eq!(reparsed, program, "rendering changed the tree:\n{rendered}");
    assert_eq!(reparsed.to_string(), rendered);
}

// ---
// Corpus
// ---

#[test]
fn test_fixtures_round_trip() {
    let files = good_fixtures();
    assert!(files.len() >= 4, "fixtures missing: {files:?}");
    for file in files {
        let source = std::fs::read_to_string(&file).unwrap();
        assert_stable(&source);
    }
}

#[test]
fn test_statement_families_round_trip() {
    for source in [
        "data a; set b(keep=x y rename=(x=z) obs=5); run;",
        "data a; merge b(in=inb) c(in=inc); by k1 k2; if inb and inc then output; run;",
        "data a; infile 'in.txt' dlm='|' missover; input id name $ amt 8.2; run;",
        "data _null_; set a; file 'out.txt'; put id amt dollar10.2; run;",
        "data a; length name $30 n 8; format d date9. amt comma12.2; informat d mmddyy10.; run;",
        "data a; label id = 'Identifier' amt = \"Amount (USD)\"; run;",
        "data a; retain total 0 neg -5 tag 'x'; total = total + 1; run;",
        "data a; do while (n < 10); n = n + 1; end; do until (n >= 20); n = n + 2; end; run;",
        "data a; do i = 1 to 20 by 2; s = s + i; end; run;",
        "data a b; set c; if x then output a; else if y then output; else delete; run;",
        "data a; set b; if x > 1 then do; y = 1; z = 2; end; else do; y = 0; end; run;",
        "data a; set b; if missing(x) then stop; keep x y; drop z; rename x=x2; run;",
        "proc freq data=lib.survey order=freq; tables a*b / nocol; run;",
        "proc sql; create table c as select * from d; quit;",
    ] {
        assert_stable(source);
    }
}

#[test]
fn test_strings_with_both_quote_characters_round_trip() {
    for source in [
        "data a; x = 'a\"b''c'; run;",
        "data a; label v = 'say \"hi\" it''s'; run;",
        "data a; x = \"q\"\"x it's\"; run;",
        "data a; infile 'c:\\in \"1\".txt'; input id; run;",
    ] {
        assert_stable(source);
    }

    let program = parse_ok("data a; x = 'a\"b''c'; run;");
    assert_eq!(program.to_string(), "DATA a;\n  x = 'a\"b''c';\nRUN;\n");
}

#[test]
fn test_nested_rendering_layout() {
    let program = parse_ok("data a; set b; if x then do; do i = 1 to 3; y = i; end; end; run;");
    assert_eq!(
        program.to_string(),
        "DATA a;\n  SET b;\n  IF x THEN DO;\n    DO i = 1 TO 3;\n      y = i;\n    END;\n  END;\nRUN;\n"
    );
}

// ---
// Generated expressions
// ---

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alpha", "beta", "revenue", "x1", "_tmp", "customer_id"])
        .prop_map(String::from)
}

// Quote characters appear either doubled or alone, so at least one delimiter
// can always carry the value.
fn string_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,8}",
        "([a-zA-Z0-9 ]|''|\"){0,6}",
        "([a-zA-Z0-9 ]|\"\"|'){0,6}",
    ]
}

fn leaf() -> impl Strategy<Value = Expression> {
    prop_oneof![
        name().prop_map(Expression::variable),
        (0i64..1_000_000).prop_map(|n| Expression::from(Literal::integer(n))),
        (0u32..100_000).prop_map(|n| Expression::from(Literal::float(f64::from(n) / 8.0))),
        string_value().prop_map(|s| Expression::from(Literal::string(s))),
    ]
}

fn binary_operator() -> impl Strategy<Value = BinaryOperator> {
    prop::sample::select(vec![
        BinaryOperator::Or,
        BinaryOperator::And,
        BinaryOperator::Eq,
        BinaryOperator::Ne,
        BinaryOperator::Lt,
        BinaryOperator::Le,
        BinaryOperator::Gt,
        BinaryOperator::Ge,
        BinaryOperator::Add,
        BinaryOperator::Sub,
        BinaryOperator::Concat,
        BinaryOperator::Mul,
        BinaryOperator::Div,
    ])
}

fn unary_operator() -> impl Strategy<Value = UnaryOperator> {
    prop::sample::select(vec![UnaryOperator::Neg, UnaryOperator::Plus, UnaryOperator::Not])
}

fn expression() -> impl Strategy<Value = Expression> {
    leaf().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), binary_operator(), inner.clone())
                .prop_map(|(l, op, r)| Expression::binary(l, op, r)),
            (unary_operator(), inner.clone()).prop_map(|(op, e)| Expression::unary(op, e)),
            (
                prop::sample::select(vec!["sum", "max", "substr"]),
                prop::collection::vec(inner, 0..3)
            )
                .prop_map(|(name, arguments)| Expression::Call(FunctionCall {
                    name: name.to_string(),
                    arguments,
                })),
        ]
    })
}

proptest! {
    #[test]
    fn test_generated_expressions_round_trip(expr in expression()) {
        let source = format!("data t; y = {expr}; run;");
        let program = parse_ok(&source);
        let Some(Step::Data(step)) = program.steps.first() else {
            panic!("expected a data step from {source}");
        };
        match step.statements.as_slice() {
            [Statement::Assignment(a)] => prop_assert_eq!(&a.expression, &expr),
            other => panic!("expected one assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_generated_where_clauses_are_stable(expr in expression()) {
        assert_stable(&format!("data t; set s; where {expr}; run;"));
    }
}
