// Regression tests for the command-line interface.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

mod common;

use assert_cmd::Command;
use common::fixture;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("sas-lineage").unwrap();
    cmd.arg("--color").arg("never");
    cmd
}

#[test]
fn cli_check_reports_each_file() {
    cli()
        .arg("check")
        .arg(fixture("jobs"))
        .assert()
        .success()
        .stdout(contains("01_sales.sas").and(contains("3 files checked, 0 failed")));
}

#[test]
fn cli_reports_miette_diagnostics_on_syntax_error() {
    cli()
        .arg("check")
        .arg(fixture("broken/missing_run.sas"))
        .assert()
        .failure()
        .stderr(
            contains("sas::syntax")
                .and(contains("end of input"))
                .and(contains("terminate the step with RUN;")),
        );
}

#[test]
fn cli_reports_transform_errors() {
    cli()
        .arg("ast")
        .arg(fixture("broken/set_and_merge.sas"))
        .assert()
        .failure()
        .stderr(
            contains("sas::transform")
                .and(contains("use either SET or MERGE in a DATA step, not both")),
        );
}

#[test]
fn cli_lineage_json_merges_a_directory() {
    let output = cli()
        .arg("lineage")
        .arg(fixture("jobs"))
        .arg("--output")
        .arg("json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["customer_analysis"]["keys"][0], "customer_id");
    assert_eq!(json["sales_summary"]["inputs"][0], "sales_summary");
    assert_eq!(json["sales_summary"]["operation"], "data_step");
}

#[test]
fn cli_lineage_text_listing() {
    cli()
        .arg("lineage")
        .arg(fixture("jobs/01_sales.sas"))
        .assert()
        .success()
        .stdout(
            contains("sales_summary (data_step)")
                .and(contains("raw.transactions"))
                .and(contains("columns created: profit, margin_pct, high_value")),
        );
}

#[test]
fn cli_lineage_yaml() {
    cli()
        .arg("lineage")
        .arg(fixture("jobs/02_customers.sas"))
        .args(["--output", "yaml"])
        .assert()
        .success()
        .stdout(contains("customer_analysis:").and(contains("- customer_id")));
}

#[test]
fn cli_lineage_skips_broken_files() {
    cli()
        .arg("lineage")
        .arg(fixture("broken"))
        .assert()
        .failure()
        .stderr(contains("2 of 2 files skipped"));
}

#[test]
fn cli_format_prints_canonical_text() {
    cli()
        .arg("format")
        .arg(fixture("jobs/01_sales.sas"))
        .assert()
        .success()
        .stdout(
            contains("DATA sales_summary;\n  SET raw.transactions;\n  WHERE (region = \"APAC\");")
                .and(contains("RUN;")),
        );
}

#[test]
fn cli_format_diff() {
    cli()
        .arg("format")
        .arg("--diff")
        .arg(fixture("jobs/01_sales.sas"))
        .assert()
        .success()
        .stdout(contains("+DATA sales_summary;").and(contains("-data sales_summary;")));
}

#[test]
fn cli_ast_json() {
    cli()
        .arg("ast")
        .arg("--json")
        .arg(fixture("jobs/03_reports.sas"))
        .assert()
        .success()
        .stdout(contains("\"procedure\": \"sort\"").and(contains("\"generic\"")));
}

#[test]
fn cli_ast_tree_prints_the_parse_tree() {
    cli()
        .arg("ast")
        .arg("--tree")
        .arg(fixture("jobs/01_sales.sas"))
        .assert()
        .success()
        .stdout(
            contains("data_step")
                .and(contains("assignment"))
                .and(contains("where_stmt")),
        );
}

#[test]
fn cli_ast_tree_and_json_conflict() {
    cli()
        .arg("ast")
        .arg("--tree")
        .arg("--json")
        .arg(fixture("jobs/01_sales.sas"))
        .assert()
        .failure();
}

#[test]
fn cli_missing_path_fails() {
    cli()
        .arg("check")
        .arg(fixture("no/such/dir"))
        .assert()
        .failure()
        .stderr(contains("does not exist"));
}
