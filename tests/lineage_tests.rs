// tests/lineage_tests.rs

mod common;

use common::{fixture, parse_ok, read_fixture};
use sas_lineage::{extract_lineage, Lineage, LineageRecord, Operation};

fn lineage_of(source: &str) -> Lineage {
    extract_lineage(&parse_ok(source))
}

// ---
// Merge / By / Where
// ---

#[test]
fn test_sales_and_customer_sales() {
    let lineage = lineage_of(
        "data sales;
            set raw.transactions;
            where region = 'APAC';
            total = amount * 1.1;
         run;

         data customer_sales;
            merge customers accounts;
            by customer_id;
            where status = 'ACTIVE';
         run;",
    );

    let keys: Vec<&str> = lineage.keys().map(String::as_str).collect();
    assert_eq!(keys, ["sales", "customer_sales"]);

    let sales = &lineage["sales"];
    assert_eq!(sales.inputs, ["raw.transactions"]);
    assert_eq!(sales.outputs, ["sales"]);
    assert_eq!(sales.filters, ["(region = \"APAC\")"]);
    assert!(sales.keys.is_empty());

    let customer_sales = &lineage["customer_sales"];
    assert_eq!(customer_sales.inputs, ["customers", "accounts"]);
    assert_eq!(customer_sales.keys, ["customer_id"]);
    assert_eq!(customer_sales.filters, ["(status = \"ACTIVE\")"]);
    assert_eq!(customer_sales.operation, Operation::DataStep);
}

#[test]
fn test_sales_fixture_record() {
    let lineage = lineage_of(&read_fixture("jobs/01_sales.sas"));
    assert_eq!(
        lineage["sales_summary"],
        LineageRecord {
            inputs: vec!["raw.transactions".into()],
            outputs: vec!["sales_summary".into()],
            columns_created: vec!["profit".into(), "margin_pct".into(), "high_value".into()],
            columns_used: vec!["cost".into(), "profit".into(), "region".into(), "revenue".into()],
            filters: vec!["(region = \"APAC\")".into()],
            keys: vec![],
            operation: Operation::DataStep,
        }
    );
}

// ---
// Columns
// ---

#[test]
fn test_columns_used_are_sorted_and_unique() {
    let lineage = lineage_of(
        "data t; set s; z = b + a; y = a * a; if c > b then w = d; run;",
    );
    assert_eq!(lineage["t"].columns_used, ["a", "b", "c", "d"]);
}

#[test]
fn test_columns_created_keep_repeats() {
    let lineage = lineage_of("data t; set s; x = 1; y = x; x = 2; run;");
    assert_eq!(lineage["t"].columns_created, ["x", "y", "x"]);
}

#[test]
fn test_columns_created_follow_if_branches() {
    let lineage = lineage_of(
        "data t; set s;
            if score >= 90 then grade = 'A';
            else if score >= 80 then tier = 'B';
            else band = 'C';
         run;",
    );
    assert_eq!(lineage["t"].columns_created, ["grade", "tier", "band"]);
}

#[test]
fn test_loop_bodies_are_read_but_not_created() {
    let lineage = lineage_of(
        "data t; set s; do i = 1 to n; acc = acc + i; end; run;",
    );
    let record = &lineage["t"];
    assert!(record.columns_created.is_empty());
    assert_eq!(record.columns_used, ["acc", "i", "n"]);
}

#[test]
fn test_columns_used_counts_reads_only() {
    let lineage = lineage_of(
        "data t; set s; put total; retain n 0; \
         if x then do; keep k; input j; end; \
         do i = 1 to 3; end; run;",
    );
    assert_eq!(lineage["t"].columns_used, ["total", "x"]);
}

#[test]
fn test_option_expressions_are_reads() {
    let lineage = lineage_of("data t; set s(where=(amount > limit) keep=amount); run;");
    assert_eq!(lineage["t"].columns_used, ["amount", "limit"]);
}

// ---
// Steps & Outputs
// ---

#[test]
fn test_record_is_filed_under_the_first_output() {
    let lineage = lineage_of("data good bad; set raw; if ok then output good; run;");
    assert_eq!(lineage.len(), 1);
    assert_eq!(lineage["good"].outputs, ["good", "bad"]);
}

#[test]
fn test_proc_steps_and_anonymous_data_steps_are_skipped() {
    let lineage = lineage_of(
        "proc sort data=a out=b; by k; run;
         data; set a; run;
         data c; set b; run;",
    );
    let keys: Vec<&str> = lineage.keys().map(String::as_str).collect();
    assert_eq!(keys, ["c"]);
}

#[test]
fn test_later_step_replaces_record_in_place() {
    let lineage = lineage_of(
        "data a; set raw; run;
         data b; set a; run;
         data a; set b; x = 1; run;",
    );
    let keys: Vec<&str> = lineage.keys().map(String::as_str).collect();
    assert_eq!(keys, ["a", "b"]);
    assert_eq!(lineage["a"].inputs, ["b"]);
    assert_eq!(lineage["a"].columns_created, ["x"]);
}

#[test]
fn test_step_without_input() {
    let lineage = lineage_of("data constants; pi = 3.14159; run;");
    let record = &lineage["constants"];
    assert!(record.inputs.is_empty());
    assert!(record.filters.is_empty());
    assert_eq!(record.columns_created, ["pi"]);
}

#[test]
fn test_jobs_directory_merges_in_path_order() {
    let mut lineage = Lineage::new();
    for name in ["01_sales.sas", "02_customers.sas", "03_reports.sas"] {
        let source = std::fs::read_to_string(fixture("jobs").join(name)).unwrap();
        lineage.extend(lineage_of(&source));
    }
    let keys: Vec<&str> = lineage.keys().map(String::as_str).collect();
    assert_eq!(keys, ["sales_summary", "customer_analysis"]);
    assert_eq!(lineage["sales_summary"].inputs, ["sales_summary"]);
    assert_eq!(lineage["sales_summary"].columns_created, ["bonus"]);
    assert_eq!(lineage["customer_analysis"].inputs, ["customers", "accounts"]);
}

// ---
// Serialization
// ---

#[test]
fn test_record_serializes_with_snake_case_operation() {
    let lineage = lineage_of("data out; set in; run;");
    let json = serde_json::to_value(&lineage).unwrap();
    assert_eq!(json["out"]["operation"], "data_step");
    assert_eq!(json["out"]["inputs"][0], "in");

    let back: Lineage = serde_json::from_value(json).unwrap();
    assert_eq!(back, lineage);
}
