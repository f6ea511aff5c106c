//! Dataset lineage.
//!
//! [`LineageExtractor`] walks every DATA step of a program and files one
//! [`LineageRecord`] under the step's first output dataset. PROC steps are
//! skipped. A later step writing the same dataset replaces the earlier
//! record in place.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::ast::visit::{walk_data_step, Visitor};
use crate::ast::{DataStep, Program, Statement, Variable};

/// Records keyed by dataset name, in the order datasets were first written.
pub type Lineage = IndexMap<String, LineageRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    DataStep,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::DataStep => "data_step",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dataflow summary of one DATA step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRecord {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    /// Assignment targets in encounter order, repeats kept.
    pub columns_created: Vec<String>,
    /// Every variable read, sorted and unique.
    pub columns_used: Vec<String>,
    /// Rendered WHERE condition, at most one.
    pub filters: Vec<String>,
    pub keys: Vec<String>,
    pub operation: Operation,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LineageExtractor;

impl LineageExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, program: &Program) -> Lineage {
        let mut lineage = Lineage::new();
        for step in program.data_steps() {
            let Some(primary) = step.primary_output() else {
                trace!("skipping data step without outputs");
                continue;
            };
            let record = self.record(step);
            trace!("{primary}: {} inputs, {} columns used", record.inputs.len(), record.columns_used.len());
            lineage.insert(primary.name(), record);
        }
        debug!("extracted lineage for {} datasets", lineage.len());
        lineage
    }

    /// The record for one step, whatever its outputs.
    pub fn record(&self, step: &DataStep) -> LineageRecord {
        let inputs = match (&step.set, &step.merge) {
            (Some(set), _) => vec![set.dataset.name()],
            (None, Some(merge)) => merge.dataset_refs().map(|d| d.name()).collect(),
            (None, None) => Vec::new(),
        };

        LineageRecord {
            inputs,
            outputs: step.outputs.iter().map(|d| d.name()).collect(),
            columns_created: columns_created(&step.statements),
            columns_used: columns_used(step),
            filters: step
                .where_clause
                .iter()
                .map(|clause| clause.condition.to_string())
                .collect(),
            keys: step
                .by
                .iter()
                .flat_map(|by| by.variables.iter().map(|v| v.name.clone()))
                .collect(),
            operation: Operation::DataStep,
        }
    }
}

/// Convenience for `LineageExtractor::new().extract(program)`.
pub fn extract_lineage(program: &Program) -> Lineage {
    LineageExtractor::new().extract(program)
}

/// Top-level assignment targets, plus assignments in either branch of a
/// top-level IF (following ELSE IF chains).
fn columns_created(statements: &[Statement]) -> Vec<String> {
    let mut created = Vec::new();
    for statement in statements {
        collect_created(statement, true, &mut created);
    }
    created
}

fn collect_created(statement: &Statement, top: bool, created: &mut Vec<String>) {
    match statement {
        Statement::Assignment(assignment) => created.push(assignment.variable.name.clone()),
        Statement::If(stmt) if top => {
            collect_created(&stmt.then_statement, false, created);
            if let Some(else_statement) = &stmt.else_statement {
                // ELSE IF continues the same chain
                collect_created(else_statement, true, created);
            }
        }
        _ => {}
    }
}

#[derive(Default)]
struct ColumnsUsed(BTreeSet<String>);

impl Visitor for ColumnsUsed {
    fn visit_variable(&mut self, variable: &Variable) {
        self.0.insert(variable.name.clone());
    }
}

fn columns_used(step: &DataStep) -> Vec<String> {
    let mut used = ColumnsUsed::default();
    walk_data_step(&mut used, step);
    used.0.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn assign(name: &str, expr: Expression) -> Statement {
        Statement::Assignment(Assignment {
            variable: Variable::new(name),
            expression: expr,
        })
    }

    fn step(outputs: &[&str], statements: Vec<Statement>) -> Step {
        Step::Data(DataStep {
            outputs: outputs.iter().map(|o| DatasetRef::new(*o)).collect(),
            statements,
            ..DataStep::default()
        })
    }

    #[test]
    fn created_columns_keep_repeats_and_follow_if_branches() {
        let stmts = vec![
            assign("a", Literal::integer(1).into()),
            assign("a", Literal::integer(2).into()),
            Statement::If(IfStatement {
                condition: Expression::variable("x").into(),
                then_statement: Box::new(assign("b", Literal::integer(1).into())),
                else_statement: Some(Box::new(Statement::If(IfStatement {
                    condition: Expression::variable("y").into(),
                    then_statement: Box::new(assign("c", Literal::integer(1).into())),
                    else_statement: Some(Box::new(assign("d", Literal::integer(1).into()))),
                }))),
            }),
            Statement::DoBlock(DoBlock {
                statements: vec![assign("hidden", Literal::integer(0).into())],
            }),
        ];
        assert_eq!(columns_created(&stmts), ["a", "a", "b", "c", "d"]);
    }

    #[test]
    fn then_block_assignments_are_not_created_columns() {
        let stmts = vec![Statement::If(IfStatement {
            condition: Expression::variable("x").into(),
            then_statement: Box::new(Statement::DoBlock(DoBlock {
                statements: vec![assign("inner", Literal::integer(1).into())],
            })),
            else_statement: None,
        })];
        assert!(columns_created(&stmts).is_empty());
    }

    #[test]
    fn later_step_overwrites_in_place() {
        let program = Program {
            steps: vec![
                step(&["a"], vec![assign("first", Literal::integer(1).into())]),
                step(&["b"], vec![]),
                step(&["a", "extra"], vec![assign("second", Literal::integer(1).into())]),
            ],
        };
        let lineage = extract_lineage(&program);
        let keys: Vec<_> = lineage.keys().cloned().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(lineage["a"].columns_created, ["second"]);
        assert_eq!(lineage["a"].outputs, ["a", "extra"]);
    }

    #[test]
    fn steps_without_outputs_and_procs_are_skipped() {
        let program = Program {
            steps: vec![
                step(&[], vec![]),
                Step::Proc(ProcStep {
                    procedure: "print".into(),
                    dataset: Some(DatasetRef::new("a")),
                    options: vec![],
                    statements: vec![],
                }),
            ],
        };
        assert!(LineageExtractor::new().extract(&program).is_empty());
    }

    #[test]
    fn operation_serialises_as_data_step() {
        assert_eq!(
            serde_json::to_string(&Operation::DataStep).unwrap(),
            "\"data_step\""
        );
        assert_eq!(Operation::DataStep.to_string(), "data_step");
    }
}
