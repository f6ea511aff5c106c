//! Read-only traversal over the AST.
//!
//! Implementors override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to keep descending. Each walk function matches
//! every variant of the node it handles, so adding a variant fails to compile
//! until the traversal decides what to do with it.
//!
//! The walk reports *reads*: [`Visitor::visit_variable`] fires for variables
//! in expression position, BY lists and PUT lists. Assignment targets, loop
//! indices and declarative name lists (KEEP, DROP, RENAME, LENGTH, FORMAT,
//! INFORMAT, LABEL, INPUT, RETAIN, keep/drop/rename options) are not reads
//! and are not reported.

use super::*;

pub trait Visitor: Sized {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_data_step(&mut self, step: &DataStep) {
        walk_data_step(self, step);
    }

    fn visit_proc_step(&mut self, step: &ProcStep) {
        walk_proc_step(self, step);
    }

    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_option(&mut self, option: &DatasetOption) {
        walk_option(self, option);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }

    /// A variable being read.
    fn visit_variable(&mut self, _variable: &Variable) {}

    /// A dataset being read: SET / MERGE inputs, PROC `data=` and dataset
    /// names in expression position.
    fn visit_dataset_ref(&mut self, _dataset: &DatasetRef) {}
}

pub fn walk_program<V: Visitor>(visitor: &mut V, program: &Program) {
    for step in &program.steps {
        match step {
            Step::Data(data) => visitor.visit_data_step(data),
            Step::Proc(proc) => visitor.visit_proc_step(proc),
        }
    }
}

/// Walks step-level SET / MERGE / BY / WHERE, then the body.
pub fn walk_data_step<V: Visitor>(visitor: &mut V, step: &DataStep) {
    if let Some(set) = &step.set {
        walk_set(visitor, set);
    }
    if let Some(merge) = &step.merge {
        walk_merge(visitor, merge);
    }
    if let Some(by) = &step.by {
        walk_variables(visitor, &by.variables);
    }
    if let Some(clause) = &step.where_clause {
        visitor.visit_expression(&clause.condition.expression);
    }
    walk_statements(visitor, &step.statements);
}

pub fn walk_proc_step<V: Visitor>(visitor: &mut V, step: &ProcStep) {
    if let Some(dataset) = &step.dataset {
        visitor.visit_dataset_ref(dataset);
    }
    for option in &step.options {
        visitor.visit_option(option);
    }
    walk_statements(visitor, &step.statements);
}

pub fn walk_statements<V: Visitor>(visitor: &mut V, statements: &[Statement]) {
    for statement in statements {
        visitor.visit_statement(statement);
    }
}

fn walk_variables<V: Visitor>(visitor: &mut V, variables: &[Variable]) {
    for variable in variables {
        visitor.visit_variable(variable);
    }
}

fn walk_set<V: Visitor>(visitor: &mut V, set: &SetStatement) {
    visitor.visit_dataset_ref(&set.dataset);
    for option in &set.options {
        visitor.visit_option(option);
    }
}

fn walk_merge<V: Visitor>(visitor: &mut V, merge: &MergeStatement) {
    for input in &merge.datasets {
        visitor.visit_dataset_ref(&input.dataset);
        for option in &input.options {
            visitor.visit_option(option);
        }
    }
}

pub fn walk_statement<V: Visitor>(visitor: &mut V, statement: &Statement) {
    match statement {
        Statement::Assignment(assignment) => visitor.visit_expression(&assignment.expression),
        Statement::If(stmt) => {
            visitor.visit_expression(&stmt.condition.expression);
            visitor.visit_statement(&stmt.then_statement);
            if let Some(else_statement) = &stmt.else_statement {
                visitor.visit_statement(else_statement);
            }
        }
        Statement::Set(set) => walk_set(visitor, set),
        Statement::Merge(merge) => walk_merge(visitor, merge),
        Statement::By(by) => walk_variables(visitor, &by.variables),
        Statement::Where(clause) => visitor.visit_expression(&clause.condition.expression),
        Statement::Put(put) => {
            for item in &put.items {
                visitor.visit_variable(&item.variable);
            }
        }
        Statement::Infile(InfileStatement { options, .. })
        | Statement::File(FileStatement { options, .. }) => {
            for option in options {
                visitor.visit_option(option);
            }
        }
        Statement::DoBlock(block) => walk_statements(visitor, &block.statements),
        Statement::DoWhile(lp) => {
            visitor.visit_expression(&lp.condition.expression);
            walk_statements(visitor, &lp.statements);
        }
        Statement::DoUntil(lp) => {
            visitor.visit_expression(&lp.condition.expression);
            walk_statements(visitor, &lp.statements);
        }
        Statement::IterativeDo(lp) => {
            visitor.visit_expression(&lp.start);
            visitor.visit_expression(&lp.end);
            if let Some(step) = &lp.step {
                visitor.visit_expression(step);
            }
            walk_statements(visitor, &lp.statements);
        }
        Statement::Retain(retain) => {
            for initial in retain.items.iter().filter_map(|item| item.initial.as_ref()) {
                visitor.visit_expression(initial);
            }
        }
        Statement::Keep(_)
        | Statement::Drop(_)
        | Statement::Rename(_)
        | Statement::Input(_)
        | Statement::Format(_)
        | Statement::Informat(_)
        | Statement::Label(_)
        | Statement::Output(_)
        | Statement::Length(_)
        | Statement::Stop
        | Statement::Delete
        | Statement::Generic(_) => {}
    }
}

/// Scalar option values are expressions; name lists and flags read nothing.
pub fn walk_option<V: Visitor>(visitor: &mut V, option: &DatasetOption) {
    match &option.value {
        OptionValue::Scalar(expression) => visitor.visit_expression(expression),
        OptionValue::VarList(_) | OptionValue::RenamePairs(_) | OptionValue::Flag => {}
    }
}

pub fn walk_expression<V: Visitor>(visitor: &mut V, expression: &Expression) {
    match expression {
        Expression::Variable(variable) => visitor.visit_variable(variable),
        Expression::Dataset(dataset) => visitor.visit_dataset_ref(dataset),
        Expression::Literal(_) => {}
        Expression::Binary(op) => {
            visitor.visit_expression(&op.left);
            visitor.visit_expression(&op.right);
        }
        Expression::Unary(op) => visitor.visit_expression(&op.operand),
        Expression::Call(call) => {
            for argument in &call.arguments {
                visitor.visit_expression(argument);
            }
        }
    }
}
