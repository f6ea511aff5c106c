//! # Transformer
//!
//! Bottom-up rewrite of a [`CstNode`] tree into a typed [`Program`].
//!
//! Every node's children are transformed first; the node's own rule then
//! sees only those already-built values ([`Built`]) and never looks further
//! down. Each grammar production maps to exactly one construction rule.
//!
//! ## Disambiguation
//!
//! - A dotted name in expression position is a [`Variable`] with one part
//!   and a [`DatasetRef`] with two, wherever it appears.
//! - An option's value shape is chosen by its name alone: `keep` / `drop`
//!   build a name list, `rename` a pair list, anything else one expression.
//! - A PROC step's `data=` option becomes the step's dataset.
//! - The fourth child of an iterative DO is the step value unless it is a
//!   statement.
//!
//! Any child shape a rule does not accept is a [`LineageError::Transform`]
//! naming the rule and the shape it got. There is no partial result.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::ast::*;
use crate::diagnostics::LineageError;
use crate::syntax::cst::CstNode;
use crate::syntax::parser::Rule;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Builds the program from a parse tree rooted at `program`.
pub fn transform(tree: &CstNode) -> Result<Program, LineageError> {
    match build(tree)? {
        Built::Program(program) => {
            debug!("transformed {} steps", program.steps.len());
            Ok(program)
        }
        other => Err(LineageError::transform(
            "program",
            format!("[{}]", other.kind()),
            tree.span,
        )),
    }
}

// ============================================================================
// INTERMEDIATE VALUES
// ============================================================================

/// The value a parse-tree node transforms into, before its parent groups it.
#[derive(Debug)]
enum Built {
    Token(String),
    Expr(Expression),
    Var(Variable),
    Dataset(DatasetRef),
    Opt(DatasetOption),
    Rename(RenamePair),
    Item(InputItem),
    Group(Vec<Variable>, String),
    Retain(RetainItem),
    Label(Label),
    MergeInput(MergeDataset),
    Stmt(Statement),
    Else(Statement),
    Step(Step),
    Program(Program),
}

impl Built {
    fn kind(&self) -> &'static str {
        match self {
            Built::Token(_) => "token",
            Built::Expr(_) => "expression",
            Built::Var(_) => "variable",
            Built::Dataset(_) => "dataset",
            Built::Opt(_) => "option",
            Built::Rename(_) => "rename pair",
            Built::Item(_) => "input item",
            Built::Group(..) => "group",
            Built::Retain(_) => "retain item",
            Built::Label(_) => "label",
            Built::MergeInput(_) => "merge input",
            Built::Stmt(statement) => statement.kind(),
            Built::Else(_) => "else",
            Built::Step(_) => "step",
            Built::Program(_) => "program",
        }
    }

    fn into_token(self) -> Option<String> {
        match self {
            Built::Token(token) => Some(token),
            _ => None,
        }
    }

    fn into_expr(self) -> Option<Expression> {
        match self {
            Built::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    fn into_var(self) -> Option<Variable> {
        match self {
            Built::Var(var) => Some(var),
            _ => None,
        }
    }

    fn into_dataset(self) -> Option<DatasetRef> {
        match self {
            Built::Dataset(dataset) => Some(dataset),
            _ => None,
        }
    }

    fn into_option(self) -> Option<DatasetOption> {
        match self {
            Built::Opt(option) => Some(option),
            _ => None,
        }
    }

    fn into_rename(self) -> Option<RenamePair> {
        match self {
            Built::Rename(pair) => Some(pair),
            _ => None,
        }
    }

    fn into_item(self) -> Option<InputItem> {
        match self {
            Built::Item(item) => Some(item),
            _ => None,
        }
    }

    fn into_group(self) -> Option<(Vec<Variable>, String)> {
        match self {
            Built::Group(variables, spec) => Some((variables, spec)),
            _ => None,
        }
    }

    fn into_retain(self) -> Option<RetainItem> {
        match self {
            Built::Retain(item) => Some(item),
            _ => None,
        }
    }

    fn into_label(self) -> Option<Label> {
        match self {
            Built::Label(label) => Some(label),
            _ => None,
        }
    }

    fn into_merge_input(self) -> Option<MergeDataset> {
        match self {
            Built::MergeInput(input) => Some(input),
            _ => None,
        }
    }

    fn into_stmt(self) -> Option<Statement> {
        match self {
            Built::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }

    fn into_else(self) -> Option<Statement> {
        match self {
            Built::Else(stmt) => Some(stmt),
            _ => None,
        }
    }

    fn into_step(self) -> Option<Step> {
        match self {
            Built::Step(step) => Some(step),
            _ => None,
        }
    }
}

/// The transformed children of one node, consumed front to back.
struct Args {
    rule: Rule,
    span: Span,
    shape: String,
    items: VecDeque<Built>,
}

impl Args {
    fn new(node: &CstNode, items: Vec<Built>) -> Self {
        let shape = format!(
            "[{}]",
            items.iter().map(Built::kind).collect::<Vec<_>>().join(", ")
        );
        Self {
            rule: node.rule,
            span: node.span,
            shape,
            items: items.into(),
        }
    }

    /// The rule cannot use the children it was given.
    fn error(&self) -> LineageError {
        LineageError::transform(format!("{:?}", self.rule), self.shape.clone(), self.span)
    }

    /// The children are fine but break a step-level rule.
    fn conflict(&self, what: &str, help: &str) -> LineageError {
        LineageError::transform(format!("{:?}", self.rule), what, self.span).with_help(help)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn peek(&self) -> Option<&Built> {
        self.items.front()
    }

    /// Takes the next child, which must convert with `f`.
    fn take<T>(&mut self, f: impl FnOnce(Built) -> Option<T>) -> Result<T, LineageError> {
        let item = self.items.pop_front().ok_or_else(|| self.error())?;
        f(item).ok_or_else(|| self.error())
    }

    /// Takes the next child with `g` if `f` accepts it, leaving it otherwise.
    fn take_if<T>(
        &mut self,
        f: impl FnOnce(&Built) -> bool,
        g: impl FnOnce(Built) -> Option<T>,
    ) -> Option<T> {
        if self.items.front().is_some_and(f) {
            self.items.pop_front().and_then(g)
        } else {
            None
        }
    }

    /// Takes every remaining child; all must convert with `f`.
    fn rest<T>(&mut self, f: impl Fn(Built) -> Option<T>) -> Result<Vec<T>, LineageError> {
        let mut out = Vec::with_capacity(self.items.len());
        while let Some(item) = self.items.pop_front() {
            out.push(f(item).ok_or_else(|| self.error())?);
        }
        Ok(out)
    }

    /// Like [`Args::rest`] but at least one child is required.
    fn some<T>(&mut self, f: impl Fn(Built) -> Option<T>) -> Result<Vec<T>, LineageError> {
        if self.is_empty() {
            return Err(self.error());
        }
        self.rest(f)
    }

    /// No children may remain.
    fn done(&self) -> Result<(), LineageError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.error())
        }
    }
}

// ============================================================================
// DRIVER
// ============================================================================

fn build(node: &CstNode) -> Result<Built, LineageError> {
    let children = node
        .children
        .iter()
        .map(build)
        .collect::<Result<Vec<_>, _>>()?;
    apply(node, Args::new(node, children))
}

fn apply(node: &CstNode, mut args: Args) -> Result<Built, LineageError> {
    let built = match node.rule {
        // --- program & steps -------------------------------------------------
        Rule::program => Built::Program(Program {
            steps: args.rest(Built::into_step)?,
        }),
        Rule::data_step => data_step(args)?,
        Rule::proc_step => proc_step(args)?,
        Rule::proc_statement => {
            let keyword = args.take(Built::into_token)?.to_lowercase();
            let arguments = args.rest(Built::into_token)?;
            Built::Stmt(Statement::Generic(GenericStatement { keyword, arguments }))
        }

        // --- leaves ------------------------------------------------------------
        Rule::identifier
        | Rule::proc_name
        | Rule::statement_keyword
        | Rule::raw_token
        | Rule::option_name
        | Rule::fileref
        | Rule::input_format
        | Rule::format_name
        | Rule::length_spec
        | Rule::or_op
        | Rule::and_op
        | Rule::comparison_op
        | Rule::additive_op
        | Rule::multiplicative_op
        | Rule::unary_op => Built::Token(node.text.clone()),
        Rule::var_name => Built::Var(Variable::new(node.text.clone())),
        Rule::number => Built::Expr(Expression::Literal(number(node, &args)?)),
        Rule::string => Built::Expr(Expression::Literal(Literal::String(unquote(&node.text)))),

        // --- names -------------------------------------------------------------
        Rule::variable => {
            let parts = args.some(Built::into_token)?;
            match <[String; 1]>::try_from(parts) {
                Ok([name]) => Built::Expr(Expression::Variable(Variable::new(name))),
                Err(parts) => Built::Expr(Expression::Dataset(dotted(parts, &args)?)),
            }
        }
        Rule::dataset_ref => {
            let parts = args.some(Built::into_token)?;
            match <[String; 1]>::try_from(parts) {
                Ok([name]) => Built::Dataset(DatasetRef::new(name)),
                Err(parts) => Built::Dataset(dotted(parts, &args)?),
            }
        }

        // --- statements --------------------------------------------------------
        Rule::assignment | Rule::then_assignment => {
            let variable = args.take(Built::into_var)?;
            let expression = args.take(Built::into_expr)?;
            args.done()?;
            Built::Stmt(Statement::Assignment(Assignment {
                variable,
                expression,
            }))
        }
        Rule::set_stmt => {
            let dataset = args.take(Built::into_dataset)?;
            let options = args.rest(Built::into_option)?;
            Built::Stmt(Statement::Set(SetStatement { dataset, options }))
        }
        Rule::merge_dataset => {
            let dataset = args.take(Built::into_dataset)?;
            let options = args.rest(Built::into_option)?;
            Built::MergeInput(MergeDataset { dataset, options })
        }
        Rule::merge_stmt => {
            if args.len() < 2 {
                return Err(args.error());
            }
            Built::Stmt(Statement::Merge(MergeStatement {
                datasets: args.rest(Built::into_merge_input)?,
            }))
        }
        Rule::by_stmt => Built::Stmt(Statement::By(ByStatement {
            variables: args.some(Built::into_var)?,
        })),
        Rule::where_stmt => {
            let condition = args.take(Built::into_expr)?.into();
            args.done()?;
            Built::Stmt(Statement::Where(WhereClause { condition }))
        }
        Rule::if_stmt => {
            let condition = args.take(Built::into_expr)?.into();
            let then_statement = Box::new(args.take(Built::into_stmt)?);
            let else_statement = args
                .take_if(|b| matches!(b, Built::Else(_)), Built::into_else)
                .map(Box::new);
            args.done()?;
            Built::Stmt(Statement::If(IfStatement {
                condition,
                then_statement,
                else_statement,
            }))
        }
        Rule::else_clause => {
            let stmt = args.take(Built::into_stmt)?;
            args.done()?;
            Built::Else(stmt)
        }
        Rule::output_stmt | Rule::then_output => {
            let dataset = args.take_if(|b| matches!(b, Built::Dataset(_)), Built::into_dataset);
            args.done()?;
            Built::Stmt(Statement::Output(OutputStatement { dataset }))
        }
        Rule::stop_stmt | Rule::then_stop => {
            args.done()?;
            Built::Stmt(Statement::Stop)
        }
        Rule::delete_stmt | Rule::then_delete => {
            args.done()?;
            Built::Stmt(Statement::Delete)
        }

        // --- blocks ------------------------------------------------------------
        Rule::do_block => Built::Stmt(Statement::DoBlock(DoBlock {
            statements: args.rest(Built::into_stmt)?,
        })),
        Rule::do_while => {
            let condition = args.take(Built::into_expr)?.into();
            let statements = args.rest(Built::into_stmt)?;
            Built::Stmt(Statement::DoWhile(DoWhileLoop {
                condition,
                statements,
            }))
        }
        Rule::do_until => {
            let condition = args.take(Built::into_expr)?.into();
            let statements = args.rest(Built::into_stmt)?;
            Built::Stmt(Statement::DoUntil(DoUntilLoop {
                condition,
                statements,
            }))
        }
        Rule::do_iterative => {
            let variable = args.take(Built::into_var)?;
            let start = args.take(Built::into_expr)?;
            let end = args.take(Built::into_expr)?;
            let step = match args.peek() {
                None | Some(Built::Stmt(_)) => None,
                Some(_) => Some(args.take(Built::into_expr)?),
            };
            let statements = args.rest(Built::into_stmt)?;
            Built::Stmt(Statement::IterativeDo(IterativeDoLoop {
                variable,
                start,
                end,
                step,
                statements,
            }))
        }

        // --- variable lists ----------------------------------------------------
        Rule::keep_stmt => Built::Stmt(Statement::Keep(KeepStatement {
            variables: args.some(Built::into_var)?,
        })),
        Rule::drop_stmt => Built::Stmt(Statement::Drop(DropStatement {
            variables: args.some(Built::into_var)?,
        })),
        Rule::rename_stmt => Built::Stmt(Statement::Rename(RenameStatement {
            renames: args.some(Built::into_rename)?,
        })),
        Rule::rename_pair => {
            let old = args.take(Built::into_var)?;
            let new = args.take(Built::into_var)?;
            args.done()?;
            Built::Rename(RenamePair { old, new })
        }

        // --- file i/o ----------------------------------------------------------
        Rule::input_stmt => Built::Stmt(Statement::Input(InputStatement {
            items: args.some(Built::into_item)?,
        })),
        Rule::put_stmt => Built::Stmt(Statement::Put(PutStatement {
            items: args.some(Built::into_item)?,
        })),
        Rule::input_item => {
            let variable = args.take(Built::into_var)?;
            let format = args.take_if(|b| matches!(b, Built::Token(_)), Built::into_token);
            args.done()?;
            Built::Item(InputItem { variable, format })
        }
        Rule::infile_stmt => {
            let filename = file_spec(&mut args)?;
            let options = args.rest(Built::into_option)?;
            Built::Stmt(Statement::Infile(InfileStatement { filename, options }))
        }
        Rule::file_stmt => {
            let filename = file_spec(&mut args)?;
            let options = args.rest(Built::into_option)?;
            Built::Stmt(Statement::File(FileStatement { filename, options }))
        }

        // --- attributes --------------------------------------------------------
        Rule::format_group | Rule::length_group => {
            let mut variables = Vec::new();
            while let Some(var) = args.take_if(|b| matches!(b, Built::Var(_)), Built::into_var) {
                variables.push(var);
            }
            if variables.is_empty() {
                return Err(args.error());
            }
            let spec = args.take(Built::into_token)?;
            args.done()?;
            Built::Group(variables, spec)
        }
        Rule::format_stmt => Built::Stmt(Statement::Format(FormatStatement {
            formats: format_groups(&mut args)?,
        })),
        Rule::informat_stmt => Built::Stmt(Statement::Informat(InformatStatement {
            formats: format_groups(&mut args)?,
        })),
        Rule::length_stmt => {
            let lengths = args
                .some(Built::into_group)?
                .into_iter()
                .map(|(variables, length)| LengthGroup { variables, length })
                .collect();
            Built::Stmt(Statement::Length(LengthStatement { lengths }))
        }
        Rule::label_stmt => Built::Stmt(Statement::Label(LabelStatement {
            labels: args.some(Built::into_label)?,
        })),
        Rule::label_pair => {
            let variable = args.take(Built::into_var)?;
            let label = match args.take(Built::into_expr)? {
                Expression::Literal(Literal::String(text)) => text,
                _ => return Err(args.error()),
            };
            args.done()?;
            Built::Label(Label { variable, label })
        }
        Rule::retain_stmt => Built::Stmt(Statement::Retain(RetainStatement {
            items: args.some(Built::into_retain)?,
        })),
        Rule::retain_item => {
            let variable = args.take(Built::into_var)?;
            let initial = args.take_if(|b| matches!(b, Built::Expr(_)), Built::into_expr);
            args.done()?;
            Built::Retain(RetainItem { variable, initial })
        }
        Rule::negative_number => {
            let operand = args.take(Built::into_expr)?;
            args.done()?;
            Built::Expr(Expression::unary(UnaryOperator::Neg, operand))
        }

        // --- options -----------------------------------------------------------
        Rule::dataset_option => dataset_option(args)?,
        Rule::flag_option => {
            let name = args.take(Built::into_token)?;
            args.done()?;
            Built::Opt(DatasetOption::new(name, OptionValue::Flag))
        }

        // --- expressions -------------------------------------------------------
        Rule::expression | Rule::conjunction | Rule::sum | Rule::product => fold_binary(args)?,
        Rule::condition => match args.len() {
            1 => Built::Expr(args.take(Built::into_expr)?),
            3 => {
                let left = args.take(Built::into_expr)?;
                let token = args.take(Built::into_token)?;
                let operator = BinaryOperator::from_token(&token)
                    .filter(BinaryOperator::is_comparison)
                    .ok_or_else(|| args.error())?;
                let right = args.take(Built::into_expr)?;
                Built::Expr(Expression::binary(left, operator, right))
            }
            _ => return Err(args.error()),
        },
        Rule::unary => match args.len() {
            1 => Built::Expr(args.take(Built::into_expr)?),
            2 => {
                let token = args.take(Built::into_token)?;
                let operator = UnaryOperator::from_token(&token).ok_or_else(|| args.error())?;
                let operand = args.take(Built::into_expr)?;
                Built::Expr(Expression::unary(operator, operand))
            }
            _ => return Err(args.error()),
        },
        Rule::function_call => {
            let name = args.take(Built::into_token)?;
            let arguments = args.rest(Built::into_expr)?;
            Built::Expr(Expression::Call(FunctionCall { name, arguments }))
        }

        _ => return Err(args.error()),
    };
    Ok(built)
}

// ============================================================================
// STEP RULES
// ============================================================================

/// Outputs first, then statements. Step-level SET / MERGE / BY / WHERE move
/// into their own fields; a second one of any, or SET with MERGE, is an
/// error.
fn data_step(mut args: Args) -> Result<Built, LineageError> {
    let mut step = DataStep::default();
    while let Some(dataset) = args.take_if(|b| matches!(b, Built::Dataset(_)), Built::into_dataset) {
        step.outputs.push(dataset);
    }

    for statement in args.rest(Built::into_stmt)? {
        match statement {
            Statement::Set(set) => {
                if step.set.is_some() {
                    return Err(args.conflict(
                        "a second SET statement",
                        "list every input in one SET statement",
                    ));
                }
                if step.merge.is_some() {
                    return Err(args.conflict(
                        "SET together with MERGE",
                        "use either SET or MERGE in a DATA step, not both",
                    ));
                }
                step.set = Some(set);
            }
            Statement::Merge(merge) => {
                if step.merge.is_some() {
                    return Err(args.conflict(
                        "a second MERGE statement",
                        "list every input in one MERGE statement",
                    ));
                }
                if step.set.is_some() {
                    return Err(args.conflict(
                        "SET together with MERGE",
                        "use either SET or MERGE in a DATA step, not both",
                    ));
                }
                step.merge = Some(merge);
            }
            Statement::By(by) => {
                if step.by.is_some() {
                    return Err(args.conflict(
                        "a second BY statement",
                        "list every key in one BY statement",
                    ));
                }
                step.by = Some(by);
            }
            Statement::Where(clause) => {
                if step.where_clause.is_some() {
                    return Err(args.conflict(
                        "a second WHERE statement",
                        "join the conditions with AND in one WHERE statement",
                    ));
                }
                step.where_clause = Some(clause);
            }
            other => step.statements.push(other),
        }
    }

    trace!(
        "data step {:?}: {} body statements",
        step.primary_output().map(DatasetRef::name),
        step.statements.len()
    );
    Ok(Built::Step(Step::Data(step)))
}

/// Name, options, statements. A `data=` option becomes the step's dataset.
fn proc_step(mut args: Args) -> Result<Built, LineageError> {
    let procedure = args.take(Built::into_token)?.to_lowercase();
    let mut dataset = None;
    let mut options = Vec::new();
    while let Some(option) = args.take_if(|b| matches!(b, Built::Opt(_)), Built::into_option) {
        if !option.is_named("data") {
            options.push(option);
            continue;
        }
        if dataset.is_some() {
            return Err(args.conflict(
                "a second data= option",
                "name a single input dataset with data=",
            ));
        }
        dataset = Some(match option.value {
            OptionValue::Scalar(Expression::Variable(variable)) => DatasetRef::new(variable.name),
            OptionValue::Scalar(Expression::Dataset(reference)) => reference,
            _ => {
                return Err(args.conflict(
                    "a data= option that is not a dataset name",
                    "write data= as a dataset name such as lib.table",
                ))
            }
        });
    }
    let statements = args.rest(Built::into_stmt)?;

    trace!("proc {procedure}: {} statements", statements.len());
    Ok(Built::Step(Step::Proc(ProcStep {
        procedure,
        dataset,
        options,
        statements,
    })))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Chooses the value shape from the option name.
fn dataset_option(mut args: Args) -> Result<Built, LineageError> {
    let name = args.take(Built::into_token)?;
    let value = match name.to_ascii_lowercase().as_str() {
        "keep" | "drop" => OptionValue::VarList(args.some(Built::into_var)?),
        "rename" => OptionValue::RenamePairs(args.some(Built::into_rename)?),
        _ => {
            let value = args.take(Built::into_expr)?;
            args.done()?;
            OptionValue::Scalar(value)
        }
    };
    Ok(Built::Opt(DatasetOption::new(name, value)))
}

/// Folds `operand (op operand)*` to the left.
fn fold_binary(mut args: Args) -> Result<Built, LineageError> {
    let mut left = args.take(Built::into_expr)?;
    while !args.is_empty() {
        let token = args.take(Built::into_token)?;
        let operator = BinaryOperator::from_token(&token).ok_or_else(|| args.error())?;
        let right = args.take(Built::into_expr)?;
        left = Expression::binary(left, operator, right);
    }
    Ok(Built::Expr(left))
}

fn format_groups(args: &mut Args) -> Result<Vec<FormatGroup>, LineageError> {
    Ok(args
        .some(Built::into_group)?
        .into_iter()
        .map(|(variables, format)| FormatGroup { variables, format })
        .collect())
}

/// A quoted path arrives as a string literal, a fileref as a token.
fn file_spec(args: &mut Args) -> Result<FileSpec, LineageError> {
    let spec = match args.items.pop_front() {
        Some(Built::Expr(Expression::Literal(Literal::String(path)))) => FileSpec::Path(path),
        Some(Built::Token(name)) => FileSpec::Fileref(name),
        _ => return Err(args.error()),
    };
    Ok(spec)
}

fn dotted(parts: Vec<String>, args: &Args) -> Result<DatasetRef, LineageError> {
    match <[String; 2]>::try_from(parts) {
        Ok([library, dataset]) => Ok(DatasetRef::qualified(library, dataset)),
        Err(_) => Err(args.error()),
    }
}

/// Integer iff the token has no decimal point.
fn number(node: &CstNode, args: &Args) -> Result<Literal, LineageError> {
    let text = node.text.as_str();
    if text.contains('.') {
        text.parse::<f64>().map(Literal::float).map_err(|_| args.error())
    } else {
        text.parse::<i64>().map(Literal::integer).map_err(|_| {
            LineageError::transform("number", format!("integer literal `{text}` out of range"), node.span)
        })
    }
}

/// Strips the delimiting quotes. No escape processing.
fn unquote(text: &str) -> String {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('\'' | '"')), Some(close)) if open == close => chars.as_str().to_string(),
        _ => text.to_string(),
    }
}
