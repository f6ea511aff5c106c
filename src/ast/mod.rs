//! AST module for DATA / PROC step programs.
//!
//! Every construct of the language is one variant of a closed sum type:
//! [`Expression`] for values, [`Statement`] for statements and [`Step`] for
//! top-level steps. Nodes are plain owned data; the tree has no back
//! references and is never mutated after the transformer builds it.
//!
//! Rendering lives in [`display`] (`Display` on every node is the canonical
//! stringifier) and read-only traversal in [`visit`].

// ============================================================================
// IMPORTS
// ============================================================================

use serde::{Deserialize, Serialize};

pub mod display;
pub mod visit;

// ============================================================================
// SOURCE LOCATIONS
// ============================================================================

/// A byte range in the source text.
///
/// # Examples
///
/// ```rust
/// use sas_lineage::ast::Span;
/// let span = Span { start: 0, end: 5 };
/// assert_eq!(span.len(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// REFERENCES & LITERALS
// ============================================================================

/// A named dataset, optionally qualified by a library (`work.sales`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    pub library: Option<String>,
    pub dataset: String,
}

impl DatasetRef {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            library: None,
            dataset: dataset.into(),
        }
    }

    pub fn qualified(library: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            library: Some(library.into()),
            dataset: dataset.into(),
        }
    }

    /// The dotted name, `library.dataset` or `dataset`.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

/// A column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Number {
    Integer(i64),
    Float(f64),
}

/// A constant. String values keep their source text between the delimiting
/// quotes, with no escape processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Number(Number),
    String(String),
}

impl Literal {
    pub fn integer(value: i64) -> Self {
        Literal::Number(Number::Integer(value))
    }

    pub fn float(value: f64) -> Self {
        Literal::Number(Number::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Literal::String(value.into())
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
}

impl BinaryOperator {
    /// Maps an operator token, in any of its spellings, to its operator.
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token.to_ascii_lowercase().as_str() {
            "|" | "or" => Self::Or,
            "&" | "and" => Self::And,
            "=" | "eq" => Self::Eq,
            "^=" | "~=" | "ne" => Self::Ne,
            "<" | "lt" => Self::Lt,
            "<=" | "le" => Self::Le,
            ">" | "gt" => Self::Gt,
            ">=" | "ge" => Self::Ge,
            "+" => Self::Add,
            "-" => Self::Sub,
            "||" => Self::Concat,
            "*" => Self::Mul,
            "/" => Self::Div,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical spelling.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "=",
            Self::Ne => "^=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Concat => "||",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    Neg,
    Plus,
    Not,
}

impl UnaryOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "-" => Some(Self::Neg),
            "+" => Some(Self::Plus),
            "not" => Some(Self::Not),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
            Self::Not => "not",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOperation {
    pub left: Box<Expression>,
    pub operator: BinaryOperator,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOperation {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Expression>,
}

/// A value-producing expression.
///
/// A one-part dotted name in expression position is a [`Variable`]; a
/// two-part name is a [`DatasetRef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Variable(Variable),
    Dataset(DatasetRef),
    Literal(Literal),
    Binary(BinaryOperation),
    Unary(UnaryOperation),
    Call(FunctionCall),
}

impl Expression {
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(Variable::new(name))
    }

    pub fn binary(left: Expression, operator: BinaryOperator, right: Expression) -> Self {
        Expression::Binary(BinaryOperation {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    pub fn unary(operator: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary(UnaryOperation {
            operator,
            operand: Box::new(operand),
        })
    }
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Literal(literal)
    }
}

/// The predicate of an IF, WHERE or conditional loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub expression: Expression,
}

impl From<Expression> for Condition {
    fn from(expression: Expression) -> Self {
        Self { expression }
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePair {
    pub old: Variable,
    pub new: Variable,
}

/// The value of a dataset or statement option. The shape is fixed when the
/// option is built, from its name: `keep`/`drop` take a name list, `rename`
/// takes pairs, anything else one expression. A bare option is a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionValue {
    Scalar(Expression),
    VarList(Vec<Variable>),
    RenamePairs(Vec<RenamePair>),
    Flag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOption {
    pub name: String,
    pub value: OptionValue,
}

impl DatasetOption {
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

// ============================================================================
// STATEMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub variable: Variable,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub condition: Condition,
    pub then_statement: Box<Statement>,
    pub else_statement: Option<Box<Statement>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetStatement {
    pub dataset: DatasetRef,
    pub options: Vec<DatasetOption>,
}

/// One input of a MERGE with its own dataset options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeDataset {
    pub dataset: DatasetRef,
    pub options: Vec<DatasetOption>,
}

impl MergeDataset {
    pub fn new(dataset: DatasetRef) -> Self {
        Self {
            dataset,
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeStatement {
    /// At least two.
    pub datasets: Vec<MergeDataset>,
}

impl MergeStatement {
    /// Options of every merged dataset, in declaration order.
    pub fn options(&self) -> impl Iterator<Item = &DatasetOption> {
        self.datasets.iter().flat_map(|d| d.options.iter())
    }

    pub fn dataset_refs(&self) -> impl Iterator<Item = &DatasetRef> {
        self.datasets.iter().map(|d| &d.dataset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByStatement {
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeepStatement {
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropStatement {
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameStatement {
    pub renames: Vec<RenamePair>,
}

/// A variable of an INPUT or PUT list with its optional format (`$`, `8.2`,
/// `dollar12.2`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    pub variable: Variable,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputStatement {
    pub items: Vec<InputItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutStatement {
    pub items: Vec<InputItem>,
}

/// Target of INFILE / FILE: a quoted path or a fileref name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSpec {
    Path(String),
    Fileref(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfileStatement {
    pub filename: FileSpec,
    pub options: Vec<DatasetOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStatement {
    pub filename: FileSpec,
    pub options: Vec<DatasetOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatGroup {
    pub variables: Vec<Variable>,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatStatement {
    pub formats: Vec<FormatGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformatStatement {
    pub formats: Vec<FormatGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub variable: Variable,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelStatement {
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoBlock {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoWhileLoop {
    pub condition: Condition,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoUntilLoop {
    pub condition: Condition,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterativeDoLoop {
    pub variable: Variable,
    pub start: Expression,
    pub end: Expression,
    pub step: Option<Expression>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputStatement {
    pub dataset: Option<DatasetRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainItem {
    pub variable: Variable,
    pub initial: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainStatement {
    pub items: Vec<RetainItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthGroup {
    pub variables: Vec<Variable>,
    /// `$20` or `8`.
    pub length: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthStatement {
    pub lengths: Vec<LengthGroup>,
}

/// A procedure-specific statement kept as raw tokens (`VAR a b;`,
/// `TABLES x*y / chisq;`). The keyword is stored lower-case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericStatement {
    pub keyword: String,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Assignment(Assignment),
    If(IfStatement),
    Set(SetStatement),
    Merge(MergeStatement),
    By(ByStatement),
    Where(WhereClause),
    Keep(KeepStatement),
    Drop(DropStatement),
    Rename(RenameStatement),
    Input(InputStatement),
    Put(PutStatement),
    Infile(InfileStatement),
    File(FileStatement),
    Format(FormatStatement),
    Informat(InformatStatement),
    Label(LabelStatement),
    DoBlock(DoBlock),
    DoWhile(DoWhileLoop),
    DoUntil(DoUntilLoop),
    IterativeDo(IterativeDoLoop),
    Output(OutputStatement),
    Retain(RetainStatement),
    Length(LengthStatement),
    Stop,
    Delete,
    Generic(GenericStatement),
}

impl Statement {
    /// Short lower-case name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Assignment(_) => "assignment",
            Statement::If(_) => "if",
            Statement::Set(_) => "set",
            Statement::Merge(_) => "merge",
            Statement::By(_) => "by",
            Statement::Where(_) => "where",
            Statement::Keep(_) => "keep",
            Statement::Drop(_) => "drop",
            Statement::Rename(_) => "rename",
            Statement::Input(_) => "input",
            Statement::Put(_) => "put",
            Statement::Infile(_) => "infile",
            Statement::File(_) => "file",
            Statement::Format(_) => "format",
            Statement::Informat(_) => "informat",
            Statement::Label(_) => "label",
            Statement::DoBlock(_) => "do",
            Statement::DoWhile(_) => "do while",
            Statement::DoUntil(_) => "do until",
            Statement::IterativeDo(_) => "iterative do",
            Statement::Output(_) => "output",
            Statement::Retain(_) => "retain",
            Statement::Length(_) => "length",
            Statement::Stop => "stop",
            Statement::Delete => "delete",
            Statement::Generic(_) => "generic",
        }
    }
}

// ============================================================================
// STEPS & PROGRAM
// ============================================================================

/// A DATA step. SET, MERGE, BY and WHERE written at step level are held in
/// their own fields; at most one of `set` and `merge` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataStep {
    pub outputs: Vec<DatasetRef>,
    pub set: Option<SetStatement>,
    pub merge: Option<MergeStatement>,
    pub by: Option<ByStatement>,
    pub where_clause: Option<WhereClause>,
    pub statements: Vec<Statement>,
}

impl DataStep {
    /// The first declared output.
    pub fn primary_output(&self) -> Option<&DatasetRef> {
        self.outputs.first()
    }
}

/// A PROC step. The `data=` option is lifted into `dataset`; the procedure
/// name is stored lower-case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcStep {
    pub procedure: String,
    pub dataset: Option<DatasetRef>,
    pub options: Vec<DatasetOption>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Data(DataStep),
    Proc(ProcStep),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Program {
    pub steps: Vec<Step>,
}

impl Program {
    pub fn data_steps(&self) -> impl Iterator<Item = &DataStep> {
        self.steps.iter().filter_map(|step| match step {
            Step::Data(data) => Some(data),
            Step::Proc(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_synonyms_normalise() {
        assert_eq!(BinaryOperator::from_token("NE"), Some(BinaryOperator::Ne));
        assert_eq!(BinaryOperator::from_token("~="), Some(BinaryOperator::Ne));
        assert_eq!(BinaryOperator::from_token("^="), Some(BinaryOperator::Ne));
        assert_eq!(BinaryOperator::from_token("eq"), Some(BinaryOperator::Eq));
        assert_eq!(BinaryOperator::from_token("||"), Some(BinaryOperator::Concat));
        assert_eq!(BinaryOperator::from_token("%"), None);
        assert!(BinaryOperator::Ge.is_comparison());
        assert!(!BinaryOperator::Concat.is_comparison());
    }

    #[test]
    fn merge_options_flatten_in_order() {
        let merge = MergeStatement {
            datasets: vec![
                MergeDataset {
                    dataset: DatasetRef::new("a"),
                    options: vec![DatasetOption::new(
                        "in",
                        OptionValue::Scalar(Expression::variable("ina")),
                    )],
                },
                MergeDataset::new(DatasetRef::new("b")),
                MergeDataset {
                    dataset: DatasetRef::new("c"),
                    options: vec![DatasetOption::new("in", OptionValue::Flag)],
                },
            ],
        };
        let names: Vec<_> = merge.options().map(|o| o.value.clone()).collect();
        assert_eq!(names.len(), 2);
        assert_eq!(names[1], OptionValue::Flag);
    }

    #[test]
    fn data_steps_skip_procs() {
        let program = Program {
            steps: vec![
                Step::Proc(ProcStep {
                    procedure: "print".into(),
                    dataset: None,
                    options: vec![],
                    statements: vec![],
                }),
                Step::Data(DataStep::default()),
            ],
        };
        assert_eq!(program.data_steps().count(), 1);
    }
}
