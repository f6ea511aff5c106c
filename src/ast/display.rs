//! Canonical rendering.
//!
//! `Display` on any node produces source text that reparses to an equal
//! tree. Keywords are upper-case, binary operations are fully
//! parenthesised, nested statements are indented two spaces per level and
//! top-level steps are separated by a blank line. Comments and original
//! layout are not reproduced.

use std::fmt::{self, Display, Formatter, Write};

use super::*;

const INDENT: &str = "  ";

fn indent(f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

/// Writes `items` separated by `sep`.
fn join<T: Display>(f: &mut Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Quotes a string value. A doubled delimiter inside a string is read back
/// verbatim, so a delimiter fits when every run of it in the value has even
/// length. Double quotes win when both fit.
fn write_quoted(f: &mut Formatter<'_>, value: &str) -> fmt::Result {
    let quote = if fits(value, '"') || !fits(value, '\'') {
        '"'
    } else {
        '\''
    };
    f.write_char(quote)?;
    f.write_str(value)?;
    f.write_char(quote)
}

fn fits(value: &str, delimiter: char) -> bool {
    let mut run = 0usize;
    for c in value.chars() {
        if c == delimiter {
            run += 1;
        } else if run % 2 == 1 {
            return false;
        } else {
            run = 0;
        }
    }
    run % 2 == 0
}

fn write_options(f: &mut Formatter<'_>, options: &[DatasetOption]) -> fmt::Result {
    if options.is_empty() {
        return Ok(());
    }
    f.write_char('(')?;
    join(f, options, " ")?;
    f.write_char(')')
}

// ============================================================================
// REFERENCES & EXPRESSIONS
// ============================================================================

impl Display for DatasetRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.library {
            Some(library) => write!(f, "{library}.{}", self.dataset),
            None => f.write_str(&self.dataset),
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(value) => write!(f, "{value}"),
            Number::Float(value) => {
                let text = value.to_string();
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{text}.0")
                }
            }
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(number) => write!(f, "{number}"),
            Literal::String(value) => write_quoted(f, value),
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Variable(variable) => write!(f, "{variable}"),
            Expression::Dataset(dataset) => write!(f, "{dataset}"),
            Expression::Literal(literal) => write!(f, "{literal}"),
            Expression::Binary(op) => write!(f, "({} {} {})", op.left, op.operator, op.right),
            Expression::Unary(op) => match op.operator {
                UnaryOperator::Not => write!(f, "not {}", op.operand),
                UnaryOperator::Neg | UnaryOperator::Plus => {
                    write!(f, "{}{}", op.operator, op.operand)
                }
            },
            Expression::Call(call) => {
                write!(f, "{}(", call.name)?;
                join(f, &call.arguments, ", ")?;
                f.write_char(')')
            }
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

impl Display for RenamePair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.old, self.new)
    }
}

impl Display for DatasetOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.value {
            OptionValue::Scalar(value) => write!(f, "{}={value}", self.name),
            OptionValue::VarList(variables) => {
                write!(f, "{}=", self.name)?;
                join(f, variables, " ")
            }
            OptionValue::RenamePairs(pairs) => {
                write!(f, "{}=(", self.name)?;
                join(f, pairs, " ")?;
                f.write_char(')')
            }
            OptionValue::Flag => f.write_str(&self.name),
        }
    }
}

impl Display for MergeDataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dataset)?;
        write_options(f, &self.options)
    }
}

impl Display for FileSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FileSpec::Path(path) => write_quoted(f, path),
            FileSpec::Fileref(name) => f.write_str(name),
        }
    }
}

impl Display for InputItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable)?;
        if let Some(format) = &self.format {
            write!(f, " {format}")?;
        }
        Ok(())
    }
}

impl Display for FormatGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        join(f, &self.variables, " ")?;
        write!(f, " {}", self.format)
    }
}

impl Display for LengthGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        join(f, &self.variables, " ")?;
        write!(f, " {}", self.length)
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}=", self.variable)?;
        write_quoted(f, &self.label)
    }
}

impl Display for RetainItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable)?;
        if let Some(initial) = &self.initial {
            write!(f, " {initial}")?;
        }
        Ok(())
    }
}

// ============================================================================
// STATEMENTS
// ============================================================================

/// Writes a statement whose first line is already indented; continuation
/// lines are indented to `depth`.
fn write_statement(f: &mut Formatter<'_>, statement: &Statement, depth: usize) -> fmt::Result {
    match statement {
        Statement::Assignment(a) => write!(f, "{} = {};", a.variable, a.expression),
        Statement::If(stmt) => {
            write!(f, "IF {} THEN ", stmt.condition)?;
            write_statement(f, &stmt.then_statement, depth)?;
            if let Some(else_statement) = &stmt.else_statement {
                f.write_char('\n')?;
                indent(f, depth)?;
                f.write_str("ELSE ")?;
                write_statement(f, else_statement, depth)?;
            }
            Ok(())
        }
        Statement::Set(set) => {
            write!(f, "SET {}", set.dataset)?;
            write_options(f, &set.options)?;
            f.write_char(';')
        }
        Statement::Merge(merge) => {
            f.write_str("MERGE ")?;
            join(f, &merge.datasets, " ")?;
            f.write_char(';')
        }
        Statement::By(by) => {
            f.write_str("BY ")?;
            join(f, &by.variables, " ")?;
            f.write_char(';')
        }
        Statement::Where(clause) => write!(f, "WHERE {};", clause.condition),
        Statement::Keep(keep) => {
            f.write_str("KEEP ")?;
            join(f, &keep.variables, " ")?;
            f.write_char(';')
        }
        Statement::Drop(drop) => {
            f.write_str("DROP ")?;
            join(f, &drop.variables, " ")?;
            f.write_char(';')
        }
        Statement::Rename(rename) => {
            f.write_str("RENAME ")?;
            join(f, &rename.renames, " ")?;
            f.write_char(';')
        }
        Statement::Input(input) => {
            f.write_str("INPUT ")?;
            join(f, &input.items, " ")?;
            f.write_char(';')
        }
        Statement::Put(put) => {
            f.write_str("PUT ")?;
            join(f, &put.items, " ")?;
            f.write_char(';')
        }
        Statement::Infile(infile) => {
            write!(f, "INFILE {}", infile.filename)?;
            for option in &infile.options {
                write!(f, " {option}")?;
            }
            f.write_char(';')
        }
        Statement::File(file) => {
            write!(f, "FILE {}", file.filename)?;
            for option in &file.options {
                write!(f, " {option}")?;
            }
            f.write_char(';')
        }
        Statement::Format(format) => {
            f.write_str("FORMAT ")?;
            join(f, &format.formats, " ")?;
            f.write_char(';')
        }
        Statement::Informat(informat) => {
            f.write_str("INFORMAT ")?;
            join(f, &informat.formats, " ")?;
            f.write_char(';')
        }
        Statement::Label(label) => {
            f.write_str("LABEL ")?;
            join(f, &label.labels, " ")?;
            f.write_char(';')
        }
        Statement::DoBlock(block) => {
            f.write_str("DO;")?;
            write_body(f, &block.statements, depth)
        }
        Statement::DoWhile(lp) => {
            write!(f, "DO WHILE {};", lp.condition)?;
            write_body(f, &lp.statements, depth)
        }
        Statement::DoUntil(lp) => {
            write!(f, "DO UNTIL {};", lp.condition)?;
            write_body(f, &lp.statements, depth)
        }
        Statement::IterativeDo(lp) => {
            write!(f, "DO {} = {} TO {}", lp.variable, lp.start, lp.end)?;
            if let Some(step) = &lp.step {
                write!(f, " BY {step}")?;
            }
            f.write_char(';')?;
            write_body(f, &lp.statements, depth)
        }
        Statement::Output(output) => match &output.dataset {
            Some(dataset) => write!(f, "OUTPUT {dataset};"),
            None => f.write_str("OUTPUT;"),
        },
        Statement::Retain(retain) => {
            f.write_str("RETAIN ")?;
            join(f, &retain.items, " ")?;
            f.write_char(';')
        }
        Statement::Length(length) => {
            f.write_str("LENGTH ")?;
            join(f, &length.lengths, " ")?;
            f.write_char(';')
        }
        Statement::Stop => f.write_str("STOP;"),
        Statement::Delete => f.write_str("DELETE;"),
        Statement::Generic(generic) => {
            f.write_str(&generic.keyword.to_uppercase())?;
            for argument in &generic.arguments {
                write!(f, " {argument}")?;
            }
            f.write_char(';')
        }
    }
}

/// Writes block statements one level deeper, then `END;` at `depth`.
fn write_body(f: &mut Formatter<'_>, statements: &[Statement], depth: usize) -> fmt::Result {
    write_lines(f, statements, depth + 1)?;
    f.write_char('\n')?;
    indent(f, depth)?;
    f.write_str("END;")
}

fn write_lines(f: &mut Formatter<'_>, statements: &[Statement], depth: usize) -> fmt::Result {
    for statement in statements {
        f.write_char('\n')?;
        indent(f, depth)?;
        write_statement(f, statement, depth)?;
    }
    Ok(())
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_statement(f, self, 0)
    }
}

macro_rules! display_as_statement {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl Display for $ty {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", Statement::$variant(self.clone()))
                }
            }
        )*
    };
}

display_as_statement! {
    Assignment => Assignment,
    IfStatement => If,
    SetStatement => Set,
    MergeStatement => Merge,
    ByStatement => By,
    WhereClause => Where,
    KeepStatement => Keep,
    DropStatement => Drop,
    RenameStatement => Rename,
    InputStatement => Input,
    PutStatement => Put,
    InfileStatement => Infile,
    FileStatement => File,
    FormatStatement => Format,
    InformatStatement => Informat,
    LabelStatement => Label,
    DoBlock => DoBlock,
    DoWhileLoop => DoWhile,
    DoUntilLoop => DoUntil,
    IterativeDoLoop => IterativeDo,
    OutputStatement => Output,
    RetainStatement => Retain,
    LengthStatement => Length,
    GenericStatement => Generic,
}

// ============================================================================
// STEPS & PROGRAM
// ============================================================================

impl Display for DataStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA")?;
        for output in &self.outputs {
            write!(f, " {output}")?;
        }
        f.write_char(';')?;

        let mut header = Vec::new();
        if let Some(set) = &self.set {
            header.push(Statement::Set(set.clone()));
        }
        if let Some(merge) = &self.merge {
            header.push(Statement::Merge(merge.clone()));
        }
        if let Some(by) = &self.by {
            header.push(Statement::By(by.clone()));
        }
        if let Some(clause) = &self.where_clause {
            header.push(Statement::Where(clause.clone()));
        }
        write_lines(f, &header, 1)?;
        write_lines(f, &self.statements, 1)?;
        f.write_str("\nRUN;")
    }
}

impl Display for ProcStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PROC {}", self.procedure.to_uppercase())?;
        if let Some(dataset) = &self.dataset {
            write!(f, " DATA={dataset}")?;
        }
        for option in &self.options {
            write!(f, " {option}")?;
        }
        f.write_char(';')?;
        write_lines(f, &self.statements, 1)?;
        f.write_str("\nRUN;")
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Step::Data(step) => write!(f, "{step}"),
            Step::Proc(step) => write!(f, "{step}"),
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("\n\n")?;
            }
            write!(f, "{step}")?;
        }
        if !self.steps.is_empty() {
            f.write_char('\n')?;
        }
        Ok(())
    }
}
