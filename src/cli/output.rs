//! Handles all user-facing output for the CLI.
//!
//! Every writer takes a `WriteColor` sink so the same code serves coloured
//! terminals, plain pipes and test buffers.

use std::io::{self, Write};

use difference::{Changeset, Difference};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::lineage::{Lineage, LineageRecord};

// ============================================================================
// LINEAGE
// ============================================================================

/// Writes one block per dataset:
///
/// ```text
/// sales (data_step)
///   inputs:          raw.transactions
///   columns created: total
/// ```
pub fn write_lineage(out: &mut impl WriteColor, lineage: &Lineage) -> io::Result<()> {
    for (i, (dataset, record)) in lineage.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
        write!(out, "{dataset}")?;
        out.reset()?;
        writeln!(out, " ({})", record.operation)?;
        write_record(out, record)?;
    }
    Ok(())
}

fn write_record(out: &mut impl WriteColor, record: &LineageRecord) -> io::Result<()> {
    let fields: [(&str, &[String]); 6] = [
        ("inputs", &record.inputs),
        ("outputs", &record.outputs),
        ("keys", &record.keys),
        ("filters", &record.filters),
        ("columns created", &record.columns_created),
        ("columns used", &record.columns_used),
    ];
    for (label, values) in fields {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, "  {:<16} ", format!("{label}:"))?;
        out.reset()?;
        if values.is_empty() {
            writeln!(out, "-")?;
        } else {
            writeln!(out, "{}", values.join(", "))?;
        }
    }
    Ok(())
}

// ============================================================================
// DIFFS
// ============================================================================

/// Writes a line diff from `before` to `after`: `+` added, `-` removed.
pub fn write_diff(out: &mut impl WriteColor, before: &str, after: &str) -> io::Result<()> {
    let changeset = Changeset::new(before.trim_end(), after.trim_end(), "\n");
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(text) => {
                out.reset()?;
                write_prefixed(out, ' ', text)?;
            }
            Difference::Add(text) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                write_prefixed(out, '+', text)?;
            }
            Difference::Rem(text) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                write_prefixed(out, '-', text)?;
            }
        }
    }
    out.reset()
}

// a chunk may hold several lines
fn write_prefixed(out: &mut impl Write, prefix: char, text: &str) -> io::Result<()> {
    for line in text.split('\n') {
        writeln!(out, "{prefix}{line}")?;
    }
    Ok(())
}

// ============================================================================
// CHECK
// ============================================================================

pub fn write_check_ok(out: &mut impl WriteColor, path: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(out, "ok")?;
    out.reset()?;
    writeln!(out, "  {path}")
}

pub fn write_summary(out: &mut impl WriteColor, checked: usize, failed: usize) -> io::Result<()> {
    let color = if failed == 0 { Color::Green } else { Color::Red };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    writeln!(out, "{checked} files checked, {failed} failed")?;
    out.reset()
}
