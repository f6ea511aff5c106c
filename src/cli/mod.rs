//! The command-line interface.
//!
//! Every subcommand goes through the library's two entry points,
//! [`crate::parse`] and [`crate::extract_lineage`]. Failures are rendered as
//! `miette` reports on stderr and exit with status 1.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{debug, warn, LevelFilter};
use miette::{miette, IntoDiagnostic, Report, Result};
use termcolor::StandardStream;
use walkdir::WalkDir;

use crate::ast::Program;
use crate::cli::args::{ColorMode, Command, LineageArgs, OutputFormat};
use crate::lineage::{extract_lineage, Lineage};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = LineageArgs::parse();
    init_logging(args.verbose);
    init_reports(args.color);
    let color = args.color.choice();

    let result = match args.command {
        Command::Check { path } => check(&path, color),
        Command::Ast { file, tree: true, .. } => show_tree(&file),
        Command::Ast { file, json, .. } => show_ast(&file, json),
        Command::Format { file, diff } => format(&file, diff, color),
        Command::Lineage { path, output } => lineage(&path, output, color),
    };

    if let Err(report) = result {
        eprintln!("{report:?}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn init_reports(color: ColorMode) {
    let force = match color {
        ColorMode::Auto => return,
        ColorMode::Always => true,
        ColorMode::Never => false,
    };
    // only fails if a hook is already installed
    let _ = miette::set_hook(Box::new(move |_| {
        Box::new(miette::MietteHandlerOpts::new().color(force).build())
    }));
}

// ============================================================================
// SUBCOMMANDS
// ============================================================================

fn check(path: &Path, color: termcolor::ColorChoice) -> Result<()> {
    let files = sas_files(path)?;
    let mut stdout = StandardStream::stdout(color);
    let mut failed = 0;
    for file in &files {
        match load(file) {
            Ok(_) => output::write_check_ok(&mut stdout, &file.display().to_string())
                .into_diagnostic()?,
            Err(report) => {
                failed += 1;
                eprintln!("{report:?}");
            }
        }
    }
    output::write_summary(&mut stdout, files.len(), failed).into_diagnostic()?;
    if failed > 0 {
        return Err(miette!("{failed} of {} files failed to parse", files.len()));
    }
    Ok(())
}

fn show_ast(file: &Path, json: bool) -> Result<()> {
    let program = load(file)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&program).into_diagnostic()?);
    } else {
        println!("{program:#?}");
    }
    Ok(())
}

fn show_tree(file: &Path) -> Result<()> {
    let source = read(file)?;
    let tree = crate::syntax::parse_tree(&source)
        .map_err(|e| Report::new(e.with_source(file.display().to_string(), source.clone())))?;
    print!("{}", tree.pretty());
    Ok(())
}

fn format(file: &Path, diff: bool, color: termcolor::ColorChoice) -> Result<()> {
    let source = read(file)?;
    let program = parse_named(file, &source)?;
    let rendered = program.to_string();
    if diff {
        let mut stdout = StandardStream::stdout(color);
        output::write_diff(&mut stdout, &source, &rendered).into_diagnostic()?;
    } else {
        print!("{rendered}");
    }
    Ok(())
}

/// Files are read in path order and merged; a dataset written in a later
/// file replaces the earlier record.
fn lineage(path: &Path, format: OutputFormat, color: termcolor::ColorChoice) -> Result<()> {
    let mut lineage = Lineage::new();
    let mut failed = 0;
    let files = sas_files(path)?;
    for file in &files {
        match load(file) {
            Ok(program) => lineage.extend(extract_lineage(&program)),
            Err(report) => {
                failed += 1;
                warn!("skipping {}: does not parse", file.display());
                eprintln!("{report:?}");
            }
        }
    }

    match format {
        OutputFormat::Text => {
            let mut stdout = StandardStream::stdout(color);
            output::write_lineage(&mut stdout, &lineage).into_diagnostic()?;
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&lineage).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&lineage).into_diagnostic()?),
    }

    if failed > 0 {
        return Err(miette!("{failed} of {} files skipped", files.len()));
    }
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn read(file: &Path) -> Result<String> {
    fs::read_to_string(file)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("cannot read {}", file.display())))
}

fn parse_named(file: &Path, source: &str) -> Result<Program> {
    crate::parse(source)
        .map_err(|e| Report::new(e.with_source(file.display().to_string(), source)))
}

fn load(file: &Path) -> Result<Program> {
    let source = read(file)?;
    let program = parse_named(file, &source)?;
    debug!("{}: {} steps", file.display(), program.steps.len());
    Ok(program)
}

/// `path` itself if it is a file, else every `.sas` file below it in sorted
/// order.
fn sas_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(miette!("{} does not exist", path.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                continue;
            }
        };
        let is_sas = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sas"));
        if entry.file_type().is_file() && is_sas {
            files.push(entry.into_path());
        }
    }
    debug!("found {} .sas files under {}", files.len(), path.display());
    Ok(files)
}
