//! # Fixture loader
//!
//! Shared helpers for the integration tests. Fixtures live under
//! `tests/fixtures`; programs that must fail are kept in `broken/`.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sas_lineage::ast::Program;
use walkdir::WalkDir;

pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

pub fn fixture(name: &str) -> PathBuf {
    fixture_dir().join(name)
}

pub fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture(name))
        .unwrap_or_else(|e| panic!("cannot read fixture {name}: {e}"))
}

/// Every `.sas` fixture outside `broken/`, in path order.
pub fn good_fixtures() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(fixture_dir())
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map_or(false, |e| e == "sas"))
        .filter(|p| !p.components().any(|c| c.as_os_str() == "broken"))
        .collect();
    files.sort();
    files
}

/// Parses `source`, failing the test with the rendered report on error.
pub fn parse_ok(source: &str) -> Program {
    match sas_lineage::parse(source) {
        Ok(program) => program,
        Err(e) => panic!("{:?}", miette::Report::new(e)),
    }
}
