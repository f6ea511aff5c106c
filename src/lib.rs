//! Parser and lineage extractor for DATA / PROC step programs.
//!
//! ```rust
//! let program = sas_lineage::parse(
//!     "data sales; set raw.transactions; where region = 'APAC'; run;",
//! )
//! .unwrap();
//! let lineage = sas_lineage::extract_lineage(&program);
//! assert_eq!(lineage["sales"].inputs, ["raw.transactions"]);
//! ```

pub use crate::diagnostics::{ErrorContext, LineageError};
pub use crate::lineage::{extract_lineage, Lineage, LineageExtractor, LineageRecord, Operation};

pub mod ast;
pub mod cli;
pub mod diagnostics;
pub mod lineage;
pub mod syntax;

/// Parses and transforms source text into a [`ast::Program`].
///
/// Errors carry the source text under the name `input`; callers that know
/// the file name can replace it with [`LineageError::with_source`].
pub fn parse(source: &str) -> Result<ast::Program, LineageError> {
    syntax::parse_tree(source)
        .and_then(|tree| syntax::transform(&tree))
        .map_err(|e| e.with_source("input", source))
}
