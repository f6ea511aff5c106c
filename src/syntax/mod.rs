//! Text to AST.
//!
//! [`parse_tree`] runs the grammar and yields a generic [`CstNode`] tree;
//! [`transform`] turns that tree into a typed [`Program`](crate::ast::Program).
//! Both are pure functions; the compiled grammar holds no mutable state and
//! may be used from any number of threads.

pub mod cst;
pub mod parser;
pub mod transformer;

pub use cst::CstNode;
pub use parser::{parse_tree, Rule, SasParser};
pub use transformer::transform;
