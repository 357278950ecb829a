//! Resolved body AST and the generic traversal dispatch over it.

mod nodes;
mod visit;

pub use nodes::*;
pub use visit::{accept_expr, accept_stmt, walk_expr, walk_stmt, Visitor};
