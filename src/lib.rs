//! Whole-program reachability analysis for an ahead-of-time compiler.
//!
//! Given a closed-world program graph and a set of entry methods, the
//! analyzer computes which types are referenced, which are instantiated,
//! which members (methods, fields, locals) are live, and which string
//! literals survive. Everything outside those sets is provably
//! unreachable and safe for the caller to prune.
//!
//! The crate is organized as:
//! - [`graph`]: the immutable program graph and its builder
//! - [`ast`]: resolved method-body statements and expressions
//! - [`overrides`]: the inverse override index for virtual dispatch
//! - [`reach`]: the mark/rescue traversal and its output sets
//! - [`error`]: error types shared across the crate
//!
//! Typical usage:
//!
//! ```no_run
//! use jshake::{OverrideIndex, ProgramBuilder, ReachabilityAnalyzer};
//!
//! # fn build(builder: &mut ProgramBuilder) {}
//! # fn main() -> jshake::Result<()> {
//! let mut builder = ProgramBuilder::new();
//! build(&mut builder);
//! let program = builder.build()?;
//! let overrides = OverrideIndex::build(&program);
//! let mut analyzer = ReachabilityAnalyzer::new(&program, &overrides);
//! analyzer.traverse_from_entry_points()?;
//! let marks = analyzer.into_marks();
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod error;
pub mod graph;
pub mod overrides;
pub mod reach;

pub use error::{Error, Result};
pub use graph::{Program, ProgramBuilder};
pub use overrides::OverrideIndex;
pub use reach::{Liveness, MarkSets, MemberId, ReachabilityAnalyzer};
