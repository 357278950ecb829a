//! Inverse override relation.
//!
//! The front end records, per method, the methods it overrides. Virtual
//! dispatch soundness needs the opposite direction: when a method goes
//! live, every method that overrides it on an instantiable subtype must
//! go live too. The index is built exactly once, before any traversal,
//! and is read-only input from then on; forked analyzers share it.

use std::collections::HashMap;

use log::debug;

use crate::graph::{MethodId, Program};

#[derive(Debug)]
pub struct OverrideIndex {
    overriders: HashMap<MethodId, Vec<MethodId>>,
}

impl OverrideIndex {
    /// Invert the "methods I override" relation over the whole closed
    /// world of declared types.
    pub fn build(program: &Program) -> Self {
        let mut overriders: HashMap<MethodId, Vec<MethodId>> = HashMap::new();
        for t in program.declared_types() {
            for &m in &program[t].methods {
                for &overridden in &program[m].overrides {
                    overriders.entry(overridden).or_default().push(m);
                }
            }
        }
        debug!("override index built: {} overridden methods", overriders.len());
        OverrideIndex { overriders }
    }

    /// Methods that override `m`, directly or transitively as the front
    /// end recorded them. Empty for anything never overridden.
    pub fn overriders(&self, m: MethodId) -> &[MethodId] {
        self.overriders.get(&m).map(Vec::as_slice).unwrap_or(&[])
    }
}
