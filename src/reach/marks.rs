//! Mark sets produced by a reachability traversal.
//!
//! All four output sets grow monotonically within a run; nothing is
//! ever removed. The transient limbo set is the middle state of the
//! per-method liveness machine: `Unseen -> Limbo -> Live`, with the
//! direct `Unseen -> Live` edge for guaranteed callees. A method is
//! never Live and Limbo at the same time; the transition methods below
//! are the only writers, which is what enforces it.

use std::collections::HashSet;

use crate::graph::{FieldId, MethodId, RefType, VarId};

/// A member that can appear in the live set: a method, a field, or a
/// local/parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberId {
    Method(MethodId),
    Field(FieldId),
    Var(VarId),
}

/// Liveness state of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Unseen,
    /// Reachable through a virtual call, but the receiver type's
    /// instantiability is not yet proven.
    Limbo,
    Live,
}

/// The four output sets plus the transient limbo set. Cloning deep
/// copies everything, so forked traversals never share mutable state.
#[derive(Debug, Clone, Default)]
pub struct MarkSets {
    referenced_types: HashSet<RefType>,
    instantiated_types: HashSet<RefType>,
    live_members: HashSet<MemberId>,
    live_strings: HashSet<String>,
    limbo_methods: HashSet<MethodId>,
}

impl MarkSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the type was not already referenced.
    pub fn mark_referenced(&mut self, t: RefType) -> bool {
        self.referenced_types.insert(t)
    }

    /// Returns true when the type was not already instantiated.
    pub fn mark_instantiated(&mut self, t: RefType) -> bool {
        self.instantiated_types.insert(t)
    }

    pub fn is_referenced(&self, t: RefType) -> bool {
        self.referenced_types.contains(&t)
    }

    pub fn is_instantiated(&self, t: RefType) -> bool {
        self.instantiated_types.contains(&t)
    }

    pub fn method_state(&self, m: MethodId) -> Liveness {
        if self.live_members.contains(&MemberId::Method(m)) {
            Liveness::Live
        } else if self.limbo_methods.contains(&m) {
            Liveness::Limbo
        } else {
            Liveness::Unseen
        }
    }

    /// `Unseen`/`Limbo` -> `Live`. Returns true when the method was not
    /// live before; the caller runs the rescue effect exactly then.
    pub fn promote(&mut self, m: MethodId) -> bool {
        if !self.live_members.insert(MemberId::Method(m)) {
            return false;
        }
        self.limbo_methods.remove(&m);
        true
    }

    /// `Unseen` -> `Limbo`. No-op on a live or already deferred method.
    /// Returns true when the method newly entered limbo.
    pub fn defer(&mut self, m: MethodId) -> bool {
        if self.live_members.contains(&MemberId::Method(m)) {
            return false;
        }
        self.limbo_methods.insert(m)
    }

    pub fn mark_field_live(&mut self, f: FieldId) -> bool {
        self.live_members.insert(MemberId::Field(f))
    }

    pub fn mark_var_live(&mut self, v: VarId) -> bool {
        self.live_members.insert(MemberId::Var(v))
    }

    pub fn is_live(&self, member: MemberId) -> bool {
        self.live_members.contains(&member)
    }

    pub fn add_string(&mut self, s: &str) -> bool {
        self.live_strings.insert(s.to_owned())
    }

    pub fn referenced_types(&self) -> &HashSet<RefType> {
        &self.referenced_types
    }

    pub fn instantiated_types(&self) -> &HashSet<RefType> {
        &self.instantiated_types
    }

    pub fn live_members(&self) -> &HashSet<MemberId> {
        &self.live_members
    }

    pub fn live_strings(&self) -> &HashSet<String> {
        &self.live_strings
    }

    /// Methods still awaiting an instantiability proof. Empty-able only
    /// by promotion; never part of the output contract.
    pub fn limbo_methods(&self) -> &HashSet<MethodId> {
        &self.limbo_methods
    }
}
