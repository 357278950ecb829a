//! Canonicalized array-type arena.
//!
//! Array types are synthesized, never declared: each is uniquely
//! identified by its leaf type and dimension count, and two requests for
//! the same `(leaf, dims)` always yield the same handle. Interning a
//! deeper array also interns every shallower one, so an array's element
//! type is itself always interned.
//!
//! The graph must stay read-only while the analyzer runs, so the
//! covariance closure (supertype and interface arrays at equal
//! dimensionality) is taken once at build time rather than interning on
//! demand mid-traversal.

use std::collections::HashMap;

use super::{ArrayId, Type, TypeRef};

/// An interned array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayType {
    /// The non-array type at the bottom of the nesting.
    pub leaf: TypeRef,
    /// Number of dimensions; always at least 1.
    pub dims: usize,
    /// The immediate element type: `leaf` when `dims == 1`, otherwise
    /// the array of `(leaf, dims - 1)`.
    pub element: TypeRef,
}

#[derive(Debug, Default)]
pub(crate) struct ArrayTypes {
    infos: Vec<ArrayType>,
    by_key: HashMap<(TypeRef, usize), ArrayId>,
}

impl ArrayTypes {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.infos.len()
    }

    pub(crate) fn get(&self, id: ArrayId) -> &ArrayType {
        &self.infos[id.0 as usize]
    }

    pub(crate) fn lookup(&self, leaf: TypeRef, dims: usize) -> Option<ArrayId> {
        self.by_key.get(&(leaf, dims)).copied()
    }

    /// Intern `(leaf, dims)` and every shallower nesting of the same
    /// leaf. `leaf` must be a primitive or declared type.
    pub(crate) fn intern(&mut self, leaf: TypeRef, dims: usize) -> ArrayId {
        debug_assert!(dims >= 1);
        debug_assert!(matches!(leaf, TypeRef::Prim(_) | TypeRef::Declared(_)));
        if let Some(id) = self.lookup(leaf, dims) {
            return id;
        }
        let element = if dims == 1 {
            leaf
        } else {
            TypeRef::Array(self.intern(leaf, dims - 1))
        };
        let id = ArrayId(self.infos.len() as u32);
        self.infos.push(ArrayType { leaf, dims, element });
        self.by_key.insert((leaf, dims), id);
        id
    }

    /// Close the lattice under array covariance: for every interned array
    /// with a declared leaf, intern the leaf's superclass and interface
    /// arrays at the same dimensionality, transitively. Runs to fixpoint;
    /// the lattice is bounded by (declared types × max dims).
    pub(crate) fn close_covariant(&mut self, types: &[Type]) {
        let mut i = 0;
        while i < self.infos.len() {
            let ArrayType { leaf, dims, .. } = self.infos[i];
            if let TypeRef::Declared(id) = leaf {
                let decl = &types[id.0 as usize];
                if let Some(superclass) = decl.superclass {
                    self.intern(TypeRef::Declared(superclass), dims);
                }
                for k in 0..decl.interfaces.len() {
                    let intf = decl.interfaces[k];
                    self.intern(TypeRef::Declared(intf), dims);
                }
            }
            i += 1;
        }
    }
}
