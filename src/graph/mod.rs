//! The closed-world program graph: declared types, members, and the
//! canonicalized array-type lattice.
//!
//! The graph is constructed once by the front end (through
//! [`ProgramBuilder`]) and is immutable during analysis. All nodes are
//! referred to by index handles into the owning [`Program`]; nothing in
//! this model relies on pointer identity or global state.

mod arrays;
mod builder;

pub use arrays::ArrayType;
pub use builder::ProgramBuilder;

use crate::ast::{Expr, MethodBody};

pub(crate) use arrays::ArrayTypes;

/// Handle to a declared class or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

/// Handle to an interned array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayId(pub(crate) u32);

/// Handle to a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub(crate) u32);

/// Handle to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) u32);

/// Handle to a local variable or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

/// Primitive value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimType {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

/// A fully resolved type reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Prim(PrimType),
    Declared(TypeId),
    Array(ArrayId),
    /// The type of the `null` literal.
    Null,
    Void,
}

impl TypeRef {
    /// Narrow to a reference type, if this is one. The `null` type is a
    /// reference type in the language but never enters a mark set.
    pub fn as_ref_type(self) -> Option<RefType> {
        match self {
            TypeRef::Declared(id) => Some(RefType::Declared(id)),
            TypeRef::Array(id) => Some(RefType::Array(id)),
            _ => None,
        }
    }
}

/// A reference type that can appear in the type mark sets: a declared
/// class/interface or an interned array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    Declared(TypeId),
    Array(ArrayId),
}

impl From<TypeId> for RefType {
    fn from(id: TypeId) -> Self {
        RefType::Declared(id)
    }
}

impl From<ArrayId> for RefType {
    fn from(id: ArrayId) -> Self {
        RefType::Array(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

/// A declared class or interface.
#[derive(Debug, Clone)]
pub struct Type {
    pub name: String,
    pub kind: TypeKind,
    pub superclass: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub fields: Vec<FieldId>,
    /// Method index 0 is always the synthesized static initializer.
    pub methods: Vec<MethodId>,
    pub is_abstract: bool,
    pub is_final: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Ordinary,
    Constructor,
    /// The per-type `<clinit>`; never explicitly called from source.
    StaticInitializer,
}

/// A method of a declared type.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub enclosing: TypeId,
    pub kind: MethodKind,
    pub is_static: bool,
    pub is_native: bool,
    pub is_abstract: bool,
    pub params: Vec<VarId>,
    pub return_ty: TypeRef,
    /// Methods this one overrides or implements, as computed by the
    /// front end. The inverse relation lives in `OverrideIndex`.
    pub overrides: Vec<MethodId>,
    pub body: MethodBody,
}

/// A field of a declared type.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub enclosing: TypeId,
    pub ty: TypeRef,
    pub is_static: bool,
    pub is_volatile: bool,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Local,
    Param,
}

/// A local variable or parameter of a method.
#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
    pub kind: VarKind,
    pub method: MethodId,
    pub ty: TypeRef,
}

/// Members the language or runtime implies rather than states. Supplied
/// by the front end as part of the input contract.
#[derive(Debug, Clone, Copy)]
pub struct WellKnown {
    /// The built-in string type.
    pub string_type: TypeId,
    /// The built-in base array type every array type rescues.
    pub base_array_type: TypeId,
    /// The universal `toString` implied by string concatenation.
    pub object_to_string: MethodId,
    /// The foreign-boundary wrapper supertype: values of it and its
    /// subclasses can cross in from the foreign side without a visible
    /// constructor call. `None` when the program has no foreign surface.
    pub foreign_wrapper: Option<TypeId>,
}

/// The immutable, closed-world program graph.
#[derive(Debug)]
pub struct Program {
    types: Vec<Type>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    vars: Vec<Var>,
    arrays: ArrayTypes,
    well_known: WellKnown,
    entry_methods: Vec<MethodId>,
}

impl Program {
    pub fn well_known(&self) -> &WellKnown {
        &self.well_known
    }

    /// The roots the driving compilation phase designated.
    pub fn entry_methods(&self) -> &[MethodId] {
        &self.entry_methods
    }

    /// All declared (non-array) types.
    pub fn declared_types(&self) -> impl Iterator<Item = TypeId> {
        (0..self.types.len() as u32).map(TypeId)
    }

    /// All interned array types.
    pub fn array_types(&self) -> impl Iterator<Item = ArrayId> {
        (0..self.arrays.len() as u32).map(ArrayId)
    }

    /// The synthesized static initializer of a declared type.
    pub fn static_initializer(&self, t: TypeId) -> MethodId {
        self[t].methods[0]
    }

    /// Canonical array type for `(leaf, dims)`, if interned. After
    /// `ProgramBuilder::build` the lattice is closed under covariance, so
    /// a miss on a supertype array is an internal error in the caller.
    pub fn array_of(&self, leaf: TypeRef, dims: usize) -> Option<ArrayId> {
        self.arrays.lookup(leaf, dims)
    }

    /// Whether a declared type is the foreign-boundary wrapper type or
    /// one of its subclasses.
    pub fn is_foreign_class(&self, t: TypeId) -> bool {
        let Some(wrapper) = self.well_known.foreign_wrapper else {
            return false;
        };
        let mut cur = Some(t);
        while let Some(id) = cur {
            if id == wrapper {
                return true;
            }
            cur = self[id].superclass;
        }
        false
    }

    /// Whether a type reference denotes the foreign wrapper or a subtype.
    pub fn is_foreign_ref(&self, t: TypeRef) -> bool {
        matches!(t, TypeRef::Declared(id) if self.is_foreign_class(id))
    }

    /// Human-readable type name for diagnostics.
    pub fn describe(&self, t: TypeRef) -> String {
        match t {
            TypeRef::Prim(p) => prim_name(p).to_owned(),
            TypeRef::Declared(id) => self[id].name.clone(),
            TypeRef::Array(id) => {
                let arr = self[id];
                format!("{}{}", self.describe(arr.leaf), "[]".repeat(arr.dims))
            }
            TypeRef::Null => "null".to_owned(),
            TypeRef::Void => "void".to_owned(),
        }
    }
}

fn prim_name(p: PrimType) -> &'static str {
    match p {
        PrimType::Boolean => "boolean",
        PrimType::Char => "char",
        PrimType::Byte => "byte",
        PrimType::Short => "short",
        PrimType::Int => "int",
        PrimType::Long => "long",
        PrimType::Float => "float",
        PrimType::Double => "double",
    }
}

impl std::ops::Index<TypeId> for Program {
    type Output = Type;
    fn index(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }
}

impl std::ops::Index<MethodId> for Program {
    type Output = Method;
    fn index(&self, id: MethodId) -> &Method {
        &self.methods[id.0 as usize]
    }
}

impl std::ops::Index<FieldId> for Program {
    type Output = Field;
    fn index(&self, id: FieldId) -> &Field {
        &self.fields[id.0 as usize]
    }
}

impl std::ops::Index<VarId> for Program {
    type Output = Var;
    fn index(&self, id: VarId) -> &Var {
        &self.vars[id.0 as usize]
    }
}

impl std::ops::Index<ArrayId> for Program {
    type Output = ArrayType;
    fn index(&self, id: ArrayId) -> &ArrayType {
        self.arrays.get(id)
    }
}
