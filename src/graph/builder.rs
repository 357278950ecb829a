//! Front-end input contract: constructs the immutable program graph.
//!
//! The builder synthesizes the static initializer as method index 0 of
//! every declared type, validates the well-known members, and closes the
//! array lattice under covariance before handing out a [`Program`].

use log::debug;

use crate::ast::{Block, Expr, MethodBody, NativeBody};
use crate::error::{Error, Result};

use super::{
    ArrayId, ArrayTypes, Field, FieldId, Method, MethodId, MethodKind, Program, Type, TypeId,
    TypeKind, TypeRef, Var, VarId, VarKind, WellKnown,
};

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    types: Vec<Type>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    vars: Vec<Var>,
    arrays: ArrayTypes,
    well_known: Option<WellKnown>,
    entry_methods: Vec<MethodId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a class. Its static initializer is synthesized at method
    /// index 0 with an empty body; use [`set_body`] to fill it in.
    ///
    /// [`set_body`]: ProgramBuilder::set_body
    pub fn add_class(&mut self, name: &str, superclass: Option<TypeId>) -> TypeId {
        self.add_type(name, TypeKind::Class, superclass)
    }

    /// Declare an interface. Interfaces have no superclass; super
    /// interfaces go through [`implement_interface`].
    ///
    /// [`implement_interface`]: ProgramBuilder::implement_interface
    pub fn add_interface(&mut self, name: &str) -> TypeId {
        self.add_type(name, TypeKind::Interface, None)
    }

    fn add_type(&mut self, name: &str, kind: TypeKind, superclass: Option<TypeId>) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(Type {
            name: name.to_owned(),
            kind,
            superclass,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            is_abstract: kind == TypeKind::Interface,
            is_final: false,
        });
        let clinit = MethodId(self.methods.len() as u32);
        self.methods.push(Method {
            name: "<clinit>".to_owned(),
            enclosing: id,
            kind: MethodKind::StaticInitializer,
            is_static: true,
            is_native: false,
            is_abstract: false,
            params: Vec::new(),
            return_ty: TypeRef::Void,
            overrides: Vec::new(),
            body: MethodBody::Source(Block::default()),
        });
        self.types[id.0 as usize].methods.push(clinit);
        id
    }

    /// The synthesized static initializer of `t`; fill its body with
    /// [`set_body`].
    ///
    /// [`set_body`]: ProgramBuilder::set_body
    pub fn static_initializer(&self, t: TypeId) -> MethodId {
        self.types[t.0 as usize].methods[0]
    }

    /// Record that `t` implements (or, for an interface, extends) `i`.
    pub fn implement_interface(&mut self, t: TypeId, i: TypeId) {
        self.types[t.0 as usize].interfaces.push(i);
    }

    pub fn mark_abstract(&mut self, t: TypeId) {
        self.types[t.0 as usize].is_abstract = true;
    }

    pub fn mark_final(&mut self, t: TypeId) {
        self.types[t.0 as usize].is_final = true;
    }

    /// Add an instance method. On an interface the method starts out
    /// abstract with no body.
    pub fn add_method(&mut self, t: TypeId, name: &str, return_ty: TypeRef) -> MethodId {
        let on_interface = self.types[t.0 as usize].kind == TypeKind::Interface;
        self.push_method(t, name, MethodKind::Ordinary, false, return_ty, on_interface)
    }

    pub fn add_static_method(&mut self, t: TypeId, name: &str, return_ty: TypeRef) -> MethodId {
        self.push_method(t, name, MethodKind::Ordinary, true, return_ty, false)
    }

    pub fn add_constructor(&mut self, t: TypeId) -> MethodId {
        self.push_method(t, "<init>", MethodKind::Constructor, false, TypeRef::Void, false)
    }

    fn push_method(
        &mut self,
        t: TypeId,
        name: &str,
        kind: MethodKind,
        is_static: bool,
        return_ty: TypeRef,
        is_abstract: bool,
    ) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(Method {
            name: name.to_owned(),
            enclosing: t,
            kind,
            is_static,
            is_native: false,
            is_abstract,
            params: Vec::new(),
            return_ty,
            overrides: Vec::new(),
            body: if is_abstract {
                MethodBody::Absent
            } else {
                MethodBody::Source(Block::default())
            },
        });
        self.types[t.0 as usize].methods.push(id);
        id
    }

    pub fn set_body(&mut self, m: MethodId, body: Block) {
        self.methods[m.0 as usize].body = MethodBody::Source(body);
    }

    pub fn set_native_body(&mut self, m: MethodId, body: NativeBody) {
        let method = &mut self.methods[m.0 as usize];
        method.is_native = true;
        method.body = MethodBody::Native(body);
    }

    pub fn set_method_abstract(&mut self, m: MethodId) {
        let method = &mut self.methods[m.0 as usize];
        method.is_abstract = true;
        method.body = MethodBody::Absent;
    }

    pub fn add_param(&mut self, m: MethodId, name: &str, ty: TypeRef) -> VarId {
        let id = self.push_var(m, name, VarKind::Param, ty);
        self.methods[m.0 as usize].params.push(id);
        id
    }

    pub fn add_local(&mut self, m: MethodId, name: &str, ty: TypeRef) -> VarId {
        self.push_var(m, name, VarKind::Local, ty)
    }

    fn push_var(&mut self, m: MethodId, name: &str, kind: VarKind, ty: TypeRef) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(Var {
            name: name.to_owned(),
            kind,
            method: m,
            ty,
        });
        id
    }

    pub fn add_field(&mut self, t: TypeId, name: &str, ty: TypeRef) -> FieldId {
        self.push_field(t, name, ty, false)
    }

    pub fn add_static_field(&mut self, t: TypeId, name: &str, ty: TypeRef) -> FieldId {
        self.push_field(t, name, ty, true)
    }

    fn push_field(&mut self, t: TypeId, name: &str, ty: TypeRef, is_static: bool) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(Field {
            name: name.to_owned(),
            enclosing: t,
            ty,
            is_static,
            is_volatile: false,
            initializer: None,
        });
        self.types[t.0 as usize].fields.push(id);
        id
    }

    pub fn mark_volatile(&mut self, f: FieldId) {
        self.fields[f.0 as usize].is_volatile = true;
    }

    pub fn set_field_initializer(&mut self, f: FieldId, init: Expr) {
        self.fields[f.0 as usize].initializer = Some(init);
    }

    /// Record the front end's finding that `m` overrides `overridden`.
    pub fn add_override(&mut self, m: MethodId, overridden: MethodId) {
        self.methods[m.0 as usize].overrides.push(overridden);
    }

    /// Intern the canonical array type for `(leaf, dims)`.
    pub fn array_type(&mut self, leaf: TypeRef, dims: usize) -> Result<ArrayId> {
        if dims == 0 {
            return Err(Error::graph("array type needs at least one dimension"));
        }
        match leaf {
            TypeRef::Prim(_) | TypeRef::Declared(_) => Ok(self.arrays.intern(leaf, dims)),
            other => Err(Error::graph(format!(
                "invalid array leaf type: {other:?}"
            ))),
        }
    }

    pub fn set_well_known(&mut self, well_known: WellKnown) {
        self.well_known = Some(well_known);
    }

    pub fn add_entry_method(&mut self, m: MethodId) {
        self.entry_methods.push(m);
    }

    /// Validate and freeze the graph. Closes the array lattice under
    /// covariance so the analyzer never has to intern mid-traversal.
    pub fn build(mut self) -> Result<Program> {
        let well_known = self
            .well_known
            .ok_or_else(|| Error::graph("well-known members not set"))?;
        self.check_type(well_known.string_type, "string type")?;
        self.check_type(well_known.base_array_type, "base array type")?;
        self.check_method(well_known.object_to_string, "universal toString")?;
        if let Some(wrapper) = well_known.foreign_wrapper {
            self.check_type(wrapper, "foreign wrapper type")?;
        }
        if self.methods[well_known.object_to_string.0 as usize].is_static {
            return Err(Error::graph("universal toString must be an instance method"));
        }
        for m in &self.entry_methods {
            if m.0 as usize >= self.methods.len() {
                return Err(Error::graph("entry method handle out of range"));
            }
        }
        for method in &self.methods {
            for overridden in &method.overrides {
                let target = &self.methods[overridden.0 as usize];
                if target.is_static || target.kind != MethodKind::Ordinary {
                    return Err(Error::graph(format!(
                        "'{}' cannot override non-virtual '{}'",
                        method.name, target.name
                    )));
                }
            }
        }

        self.arrays.close_covariant(&self.types);

        debug!(
            "program graph frozen: {} types, {} methods, {} fields, {} array types",
            self.types.len(),
            self.methods.len(),
            self.fields.len(),
            self.arrays.len()
        );
        Ok(Program {
            types: self.types,
            methods: self.methods,
            fields: self.fields,
            vars: self.vars,
            arrays: self.arrays,
            well_known,
            entry_methods: self.entry_methods,
        })
    }

    fn check_type(&self, t: TypeId, what: &str) -> Result<()> {
        if t.0 as usize >= self.types.len() {
            return Err(Error::MissingWellKnown { what: what.into() });
        }
        Ok(())
    }

    fn check_method(&self, m: MethodId, what: &str) -> Result<()> {
        if m.0 as usize >= self.methods.len() {
            return Err(Error::MissingWellKnown { what: what.into() });
        }
        Ok(())
    }
}
