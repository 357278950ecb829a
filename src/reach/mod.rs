//! Mark/rescue reachability traversal.
//!
//! The analyzer walks method bodies depth-first from the designated
//! roots. "Rescuing" an item adds it to the right mark set and, only on
//! first addition, visits its structural dependencies; every set grows
//! monotonically over a finite graph, so the traversal terminates at a
//! fixpoint without an outer worklist.
//!
//! Virtual dispatch is the one place liveness is conditional: a virtual
//! call target whose receiver type has no instantiability proof yet is
//! deferred to the limbo set, together with its not-yet-instantiable
//! overriders, and promoted the moment some type in the receiver
//! hierarchy is instantiated. Instantiability of a class covers its
//! whole superclass chain (an instance of a subclass is an instance of
//! every superclass), which the `instantiable` closure tracks without
//! ever leaking into the `instantiated_types` output.

mod marks;

pub use marks::{Liveness, MarkSets, MemberId};

use std::collections::HashSet;

use log::debug;

use crate::ast::{
    accept_expr, accept_stmt, ArrayDim, BinOp, Binary, DeclTarget, Expr, Literal, MethodBody,
    NativeBody, NativeRef, NewArray, Stmt, Visitor,
};
use crate::error::{Error, Result};
use crate::graph::{
    ArrayId, FieldId, MethodId, MethodKind, PrimType, Program, RefType, TypeId, TypeKind, TypeRef,
};
use crate::overrides::OverrideIndex;

/// One reachability traversal over an immutable program graph.
///
/// The graph and override index are shared read-only inputs; the mark
/// sets are owned. Cloning forks the marks, so a speculative traversal
/// (say, per code-splitting fragment) never disturbs the original.
#[derive(Debug, Clone)]
pub struct ReachabilityAnalyzer<'p> {
    program: &'p Program,
    overrides: &'p OverrideIndex,
    marks: MarkSets,
    /// Classes proven instantiable: every class on the superclass chain
    /// of an instantiated class. A superset of the instantiated classes;
    /// never part of the output.
    instantiable: HashSet<TypeId>,
    /// The single-char string conversion, resolved on first string
    /// concatenation of a char operand.
    string_value_of_char: Option<MethodId>,
}

impl<'p> ReachabilityAnalyzer<'p> {
    pub fn new(program: &'p Program, overrides: &'p OverrideIndex) -> Self {
        ReachabilityAnalyzer {
            program,
            overrides,
            marks: MarkSets::new(),
            instantiable: HashSet::new(),
            string_value_of_char: None,
        }
    }

    /// Run the traversal from every entry method the front end
    /// designated.
    pub fn traverse_from_entry_points(&mut self) -> Result<()> {
        let program = self.program;
        debug!(
            "reachability traversal from {} entry methods",
            program.entry_methods().len()
        );
        for &m in program.entry_methods() {
            self.rescue_method(m)?;
        }
        debug!(
            "traversal complete: {} referenced types, {} instantiated types, {} live members, {} strings",
            self.marks.referenced_types().len(),
            self.marks.instantiated_types().len(),
            self.marks.live_members().len(),
            self.marks.live_strings().len()
        );
        Ok(())
    }

    /// Add a single method as a root.
    pub fn traverse_from_method(&mut self, m: MethodId) -> Result<()> {
        self.rescue_method(m)
    }

    /// Traverse a detached expression as if it executed at a root.
    pub fn traverse_from_expr(&mut self, expr: &Expr) -> Result<()> {
        accept_expr(self, expr)
    }

    /// Add a type as referenced (not instantiated) from outside any
    /// method body.
    pub fn traverse_from_type(&mut self, t: RefType) -> Result<()> {
        self.rescue_type(t, true, false)
    }

    pub fn marks(&self) -> &MarkSets {
        &self.marks
    }

    pub fn into_marks(self) -> MarkSets {
        self.marks
    }

    pub fn referenced_types(&self) -> &HashSet<RefType> {
        self.marks.referenced_types()
    }

    pub fn instantiated_types(&self) -> &HashSet<RefType> {
        self.marks.instantiated_types()
    }

    pub fn live_members(&self) -> &HashSet<MemberId> {
        self.marks.live_members()
    }

    pub fn live_strings(&self) -> &HashSet<String> {
        self.marks.live_strings()
    }

    /// Add `t` to the requested mark sets and, when it newly entered
    /// either one, run its structural rescue under the semantics of this
    /// visit. A type already referenced still gets a second visit when it
    /// first becomes instantiated.
    fn rescue_type(&mut self, t: RefType, referenced: bool, instantiated: bool) -> Result<()> {
        let mut newly_marked = false;
        if instantiated && self.marks.mark_instantiated(t) {
            newly_marked = true;
        }
        if referenced && self.marks.mark_referenced(t) {
            newly_marked = true;
        }
        if !newly_marked {
            return Ok(());
        }
        match t {
            RefType::Declared(id) => match self.program[id].kind {
                TypeKind::Class => self.visit_class(id, instantiated),
                TypeKind::Interface => self.visit_interface(id, instantiated),
            },
            RefType::Array(id) => self.visit_array(id, instantiated),
        }
    }

    fn visit_class(&mut self, id: TypeId, instantiated: bool) -> Result<()> {
        let program = self.program;
        if instantiated {
            self.establish_instantiable(id)?;
        }
        // The superclass is referenced through its subclass but never
        // instantiated by it; instantiability flows through the closure
        // above instead.
        if let Some(superclass) = program[id].superclass {
            self.rescue_type(RefType::Declared(superclass), true, false)?;
        }
        self.rescue_method(program.static_initializer(id))?;
        Ok(())
    }

    fn visit_interface(&mut self, id: TypeId, instantiated: bool) -> Result<()> {
        let program = self.program;
        self.rescue_method(program.static_initializer(id))?;
        if instantiated {
            for &superinterface in &program[id].interfaces {
                self.rescue_type(RefType::Declared(superinterface), false, true)?;
            }
            self.rescue_methods_if_instantiable(id)?;
        }
        Ok(())
    }

    /// An array type always needs the built-in base array type, and by
    /// covariance an instance of `T[]` is also an `S[]` for every
    /// supertype `S` of `T`, so those array types become referenced. The
    /// lattice was closed at build time, so the lookups cannot miss.
    fn visit_array(&mut self, id: ArrayId, instantiated: bool) -> Result<()> {
        let program = self.program;
        let arr = program[id];
        let base = program.well_known().base_array_type;
        self.rescue_type(RefType::Declared(base), true, instantiated)?;
        if let TypeRef::Declared(leaf) = arr.leaf {
            if let Some(superclass) = program[leaf].superclass {
                let super_arr = self.lookup_array(TypeRef::Declared(superclass), arr.dims)?;
                self.rescue_type(RefType::Array(super_arr), true, false)?;
            }
            for &interface in &program[leaf].interfaces {
                let intf_arr = self.lookup_array(TypeRef::Declared(interface), arr.dims)?;
                self.rescue_type(RefType::Array(intf_arr), true, false)?;
            }
        }
        Ok(())
    }

    fn lookup_array(&self, leaf: TypeRef, dims: usize) -> Result<ArrayId> {
        self.program.array_of(leaf, dims).ok_or_else(|| Error::UnknownArrayType {
            leaf: self.program.describe(leaf),
            dims,
        })
    }

    /// Record that `id` and its whole superclass chain can have
    /// instances, promoting any limbo methods that were waiting on the
    /// proof. An instance of `id` also implements every interface
    /// declared along the chain, so those become instantiated with it;
    /// dropping that step would leave a dispatched-through interface
    /// declaration in limbo forever. Stops at the first class already
    /// in the closure.
    fn establish_instantiable(&mut self, id: TypeId) -> Result<()> {
        let program = self.program;
        let mut cur = Some(id);
        while let Some(t) = cur {
            if !self.instantiable.insert(t) {
                break;
            }
            self.rescue_methods_if_instantiable(t)?;
            for &interface in &program[t].interfaces {
                self.rescue_type(RefType::Declared(interface), false, true)?;
            }
            cur = program[t].superclass;
        }
        Ok(())
    }

    fn rescue_methods_if_instantiable(&mut self, t: TypeId) -> Result<()> {
        let program = self.program;
        let pending: Vec<MethodId> = program[t]
            .methods
            .iter()
            .copied()
            .filter(|&m| self.marks.method_state(m) == Liveness::Limbo)
            .collect();
        for m in pending {
            self.rescue_method(m)?;
        }
        Ok(())
    }

    fn is_instantiable(&self, t: TypeId) -> bool {
        self.instantiable.contains(&t)
            || self.program.is_foreign_class(t)
            || self.marks.is_instantiated(RefType::Declared(t))
    }

    /// Make a method live and, on the transition, traverse its body and
    /// propagate along the dispatch structure.
    fn rescue_method(&mut self, m: MethodId) -> Result<()> {
        if !self.marks.promote(m) {
            return Ok(());
        }
        let program = self.program;
        let method = &program[m];
        debug!(
            "method live: {}.{}",
            program[method.enclosing].name, method.name
        );
        if program.is_foreign_class(method.enclosing) {
            // An instance method on a foreign wrapper implies instances
            // of that wrapper exist.
            self.rescue_type(RefType::Declared(method.enclosing), true, !method.is_static)?;
        } else if method.is_static {
            self.rescue_type(RefType::Declared(method.enclosing), true, false)?;
        }
        match &method.body {
            MethodBody::Absent => {}
            MethodBody::Source(block) => {
                for stmt in &block.statements {
                    accept_stmt(self, stmt)?;
                }
            }
            MethodBody::Native(native) => self.rescue_native_body(m, native)?,
        }
        // Dispatch on this method can land in any overriding body on an
        // instantiable subtype; the rest wait in limbo.
        self.rescue_overriders(m)?;
        // The dispatch table that reaches this body is keyed by the
        // overridden declarations, so any of them already pending become
        // live with it.
        for &overridden in &method.overrides {
            if self.marks.method_state(overridden) == Liveness::Limbo {
                self.rescue_method(overridden)?;
            }
        }
        Ok(())
    }

    /// Foreign code is opaque: every parameter may be read, foreign
    /// values may flow into anything it writes or calls, and its string
    /// literals are live.
    fn rescue_native_body(&mut self, m: MethodId, native: &NativeBody) -> Result<()> {
        let program = self.program;
        let method = &program[m];
        for &param in &method.params {
            self.marks.mark_var_live(param);
            self.maybe_rescue_foreign_crossing(program[param].ty)?;
        }
        self.maybe_rescue_foreign_crossing(method.return_ty)?;
        for s in &native.used_strings {
            self.rescue_string(s)?;
        }
        for r in &native.refs {
            match r {
                NativeRef::Field { field, lvalue } => {
                    self.rescue_field_ref(*field)?;
                    if *lvalue {
                        self.maybe_rescue_foreign_crossing(program[*field].ty)?;
                    }
                }
                NativeRef::Method(target) => {
                    self.rescue_call_target(*target)?;
                    for &param in &program[*target].params {
                        self.maybe_rescue_foreign_crossing(program[param].ty)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn rescue_overriders(&mut self, m: MethodId) -> Result<()> {
        let overrides = self.overrides;
        for &overrider in overrides.overriders(m) {
            if self.marks.method_state(overrider) == Liveness::Live {
                continue;
            }
            if self.is_instantiable(self.program[overrider].enclosing) {
                self.rescue_method(overrider)?;
            } else {
                self.marks.defer(overrider);
            }
        }
        Ok(())
    }

    /// Rescue the target of a call. Static methods, constructors, static
    /// initializers, and methods whose receiver type is already proven
    /// instantiable are guaranteed callees; any other virtual target is
    /// deferred until an instantiability proof arrives.
    fn rescue_call_target(&mut self, m: MethodId) -> Result<()> {
        let program = self.program;
        let method = &program[m];
        let guaranteed = method.is_static
            || method.kind != MethodKind::Ordinary
            || self.is_instantiable(method.enclosing);
        if guaranteed {
            self.rescue_method(m)
        } else if self.marks.defer(m) {
            debug!(
                "deferred virtual target: {}.{}",
                program[method.enclosing].name, method.name
            );
            self.rescue_overriders(m)
        } else {
            Ok(())
        }
    }

    /// A field read. Static reads touch the enclosing type; the first
    /// read makes the initializer's code reachable.
    fn rescue_field_ref(&mut self, f: FieldId) -> Result<()> {
        let program = self.program;
        let field = &program[f];
        if field.is_static {
            self.rescue_type(RefType::Declared(field.enclosing), true, false)?;
        }
        if self.marks.mark_field_live(f) {
            if let Some(init) = &field.initializer {
                accept_expr(self, init)?;
            }
        }
        Ok(())
    }

    /// A class literal rescues slightly less than a field read: the
    /// backing field and its initializer, plus raw marks for the
    /// enclosing type and its static initializer with no structural
    /// rescue, so per-class setup bodies (and their class-name strings)
    /// stay out of the output unless something else needs them.
    fn rescue_class_literal(&mut self, f: FieldId) -> Result<()> {
        let program = self.program;
        let field = &program[f];
        self.marks.mark_referenced(RefType::Declared(field.enclosing));
        self.marks.promote(program.static_initializer(field.enclosing));
        if self.marks.mark_field_live(f) {
            if let Some(init) = &field.initializer {
                accept_expr(self, init)?;
            }
        }
        Ok(())
    }

    fn rescue_string(&mut self, s: &str) -> Result<()> {
        self.marks.add_string(s);
        let string_type = self.program.well_known().string_type;
        self.rescue_type(RefType::Declared(string_type), true, true)
    }

    /// String concatenation converts its operands: a non-string
    /// reference operand needs the universal `toString`, a char operand
    /// needs the single-char conversion. Other primitives convert
    /// through arithmetic paths that carry no method dependency.
    fn rescue_by_concat(&mut self, ty: TypeRef) -> Result<()> {
        let program = self.program;
        match ty {
            TypeRef::Prim(PrimType::Char) => {
                let conv = self.string_value_of_char()?;
                self.rescue_method(conv)
            }
            TypeRef::Declared(id) if id != program.well_known().string_type => {
                self.rescue_method(program.well_known().object_to_string)
            }
            TypeRef::Array(_) => self.rescue_method(program.well_known().object_to_string),
            _ => Ok(()),
        }
    }

    fn string_value_of_char(&mut self) -> Result<MethodId> {
        if let Some(m) = self.string_value_of_char {
            return Ok(m);
        }
        let program = self.program;
        let string_type = program.well_known().string_type;
        let found = program[string_type].methods.iter().copied().find(|&m| {
            let method = &program[m];
            method.is_static
                && method.name == "valueOf"
                && method.params.len() == 1
                && program[method.params[0]].ty == TypeRef::Prim(PrimType::Char)
        });
        let m = found.ok_or_else(|| Error::MissingWellKnown {
            what: "String.valueOf(char)".into(),
        })?;
        self.string_value_of_char = Some(m);
        Ok(m)
    }

    /// Values of a foreign wrapper type, the string type, or arrays of
    /// primitives/strings/wrappers can cross in from the foreign side
    /// without a visible constructor call, so a type at a crossing point
    /// must be treated as instantiated.
    fn maybe_rescue_foreign_crossing(&mut self, ty: TypeRef) -> Result<()> {
        let program = self.program;
        match ty {
            TypeRef::Declared(id) => {
                if program.is_foreign_class(id) || id == program.well_known().string_type {
                    self.rescue_type(RefType::Declared(id), true, true)?;
                }
            }
            TypeRef::Array(id) => {
                let crossable = match program[id].leaf {
                    TypeRef::Prim(_) => true,
                    TypeRef::Declared(leaf) => {
                        program.is_foreign_class(leaf)
                            || leaf == program.well_known().string_type
                    }
                    _ => false,
                };
                if crossable {
                    self.rescue_type(RefType::Array(id), true, true)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// `new T[a][b]` instantiates the outer array and, implicitly, every
    /// nested array type down to the first unspecified dimension.
    fn rescue_new_array(&mut self, na: &NewArray) -> Result<()> {
        let program = self.program;
        let arr = program[na.array];
        match &na.dims {
            Some(dims) => {
                debug_assert_eq!(dims.len(), arr.dims);
                for (i, dim) in dims.iter().enumerate() {
                    if matches!(dim, ArrayDim::Absent) {
                        break;
                    }
                    let nested = self.lookup_array(arr.leaf, arr.dims - i)?;
                    self.rescue_type(RefType::Array(nested), true, true)?;
                }
            }
            None => {
                self.rescue_type(RefType::Array(na.array), true, true)?;
            }
        }
        Ok(())
    }

    fn visit_binary(&mut self, b: &Binary) -> Result<bool> {
        let program = self.program;
        let string_type = TypeRef::Declared(program.well_known().string_type);
        if matches!(b.op, BinOp::Add | BinOp::AddAssign) && b.ty == string_type {
            self.rescue_by_concat(b.lhs.ty(program))?;
            self.rescue_by_concat(b.rhs.ty(program))?;
        }
        if b.op == BinOp::Assign {
            return self.visit_assignment(b);
        }
        Ok(true)
    }

    /// Dead-store elision: a plain write never makes its target live.
    /// The right-hand side still runs, a field write still touches the
    /// qualifier and (for statics) the enclosing type, and a volatile
    /// field write is observable so the field itself stays.
    fn visit_assignment(&mut self, b: &Binary) -> Result<bool> {
        let program = self.program;
        match b.lhs.as_ref() {
            Expr::VarRef(_) => {
                accept_expr(self, &b.rhs)?;
                Ok(false)
            }
            Expr::FieldRef(fr) => {
                if let Some(instance) = &fr.instance {
                    accept_expr(self, instance)?;
                }
                let field = &program[fr.field];
                if field.is_volatile {
                    self.rescue_field_ref(fr.field)?;
                } else if field.is_static {
                    self.rescue_type(RefType::Declared(field.enclosing), true, false)?;
                }
                accept_expr(self, &b.rhs)?;
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}

impl Visitor for ReachabilityAnalyzer<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<bool> {
        if let Stmt::Declaration(decl) = stmt {
            if let DeclTarget::Field { field, .. } = &decl.target {
                let program = self.program;
                let f = *field;
                let field = &program[f];
                if field.is_volatile {
                    self.rescue_field_ref(f)?;
                } else if field.is_static {
                    self.rescue_type(RefType::Declared(field.enclosing), true, false)?;
                }
            }
        }
        Ok(true)
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<bool> {
        let program = self.program;
        match expr {
            Expr::Literal(Literal::Str(s)) => {
                self.rescue_string(s)?;
                Ok(true)
            }
            Expr::VarRef(v) => {
                self.marks.mark_var_live(*v);
                Ok(true)
            }
            Expr::FieldRef(fr) => {
                self.rescue_field_ref(fr.field)?;
                Ok(true)
            }
            Expr::Call(call) => {
                self.rescue_call_target(call.target)?;
                Ok(true)
            }
            Expr::New(new) => {
                let t = program[new.ctor].enclosing;
                self.rescue_type(RefType::Declared(t), true, true)?;
                self.rescue_method(new.ctor)?;
                Ok(true)
            }
            Expr::NewArray(na) => {
                self.rescue_new_array(na)?;
                Ok(true)
            }
            Expr::Binary(b) => self.visit_binary(b),
            Expr::Cast(c) => {
                if let Some(t) = c.target.as_ref_type() {
                    if program.is_foreign_ref(c.target) {
                        self.rescue_type(t, true, true)?;
                    }
                }
                Ok(true)
            }
            Expr::InstanceOf(i) => {
                if let Some(t) = i.test.as_ref_type() {
                    if program.is_foreign_ref(i.test) {
                        self.rescue_type(t, true, true)?;
                    }
                }
                Ok(true)
            }
            Expr::ClassLiteral(f) => {
                self.rescue_class_literal(*f)?;
                Ok(true)
            }
            _ => Ok(true),
        }
    }
}
