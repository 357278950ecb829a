//! Statement and expression nodes for resolved method bodies.
//!
//! Unlike a source-level AST, every reference here is already resolved
//! to a graph handle: identifiers became `VarRef`/`FieldRef`, call names
//! became `MethodId` targets. Node kinds are tagged unions so traversal
//! is a single exhaustive match; a new kind that lacks a rescue rule is
//! a compile error, not a silent omission.

use crate::graph::{ArrayId, FieldId, MethodId, PrimType, Program, TypeRef, VarId};

/// The body of a method.
#[derive(Debug, Clone)]
pub enum MethodBody {
    /// Abstract or interface method; nothing to traverse.
    Absent,
    Source(Block),
    /// Foreign (native) body: opaque code on the other side of the
    /// boundary, visible only through the references it declares.
    Native(NativeBody),
}

/// What a native method body touches on the managed side. The foreign
/// code itself is opaque; the front end extracts its embedded string
/// literals and its references back into the program.
#[derive(Debug, Clone, Default)]
pub struct NativeBody {
    pub used_strings: Vec<String>,
    pub refs: Vec<NativeRef>,
}

/// A reference from foreign code back into the program.
#[derive(Debug, Clone)]
pub enum NativeRef {
    /// A field read or write from the foreign side. A write passes a
    /// foreign value into the program.
    Field { field: FieldId, lvalue: bool },
    /// A method referenced (and possibly called) from the foreign side.
    Method(MethodId),
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn of(statements: Vec<Stmt>) -> Self {
        Block { statements }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),
    Declaration(DeclStmt),
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    Return(Option<Expr>),
    Throw(Expr),
    Empty,
}

/// A declaration statement. Declaring a variable does not make it live;
/// only reads do.
#[derive(Debug, Clone)]
pub struct DeclStmt {
    pub target: DeclTarget,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum DeclTarget {
    Local(VarId),
    /// Field initializations hoisted into initializer methods keep their
    /// qualifier so its side effects survive dead-store elision.
    Field {
        field: FieldId,
        instance: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    VarRef(VarId),
    FieldRef(FieldRef),
    Call(Call),
    New(New),
    NewArray(NewArray),
    Binary(Binary),
    Unary(Unary),
    Cast(Cast),
    InstanceOf(InstanceOf),
    Conditional(Conditional),
    ArrayAccess(ArrayAccess),
    /// A class literal; backed by a synthesized static field.
    ClassLiteral(FieldId),
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Char(char),
    Bool(bool),
    Str(String),
    Null,
}

#[derive(Debug, Clone)]
pub struct FieldRef {
    pub field: FieldId,
    pub instance: Option<Box<Expr>>,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub target: MethodId,
    pub receiver: Option<Box<Expr>>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct New {
    pub ctor: MethodId,
    pub args: Vec<Expr>,
}

/// Array instantiation, either `new T[a][b]` (dims, possibly with
/// trailing unspecified dimensions) or `new T[]{...}` (initializers).
#[derive(Debug, Clone)]
pub struct NewArray {
    pub array: ArrayId,
    pub dims: Option<Vec<ArrayDim>>,
    pub initializers: Option<Vec<Expr>>,
}

#[derive(Debug, Clone)]
pub enum ArrayDim {
    Sized(Expr),
    /// An omitted trailing dimension, as in `new int[4][]`.
    Absent,
}

#[derive(Debug, Clone)]
pub struct Binary {
    pub op: BinOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    /// Result type, as resolved by the front end. Drives the string
    /// concatenation rules.
    pub ty: TypeRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    And,
    Or,
    Assign,
    AddAssign,
}

#[derive(Debug, Clone)]
pub struct Unary {
    pub op: UnOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone)]
pub struct Cast {
    pub target: TypeRef,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct InstanceOf {
    pub test: TypeRef,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct Conditional {
    pub condition: Box<Expr>,
    pub then_expr: Box<Expr>,
    pub else_expr: Box<Expr>,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct ArrayAccess {
    pub array: Box<Expr>,
    pub index: Box<Expr>,
}

impl Expr {
    /// The resolved type of this expression.
    pub fn ty(&self, program: &Program) -> TypeRef {
        match self {
            Expr::Literal(lit) => match lit {
                Literal::Int(_) => TypeRef::Prim(PrimType::Int),
                Literal::Char(_) => TypeRef::Prim(PrimType::Char),
                Literal::Bool(_) => TypeRef::Prim(PrimType::Boolean),
                Literal::Str(_) => TypeRef::Declared(program.well_known().string_type),
                Literal::Null => TypeRef::Null,
            },
            Expr::VarRef(v) => program[*v].ty,
            Expr::FieldRef(fr) => program[fr.field].ty,
            Expr::Call(call) => program[call.target].return_ty,
            Expr::New(new) => TypeRef::Declared(program[new.ctor].enclosing),
            Expr::NewArray(na) => TypeRef::Array(na.array),
            Expr::Binary(b) => b.ty,
            Expr::Unary(u) => u.operand.ty(program),
            Expr::Cast(c) => c.target,
            Expr::InstanceOf(_) => TypeRef::Prim(PrimType::Boolean),
            Expr::Conditional(c) => c.ty,
            Expr::ArrayAccess(acc) => match acc.array.ty(program) {
                TypeRef::Array(id) => program[id].element,
                _ => TypeRef::Null,
            },
            Expr::ClassLiteral(f) => program[*f].ty,
        }
    }

    /// Whether evaluating this expression can have observable effects.
    /// Drives dead-store elision: an assignment whose left side has side
    /// effects cannot be skipped.
    pub fn has_side_effects(&self, program: &Program) -> bool {
        match self {
            Expr::Literal(_) | Expr::VarRef(_) | Expr::ClassLiteral(_) => false,
            Expr::FieldRef(fr) => fr
                .instance
                .as_ref()
                .is_some_and(|e| e.has_side_effects(program)),
            Expr::Call(_) | Expr::New(_) | Expr::NewArray(_) => true,
            Expr::Binary(b) => {
                matches!(b.op, BinOp::Assign | BinOp::AddAssign)
                    || b.lhs.has_side_effects(program)
                    || b.rhs.has_side_effects(program)
            }
            Expr::Unary(u) => u.operand.has_side_effects(program),
            Expr::Cast(c) => c.expr.has_side_effects(program),
            Expr::InstanceOf(i) => i.expr.has_side_effects(program),
            Expr::Conditional(c) => {
                c.condition.has_side_effects(program)
                    || c.then_expr.has_side_effects(program)
                    || c.else_expr.has_side_effects(program)
            }
            Expr::ArrayAccess(acc) => {
                acc.array.has_side_effects(program) || acc.index.has_side_effects(program)
            }
        }
    }
}
