//! Generic traversal dispatch over body nodes.
//!
//! The protocol is visit-with-result-boolean: a visitor's `visit_*`
//! method returns `Ok(true)` to descend into the node's children or
//! `Ok(false)` when it has handled (or deliberately skipped) them
//! itself. `accept_*` runs the visit and, when asked, the child walk;
//! `walk_*` enumerates children with an exhaustive match so every node
//! kind is accounted for at compile time.

use crate::error::Result;

use super::nodes::{ArrayDim, DeclTarget, Expr, Stmt};

/// Visitor over statements and expressions. Implementations override
/// what they care about; the defaults descend everywhere.
pub trait Visitor {
    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<bool> {
        let _ = stmt;
        Ok(true)
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<bool> {
        let _ = expr;
        Ok(true)
    }
}

/// Visit a statement, then its children unless the visitor declined.
pub fn accept_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) -> Result<()> {
    if v.visit_stmt(stmt)? {
        walk_stmt(v, stmt)?;
    }
    Ok(())
}

/// Visit an expression, then its children unless the visitor declined.
pub fn accept_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) -> Result<()> {
    if v.visit_expr(expr)? {
        walk_expr(v, expr)?;
    }
    Ok(())
}

/// Visit the children of a statement.
///
/// A declaration's target variable is not an expression node, so the
/// walk naturally visits only the initializer and, for field targets,
/// the qualifier; declaring a variable never marks it.
pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) -> Result<()> {
    match stmt {
        Stmt::Expression(expr) => accept_expr(v, expr),
        Stmt::Declaration(decl) => {
            if let Some(init) = &decl.initializer {
                accept_expr(v, init)?;
            }
            if let DeclTarget::Field {
                instance: Some(instance),
                ..
            } = &decl.target
            {
                accept_expr(v, instance)?;
            }
            Ok(())
        }
        Stmt::Block(block) => {
            for s in &block.statements {
                accept_stmt(v, s)?;
            }
            Ok(())
        }
        Stmt::If(stmt) => {
            accept_expr(v, &stmt.condition)?;
            accept_stmt(v, &stmt.then_branch)?;
            if let Some(else_branch) = &stmt.else_branch {
                accept_stmt(v, else_branch)?;
            }
            Ok(())
        }
        Stmt::While(stmt) => {
            accept_expr(v, &stmt.condition)?;
            accept_stmt(v, &stmt.body)
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                accept_expr(v, value)?;
            }
            Ok(())
        }
        Stmt::Throw(expr) => accept_expr(v, expr),
        Stmt::Empty => Ok(()),
    }
}

/// Visit the children of an expression.
pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) -> Result<()> {
    match expr {
        Expr::Literal(_) | Expr::VarRef(_) | Expr::ClassLiteral(_) => Ok(()),
        Expr::FieldRef(fr) => {
            if let Some(instance) = &fr.instance {
                accept_expr(v, instance)?;
            }
            Ok(())
        }
        Expr::Call(call) => {
            if let Some(receiver) = &call.receiver {
                accept_expr(v, receiver)?;
            }
            for arg in &call.args {
                accept_expr(v, arg)?;
            }
            Ok(())
        }
        Expr::New(new) => {
            for arg in &new.args {
                accept_expr(v, arg)?;
            }
            Ok(())
        }
        Expr::NewArray(na) => {
            if let Some(dims) = &na.dims {
                for dim in dims {
                    if let ArrayDim::Sized(expr) = dim {
                        accept_expr(v, expr)?;
                    }
                }
            }
            if let Some(initializers) = &na.initializers {
                for init in initializers {
                    accept_expr(v, init)?;
                }
            }
            Ok(())
        }
        Expr::Binary(b) => {
            accept_expr(v, &b.lhs)?;
            accept_expr(v, &b.rhs)
        }
        Expr::Unary(u) => accept_expr(v, &u.operand),
        Expr::Cast(c) => accept_expr(v, &c.expr),
        Expr::InstanceOf(i) => accept_expr(v, &i.expr),
        Expr::Conditional(c) => {
            accept_expr(v, &c.condition)?;
            accept_expr(v, &c.then_expr)?;
            accept_expr(v, &c.else_expr)
        }
        Expr::ArrayAccess(acc) => {
            accept_expr(v, &acc.array)?;
            accept_expr(v, &acc.index)
        }
    }
}
