//! Slot layout pass.
//!
//! Walks a function body once, resolving every variable reference to a flat
//! stack slot index (parameters first, then locals in definition order, with
//! block scoping for shadowing) and assigning every call site the first temp
//! slot its arguments are staged in. Argument `i` of a call based at `b` is
//! staged at `b + i`, and any call nested inside that argument is based at
//! `b + i`, so live staged values are never overwritten.

use crate::util::fast_map::{FastHashMap, fast_hash_map_new};
use crate::val::Type;

use super::ast::{Expr, LValue, Stmt, VarRef};
use super::callable::{Layout, Param};

#[derive(Debug)]
struct FnCtx {
    /// Stack of block scopes for name -> slot mapping
    scopes: Vec<FastHashMap<String, usize>>,
    layout: Layout,
    errors: Vec<String>,
}

impl FnCtx {
    fn new() -> Self {
        Self {
            scopes: vec![fast_hash_map_new()],
            layout: Layout::default(),
            errors: Vec::new(),
        }
    }

    fn declare(&mut self, name: &str, ty: &Type) -> usize {
        let slot = self.layout.slots.len();
        self.layout.slots.push(ty.clone());
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), slot);
        }
        slot
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn resolve(&mut self, var: &mut VarRef) {
        match self.lookup(&var.name) {
            Some(slot) => var.slot = Some(slot),
            None => self.errors.push(format!("undefined variable '{}'", var.name)),
        }
    }

    fn note_temps(&mut self, end: usize) {
        self.layout.temp_size = self.layout.temp_size.max(end);
    }

    fn block(&mut self, stmts: &mut [Stmt]) {
        self.scopes.push(fast_hash_map_new());
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Var { name, ty, init, slot } => {
                // The initializer sees the enclosing binding, not the new one
                if let Some(init) = init {
                    self.expr(init, 0);
                }
                *slot = Some(self.declare(name, ty));
            }
            Stmt::Assign { targets, value } => {
                self.expr(value, 0);
                for target in targets {
                    match target {
                        LValue::Var(var) => self.resolve(var),
                        LValue::Index { base, index } => {
                            self.expr(base, 0);
                            self.expr(index, 0);
                        }
                        LValue::Field { base, .. } => self.expr(base, 0),
                    }
                }
            }
            Stmt::If { cond, then, otherwise } => {
                self.expr(cond, 0);
                self.block(then);
                self.block(otherwise);
            }
            Stmt::While { cond, body } => {
                self.expr(cond, 0);
                self.block(body);
            }
            Stmt::Break | Stmt::Continue => {}
            Stmt::Return(values) => {
                for v in values {
                    self.expr(v, 0);
                }
            }
            Stmt::Expr(e) => self.expr(e, 0),
            Stmt::Block(body) => self.block(body),
        }
    }

    /// `base` is the first temp slot free for calls inside `expr`.
    fn expr(&mut self, expr: &mut Expr, base: usize) {
        match expr {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Bool(_)
            | Expr::Str(_)
            | Expr::Null
            | Expr::Json(_)
            | Expr::Xml(_) => {}
            Expr::Var(var) => self.resolve(var),
            Expr::Array { items, .. } | Expr::Connector { args: items, .. } => {
                for item in items {
                    self.expr(item, base);
                }
            }
            Expr::Map(entries) | Expr::Struct { fields: entries, .. } => {
                for (_, value) in entries {
                    self.expr(value, base);
                }
            }
            Expr::Message(payload) => self.expr(payload, base),
            Expr::Index { base: b, index } => {
                self.expr(b, base);
                self.expr(index, base);
            }
            Expr::Field { base: b, .. } => self.expr(b, base),
            Expr::Unary { expr, .. } => self.expr(expr, base),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs, base);
                self.expr(rhs, base);
            }
            Expr::Cast { expr, .. } => self.expr(expr, base),
            Expr::Call(call) => {
                call.temp_base = base;
                for (i, arg) in call.args.iter_mut().enumerate() {
                    self.expr(arg, base + i);
                }
                self.note_temps(base + call.args.len());
            }
            Expr::Action {
                connector,
                args,
                temp_base,
                ..
            } => {
                *temp_base = base;
                self.expr(connector, base);
                for (i, arg) in args.iter_mut().enumerate() {
                    self.expr(arg, base + 1 + i);
                }
                self.note_temps(base + 1 + args.len());
            }
        }
    }
}

/// Resolves slots and temp bases in `body` in place.
///
/// Returns the layout, or every resolution error found.
pub fn layout_function(params: &[Param], body: &mut [Stmt]) -> Result<Layout, Vec<String>> {
    let mut ctx = FnCtx::new();
    for p in params {
        if ctx.lookup(&p.name).is_some() {
            ctx.errors.push(format!("duplicate parameter '{}'", p.name));
        }
        ctx.declare(&p.name, &p.ty);
    }
    // The body shares the parameter scope
    for stmt in body.iter_mut() {
        ctx.stmt(stmt);
    }
    if ctx.errors.is_empty() {
        Ok(ctx.layout)
    } else {
        Err(ctx.errors)
    }
}
