//! Null-safety analysis over a loaded program.
//!
//! Infers a static type for every expression from literals, slot types,
//! struct and connector declarations and callee signatures, and reports the
//! places where `null` meets a value type or an operator that cannot take it.
//! Everything found is collected; nothing stops at the first error.

use crate::op::BinOp;
use crate::program::{Call, CallableUnit, Expr, InterpretedFunction, LValue, Program, Stmt};
use crate::val::{RefType, Type};

use super::{SemanticError, SemanticErrors};

/// Runs the checker over every interpreted function of `program`.
pub fn check_program(program: &Program) -> Result<(), SemanticErrors> {
    let mut checker = NullChecker::new(program);
    for (_, unit) in program.callables() {
        if let CallableUnit::Function(f) = unit {
            checker.check_function(f);
        }
    }
    checker.finish()
}

pub struct NullChecker<'p> {
    program: &'p Program,
    errors: Vec<SemanticError>,
    function: String,
    loop_depth: usize,
}

impl<'p> NullChecker<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            errors: Vec::new(),
            function: String::new(),
            loop_depth: 0,
        }
    }

    pub fn finish(self) -> Result<(), SemanticErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SemanticErrors(self.errors))
        }
    }

    pub fn check_function(&mut self, f: &InterpretedFunction) {
        self.function = f.sig.name.clone();
        self.loop_depth = 0;
        for stmt in &f.body {
            self.stmt(f, stmt);
        }
    }

    fn error<S: Into<String>>(&mut self, message: S) {
        self.errors.push(SemanticError::new(self.function.as_str(), message));
    }

    fn stmt(&mut self, f: &InterpretedFunction, stmt: &Stmt) {
        match stmt {
            Stmt::Var { ty, init, .. } => {
                if let Some(init) = init {
                    self.expect(f, ty, init);
                }
            }
            Stmt::Assign { targets, value } => {
                let target_types: Vec<Type> = targets.iter().map(|t| self.lvalue(f, t)).collect();
                if let [ty] = target_types.as_slice() {
                    self.expect(f, ty, value);
                } else {
                    let (found, clean) = self.tracked(|c| c.infer_multi(f, value));
                    if found.len() != target_types.len() {
                        self.error(format!(
                            "assignment count mismatch: expected {} values, found {}",
                            target_types.len(),
                            found.len()
                        ));
                    } else {
                        for (expected, found) in target_types.iter().zip(found.iter()) {
                            self.compatible_after(expected, found, clean);
                        }
                    }
                }
            }
            Stmt::If { cond, then, otherwise } => {
                self.expect(f, &Type::Bool, cond);
                for s in then.iter().chain(otherwise.iter()) {
                    self.stmt(f, s);
                }
            }
            Stmt::While { cond, body } => {
                self.expect(f, &Type::Bool, cond);
                self.loop_depth += 1;
                for s in body {
                    self.stmt(f, s);
                }
                self.loop_depth -= 1;
            }
            Stmt::Break | Stmt::Continue => {
                if self.loop_depth == 0 {
                    self.error("break or continue outside a loop");
                }
            }
            Stmt::Return(exprs) => self.check_return(f, exprs),
            Stmt::Expr(e) => {
                self.infer_multi(f, e);
            }
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.stmt(f, s);
                }
            }
        }
    }

    fn check_return(&mut self, f: &InterpretedFunction, exprs: &[Expr]) {
        let returns = &f.sig.returns;
        if let [single] = exprs
            && returns.len() > 1
        {
            let (found, clean) = self.tracked(|c| c.infer_multi(f, single));
            if found.len() != returns.len() {
                self.error(format!(
                    "incorrect number of return values: expected {}, found {}",
                    returns.len(),
                    found.len()
                ));
            } else {
                for (expected, found) in returns.iter().zip(found.iter()) {
                    self.compatible_after(expected, found, clean);
                }
            }
            return;
        }
        if exprs.len() != returns.len() {
            self.error(format!(
                "incorrect number of return values: expected {}, found {}",
                returns.len(),
                exprs.len()
            ));
            return;
        }
        for (ty, e) in returns.iter().zip(exprs) {
            self.expect(f, ty, e);
        }
    }

    fn lvalue(&mut self, f: &InterpretedFunction, target: &LValue) -> Type {
        match target {
            LValue::Var(var) => slot_type(f, var.slot),
            LValue::Index { base, index } => self.index_type(f, base, index),
            LValue::Field { base, name } => self.field_type(f, base, name),
        }
    }

    /// Reports when `expr` cannot be stored where `expected` is declared.
    fn expect(&mut self, f: &InterpretedFunction, expected: &Type, expr: &Expr) {
        let (found, clean) = self.tracked(|c| c.infer(f, expr));
        self.compatible_after(expected, &found, clean);
    }

    /// Runs `infer` and reports whether it added no errors of its own.
    fn tracked<T>(&mut self, infer: impl FnOnce(&mut Self) -> T) -> (T, bool) {
        let before = self.errors.len();
        let found = infer(self);
        (found, self.errors.len() == before)
    }

    /// An `any` left behind by an already reported error is not reported again.
    fn compatible_after(&mut self, expected: &Type, found: &Type, clean: bool) {
        if clean || !matches!(found, Type::Any) {
            self.compatible(expected, found);
        }
    }

    fn compatible(&mut self, expected: &Type, found: &Type) {
        if found.is_null_literal() && expected.is_value_type() {
            self.error(format!("incompatible types: 'null' cannot be assigned to '{expected}'"));
        } else if matches!(found, Type::Any) {
            // an `any` may hold null; value slots take it only through a cast
            if expected.is_value_type() {
                self.error(format!("incompatible types: expected '{expected}', found 'any'"));
            }
        } else if !expected.accepts(found) {
            self.error(format!("incompatible types: expected '{expected}', found '{found}'"));
        }
    }

    fn infer_multi(&mut self, f: &InterpretedFunction, expr: &Expr) -> Vec<Type> {
        match expr {
            Expr::Call(call) => self.call(f, call),
            Expr::Action { connector, action, args, .. } => self.action(f, connector, action, args),
            _ => vec![self.infer(f, expr)],
        }
    }

    fn infer(&mut self, f: &InterpretedFunction, expr: &Expr) -> Type {
        match expr {
            Expr::Int(_) => Type::Int,
            Expr::Float(_) => Type::Float,
            Expr::Bool(_) => Type::Bool,
            Expr::Str(_) => Type::String,
            Expr::Null => Type::null(),
            Expr::Json(_) => Type::json(),
            Expr::Xml(_) => Type::xml(),
            Expr::Var(var) => slot_type(f, var.slot),
            Expr::Array { elem, items } => {
                for item in items {
                    self.expect(f, elem, item);
                }
                Type::array_of(elem.clone())
            }
            Expr::Map(entries) => {
                for (_, e) in entries {
                    self.infer(f, e);
                }
                Type::map()
            }
            Expr::Struct { name, fields } => {
                let program = self.program;
                match program.struct_def(name) {
                    Some(def) => {
                        for (field, e) in fields {
                            match def.field_type(field) {
                                Some(ty) => self.expect(f, ty, e),
                                None => self.error(format!("unknown field '{field}' in struct '{name}'")),
                            }
                        }
                    }
                    None => self.error(format!("undefined struct '{name}'")),
                }
                Type::structure(name.as_str())
            }
            Expr::Connector { name, args } => {
                let program = self.program;
                match program.connector_params(name) {
                    Some(params) => {
                        if params.len() != args.len() {
                            self.error(format!(
                                "incorrect number of arguments for connector '{name}': expected {}, found {}",
                                params.len(),
                                args.len()
                            ));
                        }
                        for (p, e) in params.iter().zip(args) {
                            self.expect(f, &p.ty, e);
                        }
                    }
                    None => self.error(format!("undefined connector '{name}'")),
                }
                Type::connector(name.as_str())
            }
            Expr::Message(payload) => {
                self.expect(f, &Type::String, payload);
                Type::message()
            }
            Expr::Index { base, index } => self.index_type(f, base, index),
            Expr::Field { base, name } => self.field_type(f, base, name),
            Expr::Unary { op, expr } => {
                let ty = self.infer(f, expr);
                if ty.is_null_literal() {
                    self.error(format!("invalid operation: operator {op} not defined on 'null'"));
                    return Type::Any;
                }
                match op {
                    crate::op::UnaryOp::Not => Type::Bool,
                    crate::op::UnaryOp::Neg => ty,
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let l = self.infer(f, lhs);
                let r = self.infer(f, rhs);
                self.binary(*op, &l, &r)
            }
            Expr::Cast { expr, to } => {
                if matches!(**expr, Expr::Null) {
                    self.error(format!("incompatible types: 'null' cannot be cast to '{to}'"));
                } else {
                    self.infer(f, expr);
                }
                to.clone()
            }
            Expr::Call(_) | Expr::Action { .. } => {
                let returns = self.infer_multi(f, expr);
                match returns.into_iter().next() {
                    Some(ty) => ty,
                    None => {
                        let callee = match expr {
                            Expr::Call(call) => call.callee.as_str(),
                            _ => "action",
                        };
                        self.error(format!("function '{callee}' does not return a value"));
                        Type::Any
                    }
                }
            }
        }
    }

    fn binary(&mut self, op: BinOp, l: &Type, r: &Type) -> Type {
        if op.is_equality() {
            if !l.comparable_with(r) {
                self.error(format!("invalid operation: incompatible types '{l}' and '{r}'"));
            }
            return Type::Bool;
        }
        if op.is_logical() {
            if l.is_null_literal() || r.is_null_literal() {
                self.error(format!("invalid operation: incompatible types '{l}' and '{r}'"));
            } else {
                for ty in [l, r] {
                    if !matches!(ty, Type::Any) {
                        self.compatible(&Type::Bool, ty);
                    }
                }
            }
            return Type::Bool;
        }
        if l.is_null_literal() || r.is_null_literal() {
            self.error(format!("invalid operation: operator {op} not defined on 'null'"));
            return if op.is_ordering() { Type::Bool } else { Type::Any };
        }
        if op.is_ordering() {
            let ok = matches!(l, Type::Any)
                || matches!(r, Type::Any)
                || (l.is_numeric() && r.is_numeric())
                || (*l == Type::String && *r == Type::String);
            if !ok {
                self.error(format!("invalid operation: incompatible types '{l}' and '{r}'"));
            }
            return Type::Bool;
        }

        // arithmetic
        match (l, r) {
            (Type::Any, _) | (_, Type::Any) => Type::Any,
            (Type::String, _) | (_, Type::String) if op == BinOp::Add => Type::String,
            (Type::Int, Type::Int) => Type::Int,
            (a, b) if a.is_numeric() && b.is_numeric() => Type::Float,
            _ => {
                self.error(format!("invalid operation: incompatible types '{l}' and '{r}'"));
                Type::Any
            }
        }
    }

    fn index_type(&mut self, f: &InterpretedFunction, base: &Expr, index: &Expr) -> Type {
        let base_ty = self.infer(f, base);
        match base_ty {
            Type::Ref(RefType::Array(elem)) => {
                self.expect(f, &Type::Int, index);
                *elem
            }
            Type::Ref(RefType::Map) => {
                self.expect(f, &Type::String, index);
                Type::Any
            }
            Type::Ref(RefType::Json) => {
                self.infer(f, index);
                Type::json()
            }
            Type::Any => {
                self.infer(f, index);
                Type::Any
            }
            other => {
                self.infer(f, index);
                self.error(format!("invalid operation: cannot index '{other}'"));
                Type::Any
            }
        }
    }

    fn field_type(&mut self, f: &InterpretedFunction, base: &Expr, name: &str) -> Type {
        let base_ty = self.infer(f, base);
        let program = self.program;
        match &base_ty {
            Type::Ref(RefType::Struct(s)) => match program.struct_def(s).map(|d| d.field_type(name)) {
                Some(Some(ty)) => ty.clone(),
                Some(None) => {
                    self.error(format!("unknown field '{name}' in struct '{s}'"));
                    Type::Any
                }
                // Reported where the struct is used
                None => Type::Any,
            },
            Type::Ref(RefType::Connector(c)) => {
                match program
                    .connector_params(c)
                    .and_then(|ps| ps.iter().find(|p| p.name == name))
                {
                    Some(p) => p.ty.clone(),
                    None => {
                        self.error(format!("unknown field '{name}' in connector '{c}'"));
                        Type::Any
                    }
                }
            }
            Type::Ref(RefType::Json) => Type::json(),
            Type::Any => Type::Any,
            other => {
                self.error(format!("invalid operation: '{other}' has no field '{name}'"));
                Type::Any
            }
        }
    }

    fn call(&mut self, f: &InterpretedFunction, call: &Call) -> Vec<Type> {
        let program = self.program;
        let Some(unit) = program.lookup(&call.callee) else {
            for arg in &call.args {
                self.infer(f, arg);
            }
            self.error(format!("undefined function '{}'", call.callee));
            return vec![Type::Any];
        };
        let sig = unit.sig();
        self.arguments(f, &call.callee, &sig.params.iter().map(|p| p.ty.clone()).collect::<Vec<_>>(), &call.args);
        sig.returns.clone()
    }

    fn action(&mut self, f: &InterpretedFunction, connector: &Expr, action: &str, args: &[Expr]) -> Vec<Type> {
        let conn_ty = self.infer(f, connector);
        let name = match &conn_ty {
            Type::Ref(RefType::Connector(name)) => format!("{name}.{action}"),
            Type::Any => {
                for arg in args {
                    self.infer(f, arg);
                }
                return vec![Type::Any];
            }
            other => {
                self.error(format!("invalid operation: action '{action}' on '{other}'"));
                return vec![Type::Any];
            }
        };
        let program = self.program;
        let Some(unit) = program.lookup(&name) else {
            self.error(format!("undefined function '{name}'"));
            return vec![Type::Any];
        };
        let sig = unit.sig();
        let params: Vec<Type> = sig.params.iter().skip(1).map(|p| p.ty.clone()).collect();
        self.arguments(f, &name, &params, args);
        sig.returns.clone()
    }

    fn arguments(&mut self, f: &InterpretedFunction, callee: &str, params: &[Type], args: &[Expr]) {
        if params.len() != args.len() {
            self.error(format!(
                "incorrect number of arguments for '{callee}': expected {}, found {}",
                params.len(),
                args.len()
            ));
        }
        for (ty, arg) in params.iter().zip(args) {
            let (found, clean) = self.tracked(|c| c.infer(f, arg));
            if found.is_null_literal() && ty.is_value_type() {
                // No signature takes null here
                self.error(format!("undefined function '{callee}'"));
            } else {
                self.compatible_after(ty, &found, clean);
            }
        }
    }
}

fn slot_type(f: &InterpretedFunction, slot: Option<usize>) -> Type {
    slot.and_then(|s| f.layout.slots.get(s)).cloned().unwrap_or(Type::Any)
}
