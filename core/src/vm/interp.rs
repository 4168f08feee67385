use std::sync::Arc;

use anyhow::Result;

use super::{Context, Dispatcher};
use crate::fault::Fault;
use crate::op::BinOp;
use crate::program::{Call, Expr, InterpretedFunction, LValue, Stmt};
use crate::val::{MapValue, MessageValue, RefType, RefVal, StructValue, Val};

/// Lifecycle of one interpreted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Running,
    Returned,
    Faulted,
}

/// How a statement finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return,
}

/// Tree-walking evaluator for one interpreted function body, running against
/// the frame on top of the context's control stack.
pub struct Interpreter<'a> {
    dispatcher: Dispatcher<'a>,
    func: &'a InterpretedFunction,
    state: ExecState,
}

impl<'a> Interpreter<'a> {
    pub fn new(dispatcher: Dispatcher<'a>, func: &'a InterpretedFunction) -> Self {
        Self {
            dispatcher,
            func,
            state: ExecState::Running,
        }
    }

    #[inline]
    pub fn state(&self) -> ExecState {
        self.state
    }

    /// Executes the body until it returns, runs off the end or faults.
    /// The remaining statements are skipped once a fault is raised.
    pub fn run(&mut self, ctx: &mut Context) -> Result<()> {
        let func = self.func;
        for stmt in &func.body {
            match self.exec(ctx, stmt) {
                Ok(Flow::Return) => break,
                Ok(Flow::Normal) => {}
                Ok(Flow::Break | Flow::Continue) => {
                    self.state = ExecState::Faulted;
                    return Err(Fault::AnalyzerDefect("break or continue outside a loop".to_string()).into());
                }
                Err(err) => {
                    self.state = ExecState::Faulted;
                    return Err(err);
                }
            }
        }
        self.state = ExecState::Returned;
        Ok(())
    }

    fn exec_block(&mut self, ctx: &mut Context, stmts: &[Stmt]) -> Result<Flow> {
        for stmt in stmts {
            let flow = self.exec(ctx, stmt)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, ctx: &mut Context, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Var { name, ty, init, slot } => {
                let value = match init {
                    Some(e) => self.eval(ctx, e)?,
                    None => ty.default_value(),
                };
                let slot = slot.ok_or_else(|| missing_layout(name))?;
                ctx.frame_mut()?.set(slot, value.bind(ty)?)?;
            }
            Stmt::Assign { targets, value } => {
                if let [target] = targets.as_slice() {
                    let v = self.eval(ctx, value)?;
                    self.assign(ctx, target, v)?;
                } else {
                    let values = self.eval_multi(ctx, value)?;
                    if values.len() != targets.len() {
                        return Err(Fault::AnalyzerDefect(format!(
                            "assignment count mismatch: {} target(s), {} value(s)",
                            targets.len(),
                            values.len()
                        ))
                        .into());
                    }
                    for (target, v) in targets.iter().zip(values) {
                        self.assign(ctx, target, v)?;
                    }
                }
            }
            Stmt::If { cond, then, otherwise } => {
                return if self.eval_cond(ctx, cond)? {
                    self.exec_block(ctx, then)
                } else {
                    self.exec_block(ctx, otherwise)
                };
            }
            Stmt::While { cond, body } => {
                while self.eval_cond(ctx, cond)? {
                    match self.exec_block(ctx, body)? {
                        Flow::Break => break,
                        Flow::Return => return Ok(Flow::Return),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Return(exprs) => {
                let values = match exprs.as_slice() {
                    [single] if self.func.sig.returns.len() > 1 => self.eval_multi(ctx, single)?,
                    _ => exprs
                        .iter()
                        .map(|e| self.eval(ctx, e))
                        .collect::<Result<Vec<_>>>()?,
                };
                let frame = ctx.frame_mut()?;
                for (i, v) in values.into_iter().enumerate() {
                    let v = match self.func.sig.returns.get(i) {
                        Some(ty) => v.bind(ty)?,
                        None => v,
                    };
                    frame.set_return(i, v)?;
                }
                return Ok(Flow::Return);
            }
            Stmt::Expr(e) => {
                self.eval_multi(ctx, e)?;
            }
            Stmt::Block(stmts) => return self.exec_block(ctx, stmts),
        }
        Ok(Flow::Normal)
    }

    fn eval_cond(&mut self, ctx: &mut Context, cond: &Expr) -> Result<bool> {
        match self.eval(ctx, cond)? {
            Val::Bool(b) => Ok(b),
            other => Err(Fault::AnalyzerDefect(format!("condition is '{}', expected 'boolean'", other.ty())).into()),
        }
    }

    fn assign(&mut self, ctx: &mut Context, target: &LValue, value: Val) -> Result<()> {
        match target {
            LValue::Var(var) => {
                let slot = var.slot.ok_or_else(|| missing_layout(&var.name))?;
                let value = match self.func.layout.slots.get(slot) {
                    Some(ty) => value.bind(ty)?,
                    None => value,
                };
                ctx.frame_mut()?.set(slot, value)?;
            }
            LValue::Index { base, index } => {
                let container = self.eval(ctx, base)?;
                let key = self.eval(ctx, index)?;
                match container {
                    Val::Ref(RefVal::Null(_)) => return Err(null_deref(base).into()),
                    Val::Ref(RefVal::Array(arr)) => {
                        let idx = int_index(&key)?;
                        let mut arr = arr.write();
                        let value = value.bind(&arr.elem)?;
                        arr.set(idx, value)?;
                    }
                    Val::Ref(RefVal::Map(map)) => {
                        map.write().insert(string_key(&key)?, value);
                    }
                    other => {
                        return Err(Fault::AnalyzerDefect(format!("cannot index into '{}'", other.ty())).into());
                    }
                }
            }
            LValue::Field { base, name } => match self.eval(ctx, base)? {
                Val::Ref(RefVal::Null(_)) => return Err(null_deref(base).into()),
                Val::Ref(RefVal::Struct(s)) => {
                    let mut s = s.write();
                    let ty = self.dispatcher.program().struct_def(&s.name).and_then(|d| d.field_type(name));
                    let value = match ty {
                        Some(ty) => value.bind(ty)?,
                        None => value,
                    };
                    s.set_field(name, value)?;
                }
                other => {
                    return Err(Fault::AnalyzerDefect(format!("'{}' has no field '{name}'", other.ty())).into());
                }
            },
        }
        Ok(())
    }

    /// Evaluates `expr` to all of its values; only calls may yield other
    /// than exactly one.
    fn eval_multi(&mut self, ctx: &mut Context, expr: &Expr) -> Result<Vec<Val>> {
        match expr {
            Expr::Call(call) => self.eval_call(ctx, call),
            Expr::Action {
                connector,
                action,
                args,
                temp_base,
            } => self.eval_action(ctx, connector, action, args, *temp_base),
            _ => Ok(vec![self.eval(ctx, expr)?]),
        }
    }

    fn eval(&mut self, ctx: &mut Context, expr: &Expr) -> Result<Val> {
        let val = match expr {
            Expr::Int(i) => Val::Int(*i),
            Expr::Float(f) => Val::Float(*f),
            Expr::Bool(b) => Val::Bool(*b),
            Expr::Str(s) => Val::str(s),
            Expr::Null => Val::null(RefType::Null),
            Expr::Json(j) => Val::json(j.clone()),
            Expr::Xml(x) => Val::xml(x),
            Expr::Var(var) => {
                let slot = var.slot.ok_or_else(|| missing_layout(&var.name))?;
                ctx.frame()?.get(slot)?.clone()
            }
            Expr::Array { elem, items } => {
                let items = items
                    .iter()
                    .map(|e| Ok(self.eval(ctx, e)?.bind(elem)?))
                    .collect::<Result<Vec<_>>>()?;
                Val::array(elem.clone(), items)
            }
            Expr::Map(entries) => {
                let mut map = MapValue::new();
                for (k, e) in entries {
                    let v = self.eval(ctx, e)?;
                    map.insert(k.as_str(), v);
                }
                Val::map(map)
            }
            Expr::Struct { name, fields } => self.eval_struct(ctx, name, fields)?,
            Expr::Connector { name, args } => {
                let args = args.iter().map(|e| self.eval(ctx, e)).collect::<Result<Vec<_>>>()?;
                Val::connector(name.as_str(), args)
            }
            Expr::Message(payload) => match self.eval(ctx, payload)? {
                Val::Str(s) => Val::message(MessageValue {
                    payload: s.to_string(),
                    ..Default::default()
                }),
                other => {
                    return Err(Fault::AnalyzerDefect(format!("message payload is '{}'", other.ty())).into());
                }
            },
            Expr::Index { base, index } => {
                let container = self.eval(ctx, base)?;
                let key = self.eval(ctx, index)?;
                index_value(base, container, &key)?
            }
            Expr::Field { base, name } => {
                let target = self.eval(ctx, base)?;
                self.field_value(base, target, name)?
            }
            Expr::Unary { op, expr } => {
                let v = self.eval(ctx, expr)?;
                op.eval_val(&v)?
            }
            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval(ctx, lhs)?;
                match (op, &l) {
                    (BinOp::And, Val::Bool(false)) => Val::Bool(false),
                    (BinOp::Or, Val::Bool(true)) => Val::Bool(true),
                    _ => {
                        let r = self.eval(ctx, rhs)?;
                        op.eval_vals(&l, &r)?
                    }
                }
            }
            Expr::Cast { expr, to } => self.eval(ctx, expr)?.cast(to)?,
            Expr::Call(_) | Expr::Action { .. } => {
                let mut values = self.eval_multi(ctx, expr)?;
                if values.is_empty() {
                    return Err(Fault::AnalyzerDefect("call used as a value returns nothing".to_string()).into());
                }
                values.swap_remove(0)
            }
        };
        Ok(val)
    }

    fn eval_struct(&mut self, ctx: &mut Context, name: &str, inits: &[(String, Expr)]) -> Result<Val> {
        let program = self.dispatcher.program();
        let def = program
            .struct_def(name)
            .ok_or_else(|| Fault::AnalyzerDefect(format!("unknown struct '{name}'")))?;
        let mut value = StructValue::new(
            name,
            def.fields
                .iter()
                .map(|f| (Arc::from(f.name.as_str()), f.ty.default_value()))
                .collect(),
        );
        for (field, e) in inits {
            let v = self.eval(ctx, e)?;
            let v = match def.field_type(field) {
                Some(ty) => v.bind(ty)?,
                None => v,
            };
            value.set_field(field, v)?;
        }
        Ok(Val::structure(value))
    }

    fn field_value(&self, base: &Expr, target: Val, name: &str) -> Result<Val> {
        let val = match target {
            Val::Ref(RefVal::Null(_)) => return Err(null_deref(base).into()),
            Val::Ref(RefVal::Struct(s)) => s.read().field(name)?,
            Val::Ref(RefVal::Connector(c)) => {
                let params = self.dispatcher.program().connector_params(&c.name).unwrap_or_default();
                let idx = params
                    .iter()
                    .position(|p| p.name == name)
                    .ok_or_else(|| Fault::AnalyzerDefect(format!("connector '{}' has no parameter '{name}'", c.name)))?;
                c.args
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| Fault::Wiring(format!("connector '{}' built without '{name}'", c.name)))?
            }
            Val::Ref(RefVal::Json(j)) => match j.get(name) {
                Some(v) => Val::json(v.clone()),
                None => Val::null(RefType::Json),
            },
            other => {
                return Err(Fault::AnalyzerDefect(format!("'{}' has no field '{name}'", other.ty())).into());
            }
        };
        Ok(val)
    }

    /// Stages arguments in the temp area at the call site's base, then moves
    /// them into the callee's frame.
    fn eval_call(&mut self, ctx: &mut Context, call: &Call) -> Result<Vec<Val>> {
        let program = self.dispatcher.program();
        let unit = program.resolve(&call.callee)?;
        for (i, arg) in call.args.iter().enumerate() {
            let v = self.eval(ctx, arg)?;
            ctx.frame_mut()?.set_temp(call.temp_base + i, v)?;
        }
        let args = take_staged(ctx, call.temp_base, call.args.len())?;
        self.dispatcher.call(ctx, unit, args)
    }

    fn eval_action(
        &mut self,
        ctx: &mut Context,
        connector: &Expr,
        action: &str,
        args: &[Expr],
        base: usize,
    ) -> Result<Vec<Val>> {
        let conn = self.eval(ctx, connector)?;
        let name = match &conn {
            Val::Ref(RefVal::Null(_)) => return Err(Fault::null_connector().into()),
            Val::Ref(RefVal::Connector(c)) => c.name.clone(),
            other => {
                return Err(Fault::AnalyzerDefect(format!("action '{action}' invoked on '{}'", other.ty())).into());
            }
        };
        ctx.frame_mut()?.set_temp(base, conn)?;
        for (i, arg) in args.iter().enumerate() {
            let v = self.eval(ctx, arg)?;
            ctx.frame_mut()?.set_temp(base + 1 + i, v)?;
        }
        let unit = self.dispatcher.program().resolve(&format!("{name}.{action}"))?;
        let staged = take_staged(ctx, base, args.len() + 1)?;
        self.dispatcher.call(ctx, unit, staged)
    }
}

fn take_staged(ctx: &mut Context, base: usize, count: usize) -> Result<Vec<Val>, Fault> {
    let frame = ctx.frame_mut()?;
    (base..base + count).map(|i| frame.take_temp(i)).collect()
}

fn index_value(base: &Expr, container: Val, key: &Val) -> Result<Val> {
    let val = match container {
        Val::Ref(RefVal::Null(_)) => return Err(null_deref(base).into()),
        Val::Ref(RefVal::Array(arr)) => arr.read().get(int_index(key)?)?,
        Val::Ref(RefVal::Map(map)) => map.read().get(&string_key(key)?)?,
        Val::Ref(RefVal::Json(j)) => {
            let item = match key {
                Val::Int(i) => usize::try_from(*i).ok().and_then(|i| j.get(i)),
                Val::Str(s) => j.get(&**s),
                _ => None,
            };
            item.map_or(Val::null(RefType::Json), |v| Val::json(v.clone()))
        }
        other => {
            return Err(Fault::AnalyzerDefect(format!("cannot index into '{}'", other.ty())).into());
        }
    };
    Ok(val)
}

fn int_index(key: &Val) -> Result<i64, Fault> {
    key.as_int()
        .ok_or_else(|| Fault::AnalyzerDefect(format!("array index is '{}', expected 'int'", key.ty())))
}

fn string_key(key: &Val) -> Result<String, Fault> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| Fault::AnalyzerDefect(format!("map key is '{}', expected 'string'", key.ty())))
}

/// Null dereference fault naming what was dereferenced.
fn null_deref(base: &Expr) -> Fault {
    match base {
        Expr::Var(var) => Fault::null_variable(&var.name),
        Expr::Field { name, .. } => Fault::null_field(name),
        Expr::Index { base, .. } => null_deref(base),
        _ => Fault::NullReference("value is null".to_string()),
    }
}

fn missing_layout(name: &str) -> Fault {
    Fault::Wiring(format!("variable '{name}' has no slot; program was not laid out"))
}
