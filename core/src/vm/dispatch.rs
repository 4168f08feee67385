use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use super::{Context, Interpreter, StackFrame};
use crate::fault::Fault;
use crate::program::{CallableUnit, NativeHandler, NativeUnit, Program};
use crate::val::{Type, Val};

/// Runs callable units of one program, interpreted or native alike.
///
/// This is the only place that tells the two kinds apart.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'p> {
    program: &'p Program,
    trace_calls: bool,
}

impl<'p> Dispatcher<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            trace_calls: false,
        }
    }

    pub fn with_trace_calls(mut self, on: bool) -> Self {
        self.trace_calls = on;
        self
    }

    #[inline]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Resolves `name` and calls it.
    pub fn call_named(&self, ctx: &mut Context, name: &str, args: Vec<Val>) -> Result<Vec<Val>> {
        let unit = match self.program.resolve(name) {
            Ok(unit) => unit,
            Err(fault) => {
                let err = fault.into();
                ctx.record_fault(&err);
                return Err(err);
            }
        };
        self.call(ctx, unit, args)
    }

    /// Builds a frame for `unit` from its declared sizes, pushes it, runs the
    /// unit and pops the frame again, also when the unit faults. The first
    /// fault is recorded in `ctx` while its frame is still on the stack.
    pub fn call(&self, ctx: &mut Context, unit: &CallableUnit, args: Vec<Val>) -> Result<Vec<Val>> {
        let frame = match self.prepare(unit, args) {
            Ok(frame) => frame,
            Err(fault) => {
                let err = fault.into();
                ctx.record_fault(&err);
                return Err(err);
            }
        };

        if self.trace_calls {
            info!(unit = frame.unit(), depth = ctx.stack().depth(), "call");
        }

        if let Err(fault) = ctx.stack_mut().push(frame) {
            let err = fault.into();
            ctx.record_fault(&err);
            return Err(err);
        }

        match self.dispatch(ctx, unit) {
            Ok(()) => Ok(ctx.stack_mut().pop()?.into_returns()),
            Err(err) => {
                ctx.record_fault(&err);
                ctx.stack_mut().pop()?;
                Err(err)
            }
        }
    }

    fn prepare(&self, unit: &CallableUnit, args: Vec<Val>) -> Result<StackFrame, Fault> {
        let sig = unit.sig();
        if args.len() != sig.params.len() {
            return Err(Fault::ArityMismatch {
                callee: sig.qualified_name(),
                expected: sig.params.len(),
                found: args.len(),
            });
        }
        for (index, (arg, param)) in args.iter().zip(&sig.params).enumerate() {
            let found = if arg.is_null() {
                // any null may stand in for any reference type
                param.ty.is_value_type().then(|| "null".to_string())
            } else {
                let ty = arg.ty();
                (!param.ty.accepts(&ty)).then(|| ty.to_string())
            };
            if let Some(found) = found {
                return Err(Fault::ArgumentType {
                    callee: sig.qualified_name(),
                    index,
                    expected: param.ty.to_string(),
                    found,
                });
            }
        }
        let (slots, temps) = unit.frame_shape()?;
        let args = args
            .into_iter()
            .zip(slots.iter())
            .map(|(v, ty)| v.declared_as(ty))
            .collect();
        StackFrame::new(Arc::from(sig.qualified_name()), &slots, args, temps, &sig.returns)
    }

    /// Runs `unit` against the frame already on top of `ctx`'s stack,
    /// leaving its results in that frame's return slots.
    pub fn dispatch(&self, ctx: &mut Context, unit: &CallableUnit) -> Result<()> {
        match unit {
            CallableUnit::Function(f) => {
                let mut interp = Interpreter::new(*self, f);
                interp.run(ctx)
            }
            CallableUnit::Native(n) => self.dispatch_native(ctx, n),
        }
    }

    fn dispatch_native(&self, ctx: &mut Context, unit: &NativeUnit) -> Result<()> {
        debug!(unit = %unit.sig.qualified_name(), "native dispatch");
        match unit.handler {
            NativeHandler::Function(entry) => {
                let values = entry(ctx)?;
                let frame = ctx.frame_mut()?;
                if values.len() > frame.return_count() {
                    return Err(Fault::Wiring(format!(
                        "native unit '{}' returned {} value(s), declares {}",
                        unit.sig.qualified_name(),
                        values.len(),
                        frame.return_count()
                    ))
                    .into());
                }
                for (i, (v, ty)) in values.into_iter().zip(unit.sig.returns.iter()).enumerate() {
                    frame.set_return(i, native_result(unit, v, ty)?)?;
                }
            }
            NativeHandler::TypeMapper(entry) => {
                let value = entry(ctx)?;
                if let Some(ty) = unit.sig.returns.first() {
                    ctx.set_return(0, native_result(unit, value, ty)?)?;
                }
            }
        }
        Ok(())
    }
}

fn native_result(unit: &NativeUnit, value: Val, ty: &Type) -> Result<Val, Fault> {
    if ty.is_value_type() && value.is_null() {
        return Err(Fault::Wiring(format!(
            "native unit '{}' returned null for '{ty}'",
            unit.sig.qualified_name()
        )));
    }
    Ok(value.declared_as(ty))
}
