//! Invocation driver
//!
//! Owns a loaded program and its configuration, and runs callables on
//! behalf of an external caller, one fresh [`Context`] per invocation.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use super::RuntimeConfig;
use crate::program::Program;
use crate::typ::check_program;
use crate::val::Val;
use crate::vm::{Context, Dispatcher};

#[derive(Debug, Clone)]
pub struct Runtime {
    program: Arc<Program>,
    config: RuntimeConfig,
}

impl Runtime {
    /// Wraps `program`, running the null-safety checker first when the
    /// configuration asks for it.
    pub fn new(program: Program, config: RuntimeConfig) -> Result<Self> {
        if config.check_semantics {
            check_program(&program)?;
        }
        Ok(Self {
            program: Arc::new(program),
            config,
        })
    }

    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Calls `name` with `args` and returns its results, which may contain
    /// nulls. A fault comes back with its message unchanged.
    pub fn invoke(&self, name: &str, args: Vec<Val>) -> Result<Vec<Val>> {
        self.invoke_with(name, args, |_| {})
    }

    /// Like [`invoke`](Self::invoke), letting `setup` fill in ambient
    /// properties of the context first.
    pub fn invoke_with<F>(&self, name: &str, args: Vec<Val>, setup: F) -> Result<Vec<Val>>
    where
        F: FnOnce(&mut Context),
    {
        info!(function = name, args = args.len(), "invoke");
        let mut ctx = Context::new(self.config.max_call_depth);
        setup(&mut ctx);

        let dispatcher = Dispatcher::new(&self.program).with_trace_calls(self.config.trace_calls);
        let result = dispatcher.call_named(&mut ctx, name, args);
        debug_assert_eq!(ctx.stack().depth(), 0, "control stack not unwound");

        if let Some(record) = ctx.fault() {
            warn!(function = name, error = %record.message, "invocation failed");
        }
        result
    }
}

/// Runs `name` in `program` once with the default configuration, without
/// the checker.
pub fn invoke(program: &Program, name: &str, args: Vec<Val>) -> Result<Vec<Val>> {
    let config = RuntimeConfig::default();
    let mut ctx = Context::new(config.max_call_depth);
    Dispatcher::new(program).call_named(&mut ctx, name, args)
}
