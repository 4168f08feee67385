use anyhow::Result;
use bre_core::{Program, Runtime, RuntimeConfig, Val};

/// Loads a JSON program against the default registry, runs the checker and
/// invokes `name`.
pub(crate) fn run(program: serde_json::Value, name: &str, args: Vec<Val>) -> Result<Vec<Val>> {
    let program = Program::from_json_str(&program.to_string(), crate::default_registry()?)?;
    Runtime::new(program, RuntimeConfig::default())?.invoke(name, args)
}

/// Invokes a native unit directly, without any interpreted caller.
pub(crate) fn call(name: &str, args: Vec<Val>) -> Result<Vec<Val>> {
    let program = Program::load(Default::default(), crate::default_registry()?)?;
    bre_core::invoke(&program, name, args)
}
