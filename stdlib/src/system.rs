use std::io::Write;

use anyhow::Result;
use bre_core::program::{NativeUnit, Param};
use bre_core::{Context, NativePackage, NativeRegistry, Type, Val};

pub const PACKAGE: &str = "ballerina.lang.system";

/// `ballerina.lang.system`: console output and request properties.
#[derive(Debug, Default)]
pub struct SystemPackage;

impl SystemPackage {
    pub fn new() -> Self {
        Self
    }

    fn println(ctx: &mut Context) -> Result<Vec<Val>> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", ctx.string_argument(0)?)?;
        Ok(vec![])
    }

    fn print(ctx: &mut Context) -> Result<Vec<Val>> {
        let mut out = std::io::stdout().lock();
        write!(out, "{}", ctx.string_argument(0)?)?;
        out.flush()?;
        Ok(vec![])
    }

    /// Unset properties read as the empty string.
    fn get_property(ctx: &mut Context) -> Result<Vec<Val>> {
        let key = ctx.string_argument(0)?;
        Ok(vec![Val::str(ctx.property(key).unwrap_or_default())])
    }
}

impl NativePackage for SystemPackage {
    fn name(&self) -> &str {
        PACKAGE
    }

    fn register(&self, registry: &mut NativeRegistry) -> Result<()> {
        let s = || Param::new("s", Type::String);
        registry.register(NativeUnit::function(PACKAGE, "println", vec![s()], vec![], Self::println))?;
        registry.register(NativeUnit::function(PACKAGE, "print", vec![s()], vec![], Self::print))?;
        registry.register(NativeUnit::function(
            PACKAGE,
            "getProperty",
            vec![Param::new("key", Type::String)],
            vec![Type::String],
            Self::get_property,
        ))?;
        Ok(())
    }
}
