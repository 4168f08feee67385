use anyhow::{Result, anyhow};
use bre_core::program::{NativeUnit, Param};
use bre_core::val::RefVal;
use bre_core::{Context, NativePackage, NativeRegistry, Type, Val};

pub const PACKAGE: &str = "ballerina.lang.array";

#[derive(Debug, Default)]
pub struct ArrayPackage;

impl ArrayPackage {
    pub fn new() -> Self {
        Self
    }

    fn length(ctx: &mut Context) -> Result<Vec<Val>> {
        match ctx.argument(0)? {
            Val::Ref(RefVal::Array(a)) => Ok(vec![Val::Int(a.read().len() as i64)]),
            other => Err(anyhow!("length() expects an array, got '{}'", other.ty())),
        }
    }
}

impl NativePackage for ArrayPackage {
    fn name(&self) -> &str {
        PACKAGE
    }

    fn register(&self, registry: &mut NativeRegistry) -> Result<()> {
        registry.register(NativeUnit::function(
            PACKAGE,
            "length",
            vec![Param::new("arr", Type::array_of(Type::Any))],
            vec![Type::Int],
            Self::length,
        ))?;
        Ok(())
    }
}
