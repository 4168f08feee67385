use anyhow::Result;
use bre_core::program::{NativeUnit, Param};
use bre_core::{Context, NativePackage, NativeRegistry, Type, Val};

pub const PACKAGE: &str = "ballerina.lang.string";

/// `ballerina.lang.string`: conversions to string and basic inspection.
#[derive(Debug, Default)]
pub struct StringPackage;

impl StringPackage {
    pub fn new() -> Self {
        Self
    }

    fn value_of(ctx: &mut Context) -> Result<Vec<Val>> {
        let i = ctx.int_argument(0)?;
        Ok(vec![Val::str(itoa::Buffer::new().format(i))])
    }

    fn float_value_of(ctx: &mut Context) -> Result<Vec<Val>> {
        let x = ctx.float_argument(0)?;
        // non-finite values go through Display, which spells them out
        let s = if x.is_finite() {
            ryu::Buffer::new().format_finite(x).to_string()
        } else {
            Val::Float(x).to_string()
        };
        Ok(vec![Val::from(s)])
    }

    fn boolean_value_of(ctx: &mut Context) -> Result<Vec<Val>> {
        let b = ctx.bool_argument(0)?;
        Ok(vec![Val::str(if b { "true" } else { "false" })])
    }

    /// Length in characters, not bytes.
    fn length(ctx: &mut Context) -> Result<Vec<Val>> {
        let s = ctx.string_argument(0)?;
        Ok(vec![Val::Int(s.chars().count() as i64)])
    }

    fn to_upper_case(ctx: &mut Context) -> Result<Vec<Val>> {
        let s = ctx.string_argument(0)?.to_uppercase();
        Ok(vec![Val::from(s)])
    }

    fn to_lower_case(ctx: &mut Context) -> Result<Vec<Val>> {
        let s = ctx.string_argument(0)?.to_lowercase();
        Ok(vec![Val::from(s)])
    }

    fn contains(ctx: &mut Context) -> Result<Vec<Val>> {
        let found = ctx.string_argument(0)?.contains(ctx.string_argument(1)?);
        Ok(vec![Val::Bool(found)])
    }
}

impl NativePackage for StringPackage {
    fn name(&self) -> &str {
        PACKAGE
    }

    fn register(&self, registry: &mut NativeRegistry) -> Result<()> {
        let s = || Param::new("s", Type::String);
        let units = [
            NativeUnit::function(PACKAGE, "valueOf", vec![Param::new("i", Type::Int)], vec![Type::String], Self::value_of),
            NativeUnit::function(
                PACKAGE,
                "floatValueOf",
                vec![Param::new("f", Type::Float)],
                vec![Type::String],
                Self::float_value_of,
            ),
            NativeUnit::function(
                PACKAGE,
                "booleanValueOf",
                vec![Param::new("b", Type::Bool)],
                vec![Type::String],
                Self::boolean_value_of,
            ),
            NativeUnit::function(PACKAGE, "length", vec![s()], vec![Type::Int], Self::length),
            NativeUnit::function(PACKAGE, "toUpperCase", vec![s()], vec![Type::String], Self::to_upper_case),
            NativeUnit::function(PACKAGE, "toLowerCase", vec![s()], vec![Type::String], Self::to_lower_case),
            NativeUnit::function(
                PACKAGE,
                "contains",
                vec![s(), Param::new("sub", Type::String)],
                vec![Type::Bool],
                Self::contains,
            ),
        ];
        for unit in units {
            registry.register(unit)?;
        }
        Ok(())
    }
}
