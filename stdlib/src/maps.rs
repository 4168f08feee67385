use anyhow::{Result, anyhow};
use bre_core::program::{NativeUnit, Param};
use bre_core::val::{MapValue, RefVal, Shared};
use bre_core::{Context, NativePackage, NativeRegistry, Type, Val};

pub const PACKAGE: &str = "ballerina.lang.maps";

#[derive(Debug, Default)]
pub struct MapsPackage;

fn map_argument(ctx: &Context, index: usize) -> Result<Shared<MapValue>> {
    match ctx.argument(index)? {
        Val::Ref(RefVal::Map(m)) => Ok(m.clone()),
        other => Err(anyhow!("argument {index} is '{}', expected 'map'", other.ty())),
    }
}

impl MapsPackage {
    pub fn new() -> Self {
        Self
    }

    /// Keys in ascending order, so output does not depend on hashing.
    fn keys(ctx: &mut Context) -> Result<Vec<Val>> {
        let map = map_argument(ctx, 0)?;
        let keys = map.read().keys().into_iter().map(Val::Str).collect();
        Ok(vec![Val::array(Type::String, keys)])
    }

    fn has_key(ctx: &mut Context) -> Result<Vec<Val>> {
        let map = map_argument(ctx, 0)?;
        let key = ctx.string_argument(1)?;
        let found = map.read().contains_key(key);
        Ok(vec![Val::Bool(found)])
    }

    fn remove(ctx: &mut Context) -> Result<Vec<Val>> {
        let map = map_argument(ctx, 0)?;
        let key = ctx.string_argument(1)?;
        map.write().remove(key);
        Ok(vec![])
    }
}

impl NativePackage for MapsPackage {
    fn name(&self) -> &str {
        PACKAGE
    }

    fn register(&self, registry: &mut NativeRegistry) -> Result<()> {
        let m = || Param::new("m", Type::map());
        let key = || Param::new("key", Type::String);
        registry.register(NativeUnit::function(
            PACKAGE,
            "keys",
            vec![m()],
            vec![Type::array_of(Type::String)],
            Self::keys,
        ))?;
        registry.register(NativeUnit::function(PACKAGE, "hasKey", vec![m(), key()], vec![Type::Bool], Self::has_key))?;
        registry.register(NativeUnit::function(PACKAGE, "remove", vec![m(), key()], vec![], Self::remove))?;
        Ok(())
    }
}
