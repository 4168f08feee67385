use anyhow::{Context as _, Result, anyhow};
use bre_core::program::NativeUnit;
use bre_core::val::RefVal;
use bre_core::{Context, NativePackage, NativeRegistry, Type, Val};

pub const PACKAGE: &str = "ballerina.lang.convertors";

/// Type mappers between strings and the document types.
#[derive(Debug, Default)]
pub struct ConvertorsPackage;

impl ConvertorsPackage {
    pub fn new() -> Self {
        Self
    }

    fn json_to_string(ctx: &mut Context) -> Result<Val> {
        match ctx.argument(0)? {
            Val::Ref(RefVal::Json(j)) => Ok(Val::from(serde_json::to_string(&**j)?)),
            other => Err(anyhow!("jsonToString expects 'json', got '{}'", other.ty())),
        }
    }

    fn xml_to_string(ctx: &mut Context) -> Result<Val> {
        match ctx.argument(0)? {
            Val::Ref(RefVal::Xml(x)) => Ok(Val::Str(x.clone())),
            other => Err(anyhow!("xmlToString expects 'xml', got '{}'", other.ty())),
        }
    }

    fn string_to_json(ctx: &mut Context) -> Result<Val> {
        let s = ctx.string_argument(0)?;
        let value: serde_json::Value = serde_json::from_str(s).context("stringToJson: invalid JSON")?;
        Ok(Val::json(value))
    }

    // Content is not validated; xml values are opaque to the engine
    fn string_to_xml(ctx: &mut Context) -> Result<Val> {
        Ok(Val::xml(ctx.string_argument(0)?))
    }
}

impl NativePackage for ConvertorsPackage {
    fn name(&self) -> &str {
        PACKAGE
    }

    fn register(&self, registry: &mut NativeRegistry) -> Result<()> {
        let units = [
            NativeUnit::type_mapper(PACKAGE, "jsonToString", Type::json(), Type::String, Self::json_to_string),
            NativeUnit::type_mapper(PACKAGE, "xmlToString", Type::xml(), Type::String, Self::xml_to_string),
            NativeUnit::type_mapper(PACKAGE, "stringToJson", Type::String, Type::json(), Self::string_to_json),
            NativeUnit::type_mapper(PACKAGE, "stringToXml", Type::String, Type::xml(), Self::string_to_xml),
        ];
        for unit in units {
            registry.register(unit)?;
        }
        Ok(())
    }
}
