//! Program representation and loading.
//!
//! A [`ProgramSource`] is what the program producer hands over (deserialized
//! from JSON or YAML, or built in code). [`Program::load`] lays out every
//! function, records frame sizes and links in the native registry, giving an
//! immutable program shared by all invocations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

mod ast;
mod callable;
mod layout;
mod registry;

pub use ast::{Call, Expr, LValue, Stmt, VarRef};
pub use callable::{
    CallableUnit, ConstDef, FrameSize, InterpretedFunction, Layout, NativeFn, NativeHandler, NativeUnit, Param,
    Signature, TypeMapperFn, Visibility,
};
pub use layout::layout_function;
pub use registry::{NativePackage, NativeRegistry};

use crate::fault::Fault;
use crate::typ::{SemanticError, SemanticErrors};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new, fast_hash_map_with_capacity};
use crate::val::{Type, Val};

/// Name of the implicit first parameter of connector actions.
pub const CONNECTOR_SELF: &str = "self";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramSource {
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub connectors: Vec<ConnectorDef>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Param>,
}

impl StructDef {
    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub actions: Vec<FunctionDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub returns: Vec<Type>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    /// Frame sizes declared by the producer; must agree with the layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_frame_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_frame_size: Option<usize>,
}

impl FunctionDef {
    pub fn new<S: Into<String>>(name: S, params: Vec<Param>, returns: Vec<Type>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            params,
            returns,
            body,
            stack_frame_size: None,
            temp_frame_size: None,
        }
    }
}

impl ProgramSource {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("invalid program JSON")
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).context("invalid program YAML")
    }

    /// Reads a program file; `.yaml`/`.yml` is parsed as YAML, anything else as JSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }
}

/// Loaded, immutable program.
#[derive(Debug)]
pub struct Program {
    package: String,
    structs: FastHashMap<String, StructDef>,
    connectors: FastHashMap<String, Vec<Param>>,
    units: FastHashMap<String, CallableUnit>,
}

impl Program {
    /// Lays out and links `source` against `natives`.
    ///
    /// Resolution errors are collected and returned together as
    /// [`SemanticErrors`]; wiring defects fail immediately.
    pub fn load(source: ProgramSource, natives: &NativeRegistry) -> Result<Program> {
        let ProgramSource {
            package,
            structs,
            connectors,
            functions,
        } = source;

        let mut program = Program {
            package,
            structs: fast_hash_map_new(),
            connectors: fast_hash_map_new(),
            units: fast_hash_map_with_capacity(natives.len()),
        };

        for native in natives.units() {
            program.insert_unit(CallableUnit::Native(Arc::clone(native)))?;
        }

        for def in structs {
            if program.structs.contains_key(&def.name) {
                return Err(Fault::Wiring(format!("struct '{}' defined twice", def.name)).into());
            }
            program.structs.insert(def.name.clone(), def);
        }

        let mut errors = Vec::new();
        for conn in connectors {
            if program.connectors.contains_key(&conn.name) {
                return Err(Fault::Wiring(format!("connector '{}' defined twice", conn.name)).into());
            }
            for mut action in conn.actions {
                action.name = format!("{}.{}", conn.name, action.name);
                action
                    .params
                    .insert(0, Param::new(CONNECTOR_SELF, Type::connector(conn.name.as_str())));
                if let Some(f) = program.build_function(action, &mut errors)? {
                    program.insert_unit(CallableUnit::Function(Arc::new(f)))?;
                }
            }
            program.connectors.insert(conn.name, conn.params);
        }

        for def in functions {
            if let Some(f) = program.build_function(def, &mut errors)? {
                program.insert_unit(CallableUnit::Function(Arc::new(f)))?;
            }
        }

        if !errors.is_empty() {
            return Err(SemanticErrors(errors).into());
        }
        debug!(package = %program.package, units = program.units.len(), "program loaded");
        Ok(program)
    }

    pub fn from_json_str(s: &str, natives: &NativeRegistry) -> Result<Program> {
        Self::load(ProgramSource::from_json_str(s)?, natives)
    }

    pub fn from_yaml_str(s: &str, natives: &NativeRegistry) -> Result<Program> {
        Self::load(ProgramSource::from_yaml_str(s)?, natives)
    }

    fn build_function(
        &self,
        mut def: FunctionDef,
        errors: &mut Vec<SemanticError>,
    ) -> Result<Option<InterpretedFunction>, Fault> {
        let sig = Signature {
            name: def.name.clone(),
            package: self.package.clone(),
            visibility: def.visibility,
            params: def.params,
            returns: def.returns,
        };
        let layout = match layout_function(&sig.params, &mut def.body) {
            Ok(layout) => layout,
            Err(msgs) => {
                errors.extend(msgs.into_iter().map(|m| SemanticError::new(sig.name.as_str(), m)));
                return Ok(None);
            }
        };

        let unit = sig.qualified_name();
        let stack_size = layout.slots.len();
        let temp_size = layout.temp_size;
        let mut f = InterpretedFunction::new(sig, def.body, layout);
        if let Some(declared) = def.stack_frame_size {
            f.stack_frame_size.set_once(&unit, declared)?;
        }
        f.stack_frame_size.set_once(&unit, stack_size)?;
        if let Some(declared) = def.temp_frame_size {
            f.temp_frame_size.set_temp(&unit, declared)?;
        }
        f.temp_frame_size.set_temp(&unit, temp_size)?;
        Ok(Some(f))
    }

    fn insert_unit(&mut self, unit: CallableUnit) -> Result<(), Fault> {
        let key = unit.sig().qualified_name();
        if self.units.contains_key(&key) {
            return Err(Fault::Wiring(format!("callable '{key}' defined twice")));
        }
        self.units.insert(key, unit);
        Ok(())
    }

    #[inline]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Finds a callable by qualified name, or by bare name inside this
    /// program's package.
    pub fn lookup(&self, name: &str) -> Option<&CallableUnit> {
        if let Some(unit) = self.units.get(name) {
            return Some(unit);
        }
        if self.package.is_empty() || name.contains(':') {
            return None;
        }
        self.units.get(&format!("{}:{}", self.package, name))
    }

    pub fn resolve(&self, name: &str) -> Result<&CallableUnit, Fault> {
        self.lookup(name)
            .ok_or_else(|| Fault::UndefinedCallable(name.to_string()))
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    /// Builds a value of type `ty` from JSON, shaping structs after their
    /// declarations in this program.
    pub fn value_from_json(&self, value: &serde_json::Value, ty: &Type) -> Result<Val> {
        Val::from_json_with(value, ty, &|name| self.struct_def(name).map(|d| d.fields.as_slice()))
    }

    pub fn connector_params(&self, name: &str) -> Option<&[Param]> {
        self.connectors.get(name).map(Vec::as_slice)
    }

    /// Every callable ordered by qualified name.
    pub fn callables(&self) -> Vec<(&str, &CallableUnit)> {
        let mut out: Vec<_> = self.units.iter().map(|(k, v)| (k.as_str(), v)).collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}
