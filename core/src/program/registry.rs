use std::sync::Arc;

use anyhow::Result;

use super::callable::NativeUnit;
use crate::fault::Fault;
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

/// Table of host-implemented callables, keyed by qualified name
/// (`package:name`).
///
/// Built once by the host, then handed to program loading. Nothing in the
/// engine reaches for a global registry.
#[derive(Debug, Default, Clone)]
pub struct NativeRegistry {
    units: FastHashMap<String, Arc<NativeUnit>>,
    packages: Vec<String>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self {
            units: fast_hash_map_new(),
            packages: Vec::new(),
        }
    }

    /// Registers one unit. A second unit under the same qualified name is a
    /// wiring defect.
    pub fn register(&mut self, unit: NativeUnit) -> Result<(), Fault> {
        let key = unit.sig.qualified_name();
        if self.units.contains_key(&key) {
            return Err(Fault::Wiring(format!("native unit '{key}' registered twice")));
        }
        self.units.insert(key, Arc::new(unit));
        Ok(())
    }

    /// Registers every unit of `package`.
    pub fn register_package(&mut self, package: &dyn NativePackage) -> Result<()> {
        if self.packages.iter().any(|p| p == package.name()) {
            return Err(Fault::Wiring(format!("native package '{}' registered twice", package.name())).into());
        }
        package.register(self)?;
        self.packages.push(package.name().to_string());
        Ok(())
    }

    pub fn get(&self, qualified_name: &str) -> Option<&Arc<NativeUnit>> {
        self.units.get(qualified_name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All units ordered by qualified name.
    pub fn units(&self) -> Vec<&Arc<NativeUnit>> {
        let mut units: Vec<_> = self.units.values().collect();
        units.sort_by_key(|u| u.sig.qualified_name());
        units
    }
}

/// A group of native units sharing one package path.
pub trait NativePackage: Send + Sync {
    /// Package path, e.g. `ballerina.lang.string`
    fn name(&self) -> &str;

    fn register(&self, registry: &mut NativeRegistry) -> Result<()>;
}
