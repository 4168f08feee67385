//! Host-implemented native units for BRE, grouped by package path.
//!
//! Each package is a [`NativePackage`]; [`register_stdlib`] adds all of them to
//! a registry, and [`default_registry`] keeps one fully populated registry for
//! hosts that do not need their own.

pub mod array;
pub mod convertors;
pub mod maps;
pub mod string;
pub mod system;

#[cfg(test)]
mod testing;

use anyhow::Result;
use bre_core::{NativePackage, NativeRegistry};
use once_cell::sync::OnceCell;
use tracing::debug;

/// Every stdlib package, in registration order.
pub fn packages() -> Vec<Box<dyn NativePackage>> {
    vec![
        Box::new(string::StringPackage::new()),
        Box::new(array::ArrayPackage::new()),
        Box::new(maps::MapsPackage::new()),
        Box::new(system::SystemPackage::new()),
        Box::new(convertors::ConvertorsPackage::new()),
    ]
}

/// Register all stdlib packages with the given registry
pub fn register_stdlib(registry: &mut NativeRegistry) -> Result<()> {
    for package in packages() {
        registry.register_package(package.as_ref())?;
        debug!(package = package.name(), "registered native package");
    }
    Ok(())
}

static DEFAULT_REGISTRY: OnceCell<NativeRegistry> = OnceCell::new();

/// Shared registry holding the whole stdlib, built on first use.
pub fn default_registry() -> Result<&'static NativeRegistry> {
    DEFAULT_REGISTRY.get_or_try_init(|| {
        let mut registry = NativeRegistry::new();
        register_stdlib(&mut registry)?;
        Ok(registry)
    })
}
