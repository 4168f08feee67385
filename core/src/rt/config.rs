use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

/// Knobs of a [`Runtime`](super::Runtime).
///
/// Read from the `[runtime]` table of a TOML file:
///
/// ```toml
/// [runtime]
/// max_call_depth = 128
/// check_semantics = true
/// trace_calls = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Deepest control stack one invocation may build.
    pub max_call_depth: usize,
    /// Run the null-safety checker when the runtime is created.
    pub check_semantics: bool,
    /// Log every call at info level.
    pub trace_calls: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 256,
            check_semantics: true,
            trace_calls: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    runtime: RuntimeConfig,
}

impl RuntimeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(s).context("invalid runtime config")?;
        Ok(file.runtime)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_toml_str(&text)
    }
}
