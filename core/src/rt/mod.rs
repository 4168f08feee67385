mod config;
mod runtime;

pub use config::RuntimeConfig;
pub use runtime::{Runtime, invoke};
