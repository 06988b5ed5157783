// src/config/mod.rs

//! Engine configuration: TOML model, loading, and tool resolution.

pub mod loader;
pub mod model;
pub mod resolve;

pub use loader::{default_config_path, load_and_resolve, load_from_path};
pub use resolve::resolve;
pub use model::{EngineSection, RawConfigFile, ResolvedConfig, ToolsSection};
