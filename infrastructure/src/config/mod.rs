//! Configuration file loading for mcp-conductor
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CONDUCTOR_*` environment variables
//! 2. `--config <path>` specified file (TOML or JSON)
//! 3. Project root: `./conductor.toml`
//! 4. Global: `~/.config/mcp-conductor/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigError, FileBehaviorConfig, FileConfig, FileLoggingConfig, FileProviderConfig,
    FileRolesConfig, MissingEnvVar,
};
pub use loader::{ConfigLoader, ConfigSource, ENV_PREFIX, PROJECT_CONFIG_FILE};
