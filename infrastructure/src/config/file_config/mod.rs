//! Raw configuration data types
//!
//! These structs mirror the config file layout and are deserialized
//! directly by figment.

mod behavior;
mod providers;
mod roles;

pub use behavior::{FileBehaviorConfig, FileLoggingConfig};
pub use providers::FileProviderConfig;
pub use roles::FileRolesConfig;

use std::collections::BTreeMap;

use conductor_domain::ProviderSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mcp::placeholder_var;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Config file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("provider '{name}': {reason}")]
    InvalidProvider { name: String, reason: String },

    #[error("{field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

/// A `${VAR}` argument whose variable is not set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEnvVar {
    pub provider: String,
    pub var: String,
}

/// Complete file configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Tool providers by name. `mcpServers` is accepted as an alias.
    #[serde(alias = "mcpServers", skip_serializing_if = "BTreeMap::is_empty")]
    pub providers: BTreeMap<String, FileProviderConfig>,
    /// Completion role settings
    pub roles: FileRolesConfig,
    /// Request processing settings
    pub behavior: FileBehaviorConfig,
    /// Transcript settings
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Provider specs in name order.
    pub fn provider_specs(&self) -> Vec<ProviderSpec> {
        self.providers
            .iter()
            .map(|(name, provider)| provider.to_spec(name))
            .collect()
    }

    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, provider) in &self.providers {
            if provider.command.trim().is_empty() {
                return Err(ConfigError::InvalidProvider {
                    name: name.clone(),
                    reason: "command cannot be empty".to_string(),
                });
            }
            if provider.timeout_secs == Some(0) || provider.request_timeout_secs == Some(0) {
                return Err(ConfigError::InvalidProvider {
                    name: name.clone(),
                    reason: "timeouts cannot be 0".to_string(),
                });
            }
        }

        if self.roles.max_tool_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "roles.max_tool_rounds",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.roles.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "roles.request_timeout_secs",
                reason: "cannot be 0".to_string(),
            });
        }
        for (field, model) in [
            ("roles.advisory_model", &self.roles.advisory_model),
            ("roles.execution_model", &self.roles.execution_model),
        ] {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "model name cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// `${VAR}` placeholders whose variable is unset in the environment.
    pub fn missing_env_vars(&self) -> Vec<MissingEnvVar> {
        self.missing_env_vars_with(|var| std::env::var_os(var).is_some())
    }

    /// Same as [`missing_env_vars`](Self::missing_env_vars) with an injected lookup.
    pub fn missing_env_vars_with<F>(&self, is_set: F) -> Vec<MissingEnvVar>
    where
        F: Fn(&str) -> bool,
    {
        self.providers
            .iter()
            .flat_map(|(name, provider)| {
                provider
                    .args
                    .iter()
                    .filter_map(|arg| placeholder_var(arg))
                    .filter(|var| !is_set(var))
                    .map(|var| MissingEnvVar {
                        provider: name.clone(),
                        var: var.to_string(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[providers.filesystem]
command = "npx"
args = ["-y", "@modelcontextprotocol/server-filesystem", "${MCP_FILESYSTEM_DIR}"]
description = "list files"

[providers.git]
command = "uvx"
args = ["mcp-server-git"]

[roles]
advisory_model = "gpt-4o"
max_tool_rounds = 4

[behavior]
auto_execute = false

[logging]
conversation_log = "logs/conversation.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(
            config.providers["filesystem"].description.as_deref(),
            Some("list files")
        );
        assert_eq!(config.roles.advisory_model, "gpt-4o");
        assert_eq!(config.roles.execution_model, "gpt-4o-mini");
        assert_eq!(config.roles.max_tool_rounds, 4);
        assert!(!config.behavior.auto_execute);
        assert!(config.logging.conversation_log.is_some());
        assert!(config.validate().is_ok());

        let names: Vec<String> = config.provider_specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["filesystem", "git"]);
    }

    #[test]
    fn test_mcp_servers_alias() {
        let json = r#"{
            "mcpServers": {
                "filesystem": {"command": "npx", "args": ["-y", "server-filesystem", "/tmp"]}
            }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.providers["filesystem"].command, "npx");
        assert!(config.behavior.auto_execute);
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.providers.is_empty());
        assert!(config.behavior.auto_execute);
        assert!(!config.behavior.stream);
        assert!(config.logging.conversation_log.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let mut config = FileConfig::default();
        config
            .providers
            .insert("broken".into(), FileProviderConfig::default());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProvider { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let mut config = FileConfig::default();
        config.roles.max_tool_rounds = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "roles.max_tool_rounds",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_env_vars() {
        let mut config = FileConfig::default();
        config.providers.insert(
            "filesystem".into(),
            FileProviderConfig {
                command: "npx".into(),
                args: vec!["${SET_DIR}".into(), "${UNSET_DIR}".into(), "/plain".into()],
                ..Default::default()
            },
        );

        let missing = config.missing_env_vars_with(|var| var == "SET_DIR");
        assert_eq!(
            missing,
            vec![MissingEnvVar {
                provider: "filesystem".into(),
                var: "UNSET_DIR".into(),
            }]
        );
    }
}
