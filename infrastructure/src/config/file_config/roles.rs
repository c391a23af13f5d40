//! Completion role configuration (`[roles]` section)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::OpenAiRoleConfig;

/// Settings shared by the advisory and execution roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRolesConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// Environment variable holding the API key (default: "OPENAI_API_KEY")
    pub api_key_env: String,
    /// Direct API key (not recommended; use the env var instead)
    pub api_key: Option<String>,
    pub advisory_model: String,
    pub execution_model: String,
    pub advisory_temperature: f32,
    pub execution_temperature: f32,
    /// Model ↔ tool exchanges allowed per execution message
    pub max_tool_rounds: usize,
    /// HTTP timeout per completion request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for FileRolesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            advisory_model: "gpt-4o-mini".to_string(),
            execution_model: "gpt-4o-mini".to_string(),
            advisory_temperature: 0.1,
            execution_temperature: 0.0,
            max_tool_rounds: 8,
            request_timeout_secs: 120,
        }
    }
}

impl FileRolesConfig {
    /// The configured key, else the value of `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.is_empty())
    }

    fn role_config(&self, model: &str, temperature: f32) -> OpenAiRoleConfig {
        OpenAiRoleConfig {
            base_url: self.base_url.clone(),
            api_key: self.resolve_api_key(),
            model: model.to_string(),
            temperature,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_tool_rounds: self.max_tool_rounds,
        }
    }

    pub fn advisory(&self) -> OpenAiRoleConfig {
        self.role_config(&self.advisory_model, self.advisory_temperature)
    }

    pub fn execution(&self) -> OpenAiRoleConfig {
        self.role_config(&self.execution_model, self.execution_temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_configs() {
        let roles = FileRolesConfig {
            api_key: Some("sk-test".into()),
            advisory_model: "adv".into(),
            execution_model: "exec".into(),
            ..Default::default()
        };

        let advisory = roles.advisory();
        assert_eq!(advisory.model, "adv");
        assert_eq!(advisory.temperature, 0.1);
        assert_eq!(advisory.api_key.as_deref(), Some("sk-test"));

        let execution = roles.execution();
        assert_eq!(execution.model, "exec");
        assert_eq!(execution.temperature, 0.0);
        assert_eq!(execution.max_tool_rounds, 8);
        assert_eq!(execution.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_api_key_from_unset_env_is_none() {
        let roles = FileRolesConfig {
            api_key_env: "CONDUCTOR_TEST_SURELY_UNSET_KEY".into(),
            ..Default::default()
        };
        assert!(roles.resolve_api_key().is_none());
    }
}
