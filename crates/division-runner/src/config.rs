//! Runner configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variables (`DIVISION_*`, plus `OPENAI_API_KEY` as a key fallback)
//! 2. The TOML file passed with `--config`
//! 3. Built-in defaults (`gpt-4o` on the public OpenAI endpoint)
//!
//! ```toml
//! [endpoint]
//! base_url = "http://localhost:8080/v1"
//! model = "local-model"
//!
//! [retry]
//! max_retries = 3
//!
//! [adjudication]
//! engagement_judges = 5
//! no_verdict = { default_to = "opposition" }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use adjudication::{AdjudicationConfig, AdjudicationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_TOKENS: u32 = 4_096;

pub const ENV_BASE_URL: &str = "DIVISION_BASE_URL";
pub const ENV_API_KEY: &str = "DIVISION_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "DIVISION_MODEL";
pub const ENV_MAX_CONCURRENT: &str = "DIVISION_MAX_CONCURRENT";
pub const ENV_COOLDOWN_MS: &str = "DIVISION_COOLDOWN_MS";
pub const ENV_JUDGES: &str = "DIVISION_JUDGES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("endpoint.{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error(transparent)]
    Adjudication(#[from] AdjudicationError),
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL up to and including the version segment (e.g. `.../v1`).
    pub base_url: String,
    /// Bearer token. Local servers usually accept none.
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub endpoint: EndpointConfig,
    pub retry: RetryPolicy,
    pub adjudication: AdjudicationConfig,
}

impl RunnerConfig {
    /// Load from an optional TOML file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |var| std::env::var(var).ok())
    }

    /// Same as [`load`](Self::load) with an injectable environment lookup.
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| env(var).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.endpoint.base_url = url;
        }
        if let Some(key) = non_empty(ENV_API_KEY).or_else(|| non_empty(ENV_OPENAI_API_KEY)) {
            self.endpoint.api_key = Some(key);
        }
        if let Some(model) = non_empty(ENV_MODEL) {
            self.endpoint.model = model;
        }
        if let Some(v) = non_empty(ENV_MAX_CONCURRENT) {
            self.adjudication.max_concurrent_calls = parse_env(ENV_MAX_CONCURRENT, v)?;
        }
        if let Some(v) = non_empty(ENV_COOLDOWN_MS) {
            self.adjudication.inter_call_cooldown_ms = parse_env(ENV_COOLDOWN_MS, v)?;
        }
        if let Some(v) = non_empty(ENV_JUDGES) {
            self.adjudication.engagement_judges = parse_env(ENV_JUDGES, v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "base_url" });
        }
        if self.endpoint.model.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "model" });
        }
        self.adjudication.validate()?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    fn toml_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = RunnerConfig::load_with_env(None, env_of(&[])).unwrap();
        assert_eq!(config.endpoint.base_url, "https://api.openai.com/v1");
        assert_eq!(config.endpoint.model, "gpt-4o");
        assert_eq!(config.endpoint.api_key, None);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.adjudication, AdjudicationConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = toml_file(
            r#"
[endpoint]
base_url = "http://localhost:8080/v1"
model = "local-model"

[retry]
max_retries = 1

[adjudication]
engagement_judges = 5
no_verdict = { default_to = "opposition" }
"#,
        );
        let config = RunnerConfig::load_with_env(Some(file.path()), env_of(&[])).unwrap();
        assert_eq!(config.endpoint.base_url, "http://localhost:8080/v1");
        assert_eq!(config.endpoint.model, "local-model");
        assert_eq!(config.endpoint.timeout_secs, 120);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.adjudication.engagement_judges, 5);
        assert_eq!(
            config.adjudication.no_verdict,
            adjudication::NoVerdictPolicy::DefaultTo(adjudication::Side::Opposition)
        );
        assert_eq!(config.adjudication.max_concurrent_calls, 2);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = toml_file("[endpoint]\nmodel = \"from-file\"\n\n[adjudication]\nengagement_judges = 5\n");
        let config = RunnerConfig::load_with_env(
            Some(file.path()),
            env_of(&[
                (ENV_MODEL, "from-env"),
                (ENV_JUDGES, "7"),
                (ENV_COOLDOWN_MS, "0"),
                (ENV_MAX_CONCURRENT, "4"),
            ]),
        )
        .unwrap();
        assert_eq!(config.endpoint.model, "from-env");
        assert_eq!(config.adjudication.engagement_judges, 7);
        assert_eq!(config.adjudication.inter_call_cooldown_ms, 0);
        assert_eq!(config.adjudication.max_concurrent_calls, 4);
    }

    #[test]
    fn test_api_key_falls_back_to_openai_var() {
        let config =
            RunnerConfig::load_with_env(None, env_of(&[(ENV_OPENAI_API_KEY, "sk-openai")])).unwrap();
        assert_eq!(config.endpoint.api_key.as_deref(), Some("sk-openai"));

        let config = RunnerConfig::load_with_env(
            None,
            env_of(&[(ENV_OPENAI_API_KEY, "sk-openai"), (ENV_API_KEY, "sk-division")]),
        )
        .unwrap();
        assert_eq!(config.endpoint.api_key.as_deref(), Some("sk-division"));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let config = RunnerConfig::load_with_env(None, env_of(&[(ENV_MODEL, "  ")])).unwrap();
        assert_eq!(config.endpoint.model, "gpt-4o");
    }

    #[test]
    fn test_bad_env_number_is_rejected() {
        let err = RunnerConfig::load_with_env(None, env_of(&[(ENV_JUDGES, "three")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_JUDGES, .. }));
    }

    #[test]
    fn test_zero_concurrency_fails_validation() {
        let err =
            RunnerConfig::load_with_env(None, env_of(&[(ENV_MAX_CONCURRENT, "0")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Adjudication(AdjudicationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unreadable_and_malformed_files() {
        let missing = RunnerConfig::load_with_env(
            Some(Path::new("/nonexistent/division.toml")),
            env_of(&[]),
        );
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let file = toml_file("[endpoint\nmodel = 1");
        let malformed = RunnerConfig::load_with_env(Some(file.path()), env_of(&[]));
        assert!(matches!(malformed, Err(ConfigError::Parse { .. })));
    }
}
