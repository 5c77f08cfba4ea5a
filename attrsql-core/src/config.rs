use std::{collections::HashMap, path::Path, time::Duration};

use crate::errors::ConfigError;
use crate::providers::LlmProvider;

/// Sampling temperature sent with every completion request.
pub const TEMPERATURE: f64 = 0.6;

/// Location of the optional secrets file, relative to the working directory.
pub const DEFAULT_SECRETS_PATH: &str = ".attrsql/secrets.toml";

/// Translator configuration loaded from environment variables and, for the
/// credential only, an optional TOML secrets file.
///
/// Model and temperature are fixed per provider and are not read from the
/// environment.
#[derive(Clone)]
pub struct TranslatorConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self::from_map(&HashMap::new())
    }
}

impl TranslatorConfig {
    pub fn from_env() -> Self {
        Self::from_map(&Self::env_values())
    }

    /// Like [`TranslatorConfig::from_env`] with the provider chosen by the caller
    /// (e.g. a command line flag) instead of `ATTRSQL_PROVIDER`.
    pub fn from_env_with_provider(provider: Option<LlmProvider>) -> Self {
        let mut values = Self::env_values();
        if let Some(provider) = provider {
            values.insert("ATTRSQL_PROVIDER".to_string(), provider.to_string());
        }
        Self::from_map(&values)
    }

    fn env_values() -> HashMap<String, String> {
        let mut values = HashMap::new();
        for key in Self::tracked_keys() {
            if let Ok(value) = std::env::var(key) {
                values.insert(key.to_string(), value);
            }
        }
        values
    }

    pub fn from_map(values: &HashMap<String, String>) -> Self {
        fn read(values: &HashMap<String, String>, key: &str) -> Option<String> {
            values
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        }

        let provider = read(values, "ATTRSQL_PROVIDER")
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();

        let timeout_secs =
            read(values, "ATTRSQL_REQUEST_TIMEOUT_SECS").and_then(|value| value.parse().ok());

        Self::for_provider(provider, values).with_timeout_secs(timeout_secs)
    }

    /// Resolve credential and base URL for `provider` from `values`.
    pub fn for_provider(provider: LlmProvider, values: &HashMap<String, String>) -> Self {
        let lookup = |key: Option<&'static str>| {
            key.and_then(|key| values.get(key))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            provider,
            api_key: lookup(provider.api_key_env_var()),
            base_url: lookup(provider.base_url_env_var()),
            request_timeout: None,
        }
    }

    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.request_timeout = secs.filter(|secs| *secs > 0).map(Duration::from_secs);
        self
    }

    /// Fill a missing API key from a TOML secrets file (`GROQ_API_KEY = "..."`).
    /// A missing file is not an error.
    pub fn with_secrets_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if self.api_key.is_some() {
            return Ok(self);
        }
        let Some(env_var) = self.provider.api_key_env_var() else {
            return Ok(self);
        };

        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(self),
            Err(source) => {
                return Err(ConfigError::SecretsIo {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let secrets: toml::value::Table =
            toml::from_str(&content).map_err(|source| ConfigError::SecretsParse {
                path: path.display().to_string(),
                source,
            })?;

        self.api_key = secrets
            .get(env_var)
            .and_then(|value| value.as_str())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Ok(self)
    }

    pub fn model(&self) -> &'static str {
        self.provider.model()
    }

    pub fn temperature(&self) -> f64 {
        TEMPERATURE
    }

    /// API key for providers that need one.
    pub fn require_api_key(&self) -> Result<Option<&str>, ConfigError> {
        if !self.provider.requires_api_key() {
            return Ok(self.api_key.as_deref());
        }
        match (self.api_key.as_deref(), self.provider.api_key_env_var()) {
            (Some(key), _) => Ok(Some(key)),
            (None, env_var) => Err(ConfigError::MissingApiKey {
                provider: self.provider.display_name(),
                env_var: env_var.unwrap_or("an API key"),
            }),
        }
    }

    fn tracked_keys() -> Vec<&'static str> {
        vec![
            "ATTRSQL_PROVIDER",
            "ATTRSQL_REQUEST_TIMEOUT_SECS",
            "GROQ_API_KEY",
            "OPENAI_API_KEY",
            "OPENAI_BASE_URL",
            "OLLAMA_BASE_URL",
        ]
    }
}
