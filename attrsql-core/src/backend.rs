use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::{groq, ollama, openai};

use crate::config::TranslatorConfig;
use crate::errors::ConfigError;
use crate::providers::LlmProvider;
use crate::translator::CompletionBackend;

enum RigClient {
    Groq(groq::Client),
    OpenAi(openai::Client),
    Ollama(ollama::Client),
}

/// Completion backend built on rig agents. The client is created once and
/// reused for every row.
pub struct RigBackend {
    client: RigClient,
    provider: LlmProvider,
    model: String,
    temperature: f64,
}

impl RigBackend {
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.unwrap_or_default().to_string();
        let base_url = config.base_url.as_deref();

        let client = match config.provider {
            LlmProvider::Groq => RigClient::Groq(groq::Client::new(&api_key)),
            LlmProvider::OpenAi => RigClient::OpenAi(match base_url {
                Some(url) => openai::Client::builder(&api_key).base_url(url).build(),
                None => openai::Client::new(&api_key),
            }),
            LlmProvider::Ollama => RigClient::Ollama(match base_url {
                Some(url) => ollama::Client::builder().base_url(url).build(),
                None => ollama::Client::new(),
            }),
        };

        Ok(Self {
            client,
            provider: config.provider,
            model: config.model().to_string(),
            temperature: config.temperature(),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for RigBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match &self.client {
            RigClient::Groq(client) => {
                let agent = client
                    .agent(&self.model)
                    .temperature(self.temperature)
                    .build();
                agent.prompt(prompt).await.map_err(|e| anyhow!("{}", e))
            }
            RigClient::OpenAi(client) => {
                let agent = client
                    .agent(&self.model)
                    .temperature(self.temperature)
                    .build();
                agent.prompt(prompt).await.map_err(|e| anyhow!("{}", e))
            }
            RigClient::Ollama(client) => {
                let agent = client
                    .agent(&self.model)
                    .temperature(self.temperature)
                    .build();
                agent.prompt(prompt).await.map_err(|e| anyhow!("{}", e))
            }
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn builds_groq_backend_without_network() {
        let mut values = HashMap::new();
        values.insert("GROQ_API_KEY".to_string(), "gsk-test-key".to_string());
        let backend = RigBackend::from_config(&TranslatorConfig::from_map(&values)).unwrap();

        assert_eq!(backend.provider(), LlmProvider::Groq);
        assert_eq!(backend.model_name(), "openai/gpt-oss-20b");
        assert_eq!(backend.describe(), "groq/openai/gpt-oss-20b");
    }

    #[test]
    fn refuses_to_build_without_key() {
        let result = RigBackend::from_config(&TranslatorConfig::from_map(&HashMap::new()));
        assert!(matches!(result, Err(ConfigError::MissingApiKey { .. })));
    }
}
