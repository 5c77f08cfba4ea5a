use std::{fmt, str::FromStr};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Supported completion providers.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Groq,
    #[value(name = "openai")]
    OpenAi,
    Ollama,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LlmProvider::Groq => "groq",
                LlmProvider::OpenAi => "openai",
                LlmProvider::Ollama => "ollama",
            }
        )
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(LlmProvider::Groq),
            "openai" | "open_ai" | "open-ai" => Ok(LlmProvider::OpenAi),
            "ollama" => Ok(LlmProvider::Ollama),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

impl LlmProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "Groq",
            LlmProvider::OpenAi => "OpenAI",
            LlmProvider::Ollama => "Ollama",
        }
    }

    /// Model identifier used for every request. Not user configurable.
    pub fn model(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "openai/gpt-oss-20b",
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Ollama => "llama3.2",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmProvider::Ollama)
    }

    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Groq => Some("GROQ_API_KEY"),
            LlmProvider::OpenAi => Some("OPENAI_API_KEY"),
            LlmProvider::Ollama => None,
        }
    }

    pub fn base_url_env_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Groq => None,
            LlmProvider::OpenAi => Some("OPENAI_BASE_URL"),
            LlmProvider::Ollama => Some("OLLAMA_BASE_URL"),
        }
    }
}
