use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::RigBackend;
use crate::config::TranslatorConfig;
use crate::errors::{ConfigError, TranslationError};
use crate::table::RequirementRow;

/// Prefix of the value written in place of SQL when a request fails.
pub const ERROR_PREFIX: &str = "-- ERROR generating SQL: ";

pub type TranslationOutcome = Result<String, TranslationError>;

/// A hosted completion endpoint: one prompt in, one text completion out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;

    /// Short label for logs, e.g. `groq/openai/gpt-oss-20b`.
    fn describe(&self) -> String {
        "custom".to_string()
    }
}

/// Inputs for one translation, taken from a single requirement row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub attribute: String,
    pub logic: String,
    pub target_object: String,
    pub context: String,
}

impl TranslationRequest {
    pub fn new(
        attribute: impl Into<String>,
        logic: impl Into<String>,
        target_object: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            logic: logic.into(),
            target_object: target_object.into(),
            context: context.into(),
        }
    }

    /// Fixed Databricks SQL prompt. Inputs are embedded verbatim.
    pub fn to_prompt(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str("You are an expert SQL generator for Databricks.\n");
        prompt.push_str(
            "Convert the following requirement into a valid SQL expression (not a full query).\n\n",
        );

        prompt.push_str(&format!("Target Object: {}\n", self.target_object));
        prompt.push_str(&format!("Attribute: {}\n", self.attribute));
        prompt.push_str(&format!("Requirement (English): {}\n", self.logic));
        prompt.push_str(&format!("Context (if any): {}\n\n", self.context));

        prompt.push_str("Rules:\n");
        prompt.push_str(
            "- Return ONLY the SQL expression for the attribute, not a full SELECT query.\n",
        );
        prompt.push_str(&format!(
            "- Alias the expression as the attribute name: AS {}.\n",
            self.attribute
        ));
        prompt.push_str("- If CASE WHEN or joins are required, write them inline in the expression.\n");
        prompt.push_str("- Keep SQL syntax strictly compatible with Databricks SQL.\n");

        prompt
    }
}

impl From<&RequirementRow> for TranslationRequest {
    fn from(row: &RequirementRow) -> Self {
        Self {
            attribute: row.target_object_attribute.clone(),
            logic: row.calculation_logic.clone(),
            target_object: row.target_object.clone(),
            context: row.sql_context.clone(),
        }
    }
}

/// Value shown in the `SQLOutput` column for an outcome.
pub fn render_outcome(outcome: &TranslationOutcome) -> String {
    match outcome {
        Ok(sql) => sql.clone(),
        Err(err) => format!("{ERROR_PREFIX}{err}"),
    }
}

/// True when a rendered `SQLOutput` value records a failure.
pub fn is_error_output(value: &str) -> bool {
    value.starts_with(ERROR_PREFIX)
}

/// Stateless adapter turning one requirement into one completion request.
#[derive(Clone)]
pub struct Translator {
    backend: Arc<dyn CompletionBackend>,
    request_timeout: Option<Duration>,
}

impl Translator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            request_timeout: None,
        }
    }

    /// Build a rig-backed translator for the configured provider.
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, ConfigError> {
        let backend = RigBackend::from_config(config)?;
        Ok(Self::new(Arc::new(backend)).with_timeout(config.request_timeout))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn backend_label(&self) -> String {
        self.backend.describe()
    }

    /// Issue one request. Never retried; identical inputs may give different
    /// answers.
    pub async fn translate(&self, request: &TranslationRequest) -> TranslationOutcome {
        let prompt = request.to_prompt();
        debug!(attribute = %request.attribute, "Requesting SQL expression");

        let response = match self.request_timeout {
            Some(timeout) => {
                let call = self.backend.complete(&prompt);
                match tokio::time::timeout(timeout, call).await {
                    Ok(response) => response,
                    Err(_) => {
                        warn!(attribute = %request.attribute, "SQL generation timed out");
                        return Err(TranslationError::Timeout(timeout));
                    }
                }
            }
            None => self.backend.complete(&prompt).await,
        };

        match response {
            Ok(text) => {
                let sql = text.trim();
                if sql.is_empty() {
                    warn!(attribute = %request.attribute, "Model returned an empty response");
                    Err(TranslationError::EmptyResponse)
                } else {
                    Ok(sql.to_string())
                }
            }
            Err(err) => {
                warn!(attribute = %request.attribute, "SQL generation failed: {}", err);
                Err(TranslationError::service(err))
            }
        }
    }
}
