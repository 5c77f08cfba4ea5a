//! Core of the attribute-level requirement to SQL translator: the requirement
//! table, the LLM-backed expression translator and the generation loop tying
//! them together.

pub mod backend;
pub mod config;
pub mod errors;
pub mod export;
pub mod generation;
pub mod providers;
pub mod table;
pub mod translator;

pub use backend::RigBackend;
pub use config::TranslatorConfig;
pub use errors::{ConfigError, GenerationError, TableError, TranslationError};
pub use export::{export_table, export_template, CsvExport};
pub use generation::{generate_sql, GenerationOptions, GenerationReport, RowOutcome};
pub use providers::LlmProvider;
pub use table::{RequirementRow, RequirementTable};
pub use translator::{
    render_outcome, CompletionBackend, TranslationOutcome, TranslationRequest, Translator,
    ERROR_PREFIX,
};
