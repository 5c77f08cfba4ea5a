use anyhow::{Context, Result};
use attrsql::config::DEFAULT_SECRETS_PATH;
use attrsql::{GenerationOptions, LlmProvider, Translator, TranslatorConfig};
use attrsql_server::server;
use clap::Parser;
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct ServerArgs {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(short, long, default_value = "3000")]
    port: u16,
    #[clap(long)]
    cors_origin: Option<String>,
    /// Completion provider; overrides ATTRSQL_PROVIDER
    #[clap(long, value_enum)]
    provider: Option<LlmProvider>,
    /// TOML file consulted when the API key is not in the environment
    #[clap(long, default_value = DEFAULT_SECRETS_PATH)]
    secrets: String,
    /// Rows translated at once per generation run
    #[clap(long, default_value = "1")]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    setup_logging(&args.log_level);

    let config =
        TranslatorConfig::from_env_with_provider(args.provider).with_secrets_file(&args.secrets)?;
    let translator = Translator::from_config(&config).context("Failed to configure translator")?;

    info!(
        "Starting server on port {} using {}",
        args.port,
        translator.backend_label()
    );
    server::start_server(
        args.port,
        args.cors_origin.as_deref(),
        translator,
        GenerationOptions::with_concurrency(args.concurrency),
    )
    .await?;

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("rig=warn,{}", log_level)))
        .without_time()
        .init();
}
