mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use attrsql::config::DEFAULT_SECRETS_PATH;
use attrsql::export::{EXPORT_FILENAME, TEMPLATE_FILENAME};
use attrsql::{GenerationOptions, LlmProvider, Translator, TranslatorConfig};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// Completion provider; overrides ATTRSQL_PROVIDER
    #[clap(long, global = true, value_enum)]
    provider: Option<LlmProvider>,
    /// TOML file consulted when the API key is not in the environment
    #[clap(long, global = true, default_value = DEFAULT_SECRETS_PATH)]
    secrets: PathBuf,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive page
    Serve {
        #[clap(short, long, default_value = "3000")]
        port: u16,
        #[clap(long)]
        cors_origin: Option<String>,
        #[clap(long, default_value = "1")]
        concurrency: usize,
    },
    /// Translate a requirements CSV without the page
    Generate {
        #[clap(short, long)]
        input: PathBuf,
        #[clap(short, long, default_value = EXPORT_FILENAME)]
        output: PathBuf,
        #[clap(long, default_value = "1")]
        concurrency: usize,
    },
    /// Write an empty requirements CSV
    Template {
        #[clap(short, long, default_value = TEMPLATE_FILENAME)]
        output: PathBuf,
    },
}

fn build_translator(cli: &Cli) -> Result<Translator> {
    let config =
        TranslatorConfig::from_env_with_provider(cli.provider).with_secrets_file(&cli.secrets)?;
    Translator::from_config(&config).context("Failed to configure translator")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match &args.command {
        Commands::Serve {
            port,
            cors_origin,
            concurrency,
        } => {
            let translator = build_translator(&args)?;
            info!(
                "Starting server on port {} using {}",
                port,
                translator.backend_label()
            );
            attrsql_server::server::start_server(
                *port,
                cors_origin.as_deref(),
                translator,
                GenerationOptions::with_concurrency(*concurrency),
            )
            .await?;
        }
        Commands::Generate {
            input,
            output,
            concurrency,
        } => {
            let translator = build_translator(&args)?;
            info!("Generating SQL for {}", input.display());
            commands::generate_file(
                input,
                output,
                &translator,
                GenerationOptions::with_concurrency(*concurrency),
            )
            .await?;
        }
        Commands::Template { output } => {
            commands::write_template(output)?;
        }
    }

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
