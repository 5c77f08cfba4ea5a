use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use attrsql::{
    export_table, generate_sql, GenerationError, GenerationOptions, GenerationReport,
    RequirementTable, Translator,
};
use tracing::{info, warn};

/// Read requirements from `input`, translate every row and write the CSV with
/// `SQLOutput` to `output`.
///
/// Returns `None` when the input has no rows; nothing is written then.
pub async fn generate_file(
    input: &Path,
    output: &Path,
    translator: &Translator,
    options: GenerationOptions,
) -> Result<Option<GenerationReport>> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let mut table = RequirementTable::from_csv_bytes(&bytes)
        .with_context(|| format!("Failed to load requirements from {}", input.display()))?;
    info!("Loaded {} requirement rows from {}", table.len(), input.display());

    let report = match generate_sql(&mut table, translator, options).await {
        Ok(report) => report,
        Err(GenerationError::EmptyTable) => {
            warn!("{}", GenerationError::EmptyTable);
            return Ok(None);
        }
    };

    for failure in report.failures() {
        warn!(
            "Row {} ({}): {}",
            failure.index + 1,
            failure.attribute,
            failure.rendered()
        );
    }

    let export = export_table(&table)?;
    fs::write(output, export.content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(
        "Wrote {} ({} succeeded, {} failed)",
        output.display(),
        report.succeeded(),
        report.failed()
    );

    Ok(Some(report))
}

pub fn write_template(output: &Path) -> Result<()> {
    fs::write(output, RequirementTable::template_csv())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote requirements template to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use attrsql::CompletionBackend;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl CompletionBackend for Echo {
        async fn complete(&self, prompt: &str) -> Result<String> {
            if prompt.contains("Attribute: broken") {
                anyhow::bail!("invalid api key");
            }
            Ok("COUNT(*) AS n".to_string())
        }
    }

    fn translator() -> Translator {
        Translator::new(Arc::new(Echo))
    }

    #[tokio::test]
    async fn writes_output_csv() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("requirements.csv");
        let output = dir.path().join("sql_output.csv");
        fs::write(
            &input,
            "TargetObjectAttribute,CalculationLogic\nn,count rows\nbroken,whatever\n",
        )?;

        let report = generate_file(&input, &output, &translator(), GenerationOptions::default())
            .await?
            .expect("rows were present");

        assert_eq!(report.succeeded(), 1);
        assert_eq!(
            fs::read_to_string(&output)?,
            "TargetObjectAttribute,CalculationLogic,SQLOutput\n\
n,count rows,COUNT(*) AS n\n\
broken,whatever,-- ERROR generating SQL: invalid api key\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn empty_input_writes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("requirements.csv");
        let output = dir.path().join("sql_output.csv");
        write_template(&input)?;

        let report =
            generate_file(&input, &output, &translator(), GenerationOptions::default()).await?;

        assert!(report.is_none());
        assert!(!output.exists());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_input_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("requirements.csv");
        fs::write(&input, "a,b\n1,2,3\n")?;

        let result = generate_file(
            &input,
            &dir.path().join("out.csv"),
            &translator(),
            GenerationOptions::default(),
        )
        .await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Invalid CSV"), "{message}");
        Ok(())
    }
}
