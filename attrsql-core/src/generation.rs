use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::errors::GenerationError;
use crate::table::RequirementTable;
use crate::translator::{render_outcome, TranslationOutcome, TranslationRequest, Translator};

/// Knobs for a generation run.
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    /// Requests in flight at once. `1` translates rows strictly one after the
    /// other; larger values still write results back in table order.
    pub concurrency: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

impl GenerationOptions {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }
}

/// Result of translating one row.
#[derive(Debug, Clone)]
pub struct RowOutcome {
    pub index: usize,
    pub attribute: String,
    pub outcome: TranslationOutcome,
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The value written to the row's `SQLOutput` cell.
    pub fn rendered(&self) -> String {
        render_outcome(&self.outcome)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub outcomes: Vec<RowOutcome>,
}

impl GenerationReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Translate every row of `table` and write each result into its `SQLOutput`.
///
/// Inputs are captured before the first request. A failed row never stops the
/// run; its cell receives the sentinel error string. An empty table is
/// rejected without touching it.
pub async fn generate_sql(
    table: &mut RequirementTable,
    translator: &Translator,
    options: GenerationOptions,
) -> Result<GenerationReport, GenerationError> {
    if table.is_empty() {
        warn!("Generation requested for an empty table");
        return Err(GenerationError::EmptyTable);
    }

    let requests: Vec<TranslationRequest> =
        table.rows().iter().map(TranslationRequest::from).collect();
    let concurrency = options.concurrency.max(1);

    info!(
        rows = requests.len(),
        concurrency,
        backend = %translator.backend_label(),
        "Generating SQL expressions"
    );

    // Futures must own their inputs for the run to stay `Send`.
    let outcomes: Vec<TranslationOutcome> = stream::iter(requests.clone().into_iter().map(
        |request| {
            let translator = translator.clone();
            async move { translator.translate(&request).await }
        },
    ))
    .buffered(concurrency)
    .collect()
    .await;

    let mut report = GenerationReport::default();
    for (index, (request, outcome)) in requests.into_iter().zip(outcomes).enumerate() {
        let row = RowOutcome {
            index,
            attribute: request.attribute,
            outcome,
        };
        table.write_sql_output(index, row.rendered());
        report.outcomes.push(row);
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "SQL generation finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RequirementRow;
    use crate::translator::CompletionBackend;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for Counting {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt.contains("Attribute: broken") {
                Err(anyhow!("rate limit exceeded"))
            } else {
                Ok(format!("expr_{call}"))
            }
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn empty_table_is_left_alone() {
        let backend = counting();
        let translator = Translator::new(backend.clone());
        let mut table = RequirementTable::empty();
        let before = table.clone();

        let result = generate_sql(&mut table, &translator, GenerationOptions::default()).await;

        assert_eq!(result.unwrap_err(), GenerationError::EmptyTable);
        assert_eq!(table, before);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sequential_run_visits_rows_in_order() {
        let backend = counting();
        let translator = Translator::new(backend.clone());
        let mut table = RequirementTable::from_rows([
            RequirementRow::new("t", "a", "first", ""),
            RequirementRow::new("t", "broken", "second", ""),
            RequirementRow::new("t", "c", "third", ""),
        ]);

        let report = generate_sql(&mut table, &translator, GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures().next().unwrap().index, 1);

        let outputs: Vec<_> = table
            .rows()
            .iter()
            .map(|r| r.sql_output.clone().unwrap())
            .collect();
        assert_eq!(
            outputs,
            [
                "expr_0",
                "-- ERROR generating SQL: rate limit exceeded",
                "expr_2"
            ]
        );
        assert!(table.has_output_column());
    }

    #[tokio::test]
    async fn concurrent_run_keeps_table_order() {
        let translator = Translator::new(counting());
        let rows = (0..8).map(|i| RequirementRow::new("t", format!("attr_{i}"), "logic", ""));
        let mut table = RequirementTable::from_rows(rows);

        let report = generate_sql(&mut table, &translator, GenerationOptions::with_concurrency(4))
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 8);
        for (i, outcome) in report.outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert_eq!(outcome.attribute, format!("attr_{i}"));
            assert_eq!(
                table.row(i).unwrap().sql_output.as_deref(),
                Some(outcome.rendered().as_str())
            );
        }
    }

    #[tokio::test]
    async fn runs_on_a_spawned_task() {
        let translator = Translator::new(counting());
        let mut table = RequirementTable::from_rows([RequirementRow::new("t", "a", "x", "")]);

        let handle = tokio::spawn(async move {
            let report = generate_sql(&mut table, &translator, GenerationOptions::with_concurrency(2))
                .await
                .unwrap();
            (report, table)
        });
        let (report, table) = handle.await.unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(table.row(0).unwrap().sql_output.as_deref(), Some("expr_0"));
    }

    #[tokio::test]
    async fn rerun_overwrites_stale_output() {
        let translator = Translator::new(counting());
        let mut table = RequirementTable::from_rows([RequirementRow::new("t", "a", "x", "")]);

        generate_sql(&mut table, &translator, GenerationOptions::default())
            .await
            .unwrap();
        table.edit(0, "CalculationLogic", "changed").unwrap();
        generate_sql(&mut table, &translator, GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(table.row(0).unwrap().sql_output.as_deref(), Some("expr_1"));
        assert_eq!(
            table.columns().iter().filter(|c| *c == "SQLOutput").count(),
            1
        );
    }
}
