use crate::config::{BatchSource, CategorizerConfig};
use crate::error::{CategorizerError, Result};
use crate::llm::{build_categorization_prompt, CategorizationProvider, CategorizeOutcome};
use crate::reconcile::{reconcile, ReconciledTable};
use crate::schema::{ConfidenceScale, TaxonomyEntry, TransactionDescriptor};
use crate::sheets::SheetStore;
use crate::table::Table;
use log::{debug, error, info, warn};
use std::collections::HashSet;

const AMOUNT_COLUMN: &str = "Amount";

/// Orchestrates one batch: deduplicate, build the prompt, invoke the
/// backend, reconcile. Constructed once per run; holds no cross-call state
/// beyond the provider's network client handle.
pub struct CategorizationEngine<P> {
    provider: P,
    scale: ConfidenceScale,
}

impl<P: CategorizationProvider> CategorizationEngine<P> {
    pub fn new(provider: P, scale: ConfidenceScale) -> Self {
        Self { provider, scale }
    }

    /// Categorizes one transaction table and merges the results back onto
    /// every original row. A provider failure yields a dataset with zero
    /// predicted labels, never an error; reconciliation violations and a
    /// missing description column do fail the batch.
    pub async fn run_batch(
        &self,
        taxonomy: &[TaxonomyEntry],
        transactions: &Table,
        description_column: &str,
        source: &str,
    ) -> Result<ReconciledTable> {
        let descriptors = build_descriptors(transactions, description_column, source)?;
        info!(
            "Categorizing {} rows from {} ({} distinct descriptions) via {}",
            transactions.row_count(),
            source,
            descriptors.len(),
            self.provider.name()
        );

        let prompt = build_categorization_prompt(taxonomy, self.scale)?;
        debug!("Categorization prompt for {}: {}", source, prompt);

        let outcome = self.provider.categorize(&prompt, &descriptors).await;
        let results = match outcome {
            CategorizeOutcome::NoWork => {
                debug!("No transactions to categorize in {}", source);
                Vec::new()
            }
            CategorizeOutcome::Failed { reason } => {
                warn!(
                    "{} returned no results for {}: {}",
                    self.provider.name(),
                    source,
                    reason
                );
                Vec::new()
            }
            CategorizeOutcome::Success(results) => results,
        };
        debug!("Raw result count for {}: {}", source, results.len());

        reconcile(transactions, &results, description_column, source)
    }
}

/// Collapses the transaction rows into distinct descriptors, so the model
/// labels each description once rather than once per occurrence. Order of
/// first occurrence is preserved; the amount rides along when the table has
/// an `Amount`-named column. Rows with a blank description are skipped.
fn build_descriptors(
    table: &Table,
    description_column: &str,
    source: &str,
) -> Result<Vec<TransactionDescriptor>> {
    let key_col = table.require_column(description_column, source)?;
    let amount_col = table.column_index_ignore_case(AMOUNT_COLUMN);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut descriptors = Vec::new();
    for row in &table.rows {
        let description = row[key_col].as_str();
        if description.is_empty() || !seen.insert(description) {
            continue;
        }
        let mut descriptor = TransactionDescriptor::new(description);
        if let Some(col) = amount_col {
            if !row[col].is_empty() {
                descriptor = descriptor.with_amount(row[col].clone());
            }
        }
        descriptors.push(descriptor);
    }

    debug!(
        "Deduplicated {} rows from {} into {} descriptors",
        table.row_count(),
        source,
        descriptors.len()
    );
    Ok(descriptors)
}

/// Parses the taxonomy range into the allowed label set. Column headers are
/// matched case-insensitively; rows with a blank category are skipped.
pub fn parse_taxonomy(table: &Table, range: &str) -> Result<Vec<TaxonomyEntry>> {
    let category_col = table
        .column_index_ignore_case("category")
        .ok_or_else(|| CategorizerError::MissingColumn {
            column: "category".to_string(),
            range: range.to_string(),
        })?;
    let subcategory_col = table
        .column_index_ignore_case("subcategory")
        .ok_or_else(|| CategorizerError::MissingColumn {
            column: "subcategory".to_string(),
            range: range.to_string(),
        })?;

    let taxonomy: Vec<TaxonomyEntry> = table
        .rows
        .iter()
        .filter(|row| !row[category_col].is_empty())
        .map(|row| TaxonomyEntry::new(row[category_col].clone(), row[subcategory_col].clone()))
        .collect();

    debug!("Loaded {} taxonomy entries from {}", taxonomy.len(), range);
    Ok(taxonomy)
}

/// How one configured source fared within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    /// Categorized, reconciled, and written back.
    Completed,
    /// The range had no header row to work with; nothing was submitted.
    Skipped,
    /// The batch failed (e.g. duplicate result keys); later batches still ran.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub range: String,
    pub rows: usize,
    pub uncategorized: usize,
    pub status: BatchStatus,
}

/// Per-run roll-up, one report per configured source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: Vec<BatchReport>,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.status == BatchStatus::Completed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| matches!(b.status, BatchStatus::Failed(_)))
            .count()
    }
}

/// Runs every configured source sequentially against one provider and one
/// store. Batches are isolated: a categorization or reconciliation failure
/// is reported and the loop moves on, while store read/write faults abort
/// the whole run.
pub async fn run_pipeline<P, S>(
    config: &CategorizerConfig,
    provider: P,
    store: &S,
) -> Result<RunSummary>
where
    P: CategorizationProvider,
    S: SheetStore,
{
    info!(
        "Starting categorization run over {} sources",
        config.sources.len()
    );

    let taxonomy_table = store.read_table(&config.taxonomy_range).await?;
    let taxonomy = parse_taxonomy(&taxonomy_table, &config.taxonomy_range)?;

    let engine = CategorizationEngine::new(provider, config.confidence_scale);
    let mut summary = RunSummary::default();

    for source in &config.sources {
        let report = run_source(&engine, &taxonomy, source, store).await?;
        summary.batches.push(report);
    }

    info!(
        "Categorization run finished: {} completed, {} failed of {} batches",
        summary.completed(),
        summary.failed(),
        summary.batches.len()
    );
    Ok(summary)
}

async fn run_source<P, S>(
    engine: &CategorizationEngine<P>,
    taxonomy: &[TaxonomyEntry],
    source: &BatchSource,
    store: &S,
) -> Result<BatchReport>
where
    P: CategorizationProvider,
    S: SheetStore,
{
    let table = store.read_table(&source.range).await?;
    if table.headers.is_empty() {
        warn!("Range {} has no header row; skipping", source.range);
        return Ok(BatchReport {
            range: source.range.clone(),
            rows: 0,
            uncategorized: 0,
            status: BatchStatus::Skipped,
        });
    }

    match engine
        .run_batch(taxonomy, &table, &source.description_column, &source.range)
        .await
    {
        Ok(reconciled) => {
            store
                .write_table(source.write_range(), &reconciled.table)
                .await?;
            Ok(BatchReport {
                range: source.range.clone(),
                rows: reconciled.row_count(),
                uncategorized: reconciled.uncategorized,
                status: BatchStatus::Completed,
            })
        }
        Err(e @ (CategorizerError::SheetApi { .. } | CategorizerError::Http(_))) => Err(e),
        Err(e) => {
            error!("Batch {} failed: {}", source.range, e);
            Ok(BatchReport {
                range: source.range.clone(),
                rows: table.row_count(),
                uncategorized: table.row_count(),
                status: BatchStatus::Failed(e.to_string()),
            })
        }
    }
}
