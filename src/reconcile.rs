use crate::error::{CategorizerError, Result};
use crate::schema::CategorizationResult;
use crate::table::Table;
use log::{debug, info, warn};
use std::collections::HashMap;

pub const PREDICTED_CATEGORY_COLUMN: &str = "Predicted Category";
pub const CONFIDENCE_COLUMN: &str = "Confidence";
pub const REASONING_COLUMN: &str = "Reasoning";

/// The annotated dataset ready for write-back: every original row, in order,
/// with the three derived columns appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledTable {
    pub table: Table,
    /// Rows that received no predicted label. A warning signal for
    /// operators, never an error.
    pub uncategorized: usize,
}

impl ReconciledTable {
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }
}

/// Merges categorization results back onto the original rows with a strict
/// 1:1 left join on the description column. Every original row appears
/// exactly once in the output; unmatched rows get blank derived cells.
///
/// Duplicate descriptions on the results side would multiply rows in a real
/// join, so they are rejected up front with the offending descriptions
/// named. `source` labels the batch in errors and logs.
pub fn reconcile(
    original: &Table,
    results: &[CategorizationResult],
    join_key_column: &str,
    source: &str,
) -> Result<ReconciledTable> {
    debug!(
        "Reconciling {} results onto {} rows from {}",
        results.len(),
        original.row_count(),
        source
    );

    let key_col = original.require_column(join_key_column, source)?;

    let mut by_description: HashMap<&str, &CategorizationResult> = HashMap::new();
    let mut duplicates: Vec<String> = Vec::new();
    for result in results {
        if by_description
            .insert(result.description.as_str(), result)
            .is_some()
            && !duplicates.contains(&result.description)
        {
            duplicates.push(result.description.clone());
        }
    }
    if !duplicates.is_empty() {
        return Err(CategorizerError::DuplicateResultKeys {
            descriptions: duplicates,
        });
    }

    let expected = original.row_count();
    let mut labels = Vec::with_capacity(expected);
    let mut confidences = Vec::with_capacity(expected);
    let mut reasonings = Vec::with_capacity(expected);
    let mut uncategorized = 0usize;

    for row in &original.rows {
        match by_description.get(row[key_col].as_str()) {
            Some(result) => {
                labels.push(result.predicted_label());
                confidences.push(result.confidence.to_string());
                reasonings.push(result.reasoning.clone());
            }
            None => {
                uncategorized += 1;
                labels.push(String::new());
                confidences.push(String::new());
                reasonings.push(String::new());
            }
        }
    }

    let mut table = original.clone();
    table.push_column(PREDICTED_CATEGORY_COLUMN, labels);
    table.push_column(CONFIDENCE_COLUMN, confidences);
    table.push_column(REASONING_COLUMN, reasonings);

    if table.row_count() != expected {
        return Err(CategorizerError::RowCountMismatch {
            expected,
            actual: table.row_count(),
        });
    }

    if uncategorized > 0 {
        warn!(
            "{} of {} rows from {} could not be categorized",
            uncategorized, expected, source
        );
    }
    info!(
        "Reconciled {} rows from {} ({} uncategorized)",
        expected, source, uncategorized
    );

    Ok(ReconciledTable {
        table,
        uncategorized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Confidence, ConfidenceLevel};

    fn transactions() -> Table {
        Table::from_values(vec![
            vec!["Description".to_string(), "Amount".to_string()],
            vec!["WALMART".to_string(), "45.67".to_string()],
            vec!["SHELL GAS".to_string(), "35.00".to_string()],
            vec!["WALMART".to_string(), "12.30".to_string()],
        ])
    }

    fn result(
        description: &str,
        category: &str,
        subcategory: &str,
        confidence: Confidence,
    ) -> CategorizationResult {
        CategorizationResult {
            description: description.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            confidence,
            reasoning: format!("{description} matches {category}"),
        }
    }

    #[test]
    fn test_left_join_preserves_row_count_and_order() {
        let results = vec![result(
            "WALMART",
            "Food",
            "Groceries",
            Confidence::Score(9),
        )];
        let reconciled = reconcile(&transactions(), &results, "Description", "test").unwrap();

        assert_eq!(reconciled.row_count(), 3);
        assert_eq!(reconciled.table.rows[0][0], "WALMART");
        assert_eq!(reconciled.table.rows[1][0], "SHELL GAS");
        // Both occurrences of the duplicate description get the same label.
        assert_eq!(reconciled.table.rows[0][2], "Food: Groceries");
        assert_eq!(reconciled.table.rows[2][2], "Food: Groceries");
    }

    #[test]
    fn test_unmatched_rows_get_blank_cells_and_warning_count() {
        let results = vec![result(
            "WALMART",
            "Food",
            "Groceries",
            Confidence::Level(ConfidenceLevel::High),
        )];
        let reconciled = reconcile(&transactions(), &results, "Description", "test").unwrap();

        assert_eq!(reconciled.uncategorized, 1);
        assert_eq!(reconciled.table.rows[1][2], "");
        assert_eq!(reconciled.table.rows[1][3], "");
        assert_eq!(reconciled.table.rows[1][4], "");
    }

    #[test]
    fn test_duplicate_result_keys_are_fatal_and_named() {
        let results = vec![
            result("WALMART", "Food", "Groceries", Confidence::Score(9)),
            result("WALMART", "Shopping", "General", Confidence::Score(4)),
        ];
        let err = reconcile(&transactions(), &results, "Description", "test").unwrap_err();
        match err {
            CategorizerError::DuplicateResultKeys { descriptions } => {
                assert_eq!(descriptions, vec!["WALMART".to_string()]);
            }
            other => panic!("expected DuplicateResultKeys, got {other:?}"),
        }
    }

    #[test]
    fn test_label_derivation_trims_whitespace() {
        let results = vec![result(
            "SHELL GAS",
            " Transportation",
            " Gas ",
            Confidence::Score(10),
        )];
        let reconciled = reconcile(&transactions(), &results, "Description", "test").unwrap();
        assert_eq!(reconciled.table.rows[1][2], "Transportation: Gas");
    }

    #[test]
    fn test_join_is_case_sensitive() {
        let results = vec![result("walmart", "Food", "Groceries", Confidence::Score(9))];
        let reconciled = reconcile(&transactions(), &results, "Description", "test").unwrap();
        assert_eq!(reconciled.uncategorized, 3);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let results = vec![
            result("WALMART", "Food", "Groceries", Confidence::Score(9)),
            result("SHELL GAS", "Transportation", "Gas", Confidence::Score(10)),
        ];
        let a = reconcile(&transactions(), &results, "Description", "test").unwrap();
        let b = reconcile(&transactions(), &results, "Description", "test").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_join_column_is_an_error() {
        let results = Vec::new();
        let err = reconcile(&transactions(), &results, "Memo", "Tx!A:B").unwrap_err();
        assert!(matches!(err, CategorizerError::MissingColumn { .. }));
    }

    #[test]
    fn test_empty_results_reconcile_cleanly() {
        let reconciled = reconcile(&transactions(), &[], "Description", "test").unwrap();
        assert_eq!(reconciled.row_count(), 3);
        assert_eq!(reconciled.uncategorized, 3);
        assert_eq!(
            reconciled.table.headers,
            vec![
                "Description",
                "Amount",
                PREDICTED_CATEGORY_COLUMN,
                CONFIDENCE_COLUMN,
                REASONING_COLUMN
            ]
        );
    }
}
