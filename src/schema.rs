use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One allowed label pair from the user's category sheet.
///
/// The full collection forms the closed label set the model must select
/// from; the prompt instructs it never to invent labels outside this set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaxonomyEntry {
    #[schemars(description = "Top-level spending category, e.g. 'Food'")]
    pub category: String,

    #[schemars(description = "Subcategory within the category, e.g. 'Groceries'")]
    pub subcategory: String,
}

impl TaxonomyEntry {
    pub fn new(category: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
        }
    }
}

/// What actually gets submitted to the model for one transaction: the
/// description (which is also the reconciliation join key) and the amount
/// when the source table carries one. Passthrough columns stay behind to
/// bound token cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TransactionDescriptor {
    #[schemars(description = "Raw transaction description as it appears on the statement")]
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Transaction amount as written in the source, if available")]
    pub amount: Option<String>,
}

impl TransactionDescriptor {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }
}

/// Categorical confidence, used when the deployment runs on the
/// High/Medium/Low scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

/// Model-reported confidence. Two scales exist across deployments; the
/// untagged representation accepts either, so parsing never special-cases
/// the provider variant. The deployment picks one scale via
/// [`ConfidenceScale`] and the prompt states it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Confidence {
    #[schemars(description = "Categorical confidence: High, Medium, or Low")]
    Level(ConfidenceLevel),

    #[schemars(description = "Numeric confidence from 1 (lowest) to 10 (highest)")]
    Score(u8),
}

impl Confidence {
    /// Whether the value sits inside its stated scale. Numeric scores must
    /// fall in 1-10; categorical levels are in scale by construction. The
    /// scale is a prompt-conveyed constraint like the label set, so an
    /// out-of-scale answer is accepted but worth flagging.
    pub fn in_scale(&self) -> bool {
        match self {
            Confidence::Score(n) => (1..=10).contains(n),
            Confidence::Level(_) => true,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Level(ConfidenceLevel::High) => write!(f, "High"),
            Confidence::Level(ConfidenceLevel::Medium) => write!(f, "Medium"),
            Confidence::Level(ConfidenceLevel::Low) => write!(f, "Low"),
            Confidence::Score(n) => write!(f, "{}", n),
        }
    }
}

/// Which confidence scale the prompt asks for. Must stay consistent with
/// downstream consumers of the `Confidence` column for the whole deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceScale {
    /// Integer 1-10, 10 highest.
    #[default]
    Numeric,
    /// High / Medium / Low.
    Categorical,
}

/// One categorized transaction as returned by the model. The generated JSON
/// schema for this type is embedded in the prompt so the model sees the
/// exact field names it must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategorizationResult {
    #[schemars(description = "The transaction description exactly as submitted, unmodified")]
    pub description: String,

    #[schemars(description = "Chosen category; must be one of the provided taxonomy categories")]
    pub category: String,

    #[schemars(
        description = "Chosen subcategory; must belong to the chosen category in the taxonomy"
    )]
    pub subcategory: String,

    #[schemars(description = "How certain the classification is, on the scale stated in the prompt")]
    pub confidence: Confidence,

    #[schemars(description = "One or two sentences explaining why this merchant fits the label")]
    pub reasoning: String,
}

impl CategorizationResult {
    /// Derived sheet label: `"{category}: {subcategory}"`, both sides trimmed.
    pub fn predicted_label(&self) -> String {
        format!("{}: {}", self.category.trim(), self.subcategory.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicted_label_trims_both_sides() {
        let result = CategorizationResult {
            description: "WALMART".to_string(),
            category: "Food".to_string(),
            subcategory: " Groceries ".to_string(),
            confidence: Confidence::Score(9),
            reasoning: "Walmart is primarily a grocery store".to_string(),
        };
        assert_eq!(result.predicted_label(), "Food: Groceries");
    }

    #[test]
    fn test_confidence_parses_both_scales() {
        let numeric: Confidence = serde_json::from_str("7").unwrap();
        assert_eq!(numeric, Confidence::Score(7));

        let categorical: Confidence = serde_json::from_str("\"High\"").unwrap();
        assert_eq!(categorical, Confidence::Level(ConfidenceLevel::High));
    }

    #[test]
    fn test_confidence_scale_bounds() {
        assert!(Confidence::Score(1).in_scale());
        assert!(Confidence::Score(10).in_scale());
        assert!(!Confidence::Score(0).in_scale());
        assert!(!Confidence::Score(11).in_scale());
        assert!(!Confidence::Score(255).in_scale());
        assert!(Confidence::Level(ConfidenceLevel::Low).in_scale());
    }

    #[test]
    fn test_confidence_display() {
        assert_eq!(Confidence::Score(3).to_string(), "3");
        assert_eq!(
            Confidence::Level(ConfidenceLevel::Medium).to_string(),
            "Medium"
        );
    }

    #[test]
    fn test_descriptor_omits_missing_amount() {
        let descriptor = TransactionDescriptor::new("SHELL GAS");
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(!json.contains("amount"));

        let with_amount = TransactionDescriptor::new("SHELL GAS").with_amount("35.00");
        let json = serde_json::to_string(&with_amount).unwrap();
        assert!(json.contains("\"amount\":\"35.00\""));
    }

    #[test]
    fn test_result_round_trips() {
        let json = r#"{
            "description": "UBER EATS",
            "category": "Food",
            "subcategory": "Restaurants",
            "confidence": "High",
            "reasoning": "Uber Eats is a food delivery service"
        }"#;
        let result: CategorizationResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.category, "Food");
        assert_eq!(result.confidence, Confidence::Level(ConfidenceLevel::High));
    }
}
