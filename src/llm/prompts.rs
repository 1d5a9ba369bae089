use crate::error::{CategorizerError, Result};
use crate::schema::{CategorizationResult, Confidence, ConfidenceLevel, ConfidenceScale, TaxonomyEntry};
use log::debug;

/// Builds the system prompt for a categorization run. Pure given its input:
/// the taxonomy is serialized losslessly into the prompt, the output schema
/// and one example record are embedded, and the policy rules are stated.
/// Fails only if taxonomy serialization fails.
pub fn build_categorization_prompt(
    taxonomy: &[TaxonomyEntry],
    scale: ConfidenceScale,
) -> Result<String> {
    debug!(
        "Building categorization prompt with {} taxonomy entries ({:?} scale)",
        taxonomy.len(),
        scale
    );

    let taxonomy_json = serde_json::to_string_pretty(taxonomy)
        .map_err(|e| CategorizerError::PromptBuild(format!("taxonomy serialization failed: {e}")))?;

    let schema_json = serde_json::to_string_pretty(&schemars::schema_for!(CategorizationResult))
        .map_err(|e| CategorizerError::PromptBuild(format!("schema serialization failed: {e}")))?;

    let example = CategorizationResult {
        description: "PAYBYPHONE".to_string(),
        category: "Transportation".to_string(),
        subcategory: "Parking".to_string(),
        confidence: match scale {
            ConfidenceScale::Numeric => Confidence::Score(7),
            ConfidenceScale::Categorical => Confidence::Level(ConfidenceLevel::Medium),
        },
        reasoning: "PayByPhone is a parking payment app".to_string(),
    };
    let example_json = serde_json::to_string(&example)
        .map_err(|e| CategorizerError::PromptBuild(format!("example serialization failed: {e}")))?;

    let scale_rule = match scale {
        ConfidenceScale::Numeric => {
            "Report confidence as an integer from 1 to 10, with 10 being highest. \
             Only use 9-10 for obvious matches (e.g. \"TRADER JOE'S\" is clearly \"Food: Groceries\"). \
             If you are truly uncertain, use 3 or lower."
        }
        ConfidenceScale::Categorical => {
            "Report confidence as exactly one of \"High\", \"Medium\", or \"Low\". \
             Only use \"High\" for obvious matches (e.g. \"TRADER JOE'S\" is clearly \"Food: Groceries\"). \
             If you are truly uncertain, use \"Low\"."
        }
    };

    let prompt = format!(
        r#"You are an expert transaction categorizer for a person who logs their personal expenses.
These are the available categories and subcategories:

{taxonomy_json}

You will receive a JSON array of transaction descriptions. For each transaction, analyze the merchant name and amount (if provided) to determine the most likely category and subcategory, and produce one object with fields for description, category, subcategory, confidence, and reasoning.

Each output object must conform to this JSON schema:

{schema_json}

Example of one item in the output array:

{example_json}

Important guidelines:
1. Always match to the closest existing category and subcategory from the list above - never create new ones.
2. Be specific in your reasoning, explaining why this merchant belongs to the chosen category.
3. {scale_rule}
4. Use context clues from the merchant name to make educated guesses when necessary.
5. Pay attention to transaction codes in the description: [CK] marks a cheque and most likely represents a rent-like payment, [DN] marks a direct deposit.
6. Echo each description back exactly as submitted, unmodified.

Return the result as a raw JSON array. Do not include any extra text, comments, or explanations. Do not wrap the output in a code block like ```json. Output ONLY valid JSON."#
    );

    debug!("Categorization prompt built ({} chars)", prompt.len());
    Ok(prompt)
}
