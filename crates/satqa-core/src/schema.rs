//! Response schema handed to the model as `generationConfig.responseSchema`.
//!
//! Vertex accepts an OpenAPI 3.0 subset without `$ref`, so the assessment
//! object is inlined once per category.

use serde_json::{json, Map, Value};

use crate::analysis::IssueCategory;

fn assessment_schema(category: IssueCategory) -> Value {
    json!({
        "type": "OBJECT",
        "description": format!("Assessment for {}.", category.label()),
        "properties": {
            "detected": {
                "type": "BOOLEAN",
                "description": "Whether this specific issue is present."
            },
            "confidence": {
                "type": "NUMBER",
                "description": "Confidence score between 0.0 and 1.0.",
                "minimum": 0.0,
                "maximum": 1.0
            },
            "reason": {
                "type": "STRING",
                "description": "A concise explanation of the visual evidence found."
            }
        },
        "required": ["detected", "confidence", "reason"],
        "propertyOrdering": ["detected", "confidence", "reason"]
    })
}

/// Schema of [`crate::AnalysisResult`] in the model's structured-output dialect.
#[must_use]
pub fn analysis_response_schema() -> Value {
    let mut properties = Map::new();
    for category in IssueCategory::ALL {
        properties.insert(category.key().to_owned(), assessment_schema(category));
    }
    let keys: Vec<&str> = IssueCategory::ALL.iter().map(|c| c.key()).collect();

    json!({
        "type": "OBJECT",
        "description": "The master JSON structure for the satellite image analysis.",
        "properties": properties,
        "required": keys,
        "propertyOrdering": keys
    })
}
