//! JSON response bodies

use leafscan::{InferenceResult, LabelCatalog};
use serde::{Deserialize, Serialize};
use shops::Shop;

/// Result of one classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub label: String,
    pub care: String,
    pub confidence: f32,
    pub class_index: usize,
    /// JPEG preview of the submitted photo, base64 without a data URI header
    pub preview_image_base64: String,
}

impl From<InferenceResult> for AnalyzeResponse {
    fn from(result: InferenceResult) -> Self {
        Self {
            success: true,
            preview_image_base64: result.preview.to_base64(),
            label: result.label.as_str().to_string(),
            care: result.care.as_str().to_string(),
            confidence: result.confidence,
            class_index: result.class_index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub classes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEntry {
    pub index: usize,
    pub label: String,
    pub care: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsResponse {
    pub labels: Vec<LabelEntry>,
}

impl From<&LabelCatalog> for LabelsResponse {
    fn from(catalog: &LabelCatalog) -> Self {
        let labels = catalog
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| LabelEntry {
                index,
                label: entry.label.as_str().to_string(),
                care: entry.care.as_str().to_string(),
            })
            .collect();
        Self { labels }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopsResponse {
    pub shops: Vec<Shop>,
}
