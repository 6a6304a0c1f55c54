//! Ordered label list and care table.
//!
//! Index `i` of the catalog is the label for output `i` of the model. Care
//! texts are resolved once at load time, so a lookup never needs a fallback.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LeafError, Result};
use crate::types::{CareRecommendation, ClassLabel};

/// Care text used for labels that have no entry in the table.
pub const FALLBACK_CARE: &str = "No instructions available.";

const PLANT_VILLAGE: &[(&str, &str)] = &[
    ("Apple Scab", "Remove infected leaves, prune tree for airflow, spray with fungicide."),
    ("Apple Black Rot", "Remove and destroy infected fruit and branches. Apply copper-based fungicide."),
    ("Apple Cedar Apple Rust", "Remove nearby juniper hosts. Apply preventive fungicide in spring."),
    ("Apple Healthy", "No action needed. Maintain regular watering and fertilization."),
    ("Blueberry Healthy", "No action needed. Keep soil acidic and well-drained."),
    ("Cherry Powdery Mildew", "Apply sulfur-based fungicide, prune for better airflow."),
    ("Cherry Healthy", "No action needed. Maintain regular care."),
    ("Corn Cercospora Leaf Spot", "Rotate crops, use resistant varieties, apply fungicide."),
    ("Corn Common Rust", "Plant resistant varieties, apply fungicide if severe."),
    ("Corn Northern Leaf Blight", "Use resistant seeds, rotate crops, apply fungicide."),
    ("Corn Healthy", "No action needed. Maintain regular fertilization."),
    ("Grape Black Rot", "Remove infected leaves, use fungicide during growing season."),
    ("Grape Esca (Black Measles)", "Prune infected vines, avoid wounds, apply fungicide."),
    ("Grape Leaf Blight (Isariopsis Leaf Spot)", "Remove infected leaves, use fungicide."),
    ("Grape Healthy", "No action needed."),
    ("Orange Huanglongbing (Citrus Greening)", "Remove infected trees, control psyllids with insecticide."),
    ("Peach Bacterial Spot", "Remove infected fruit, apply copper fungicide."),
    ("Peach Healthy", "No action needed."),
    ("Pepper Bell Bacterial Spot", "Remove infected plants, apply copper spray."),
    ("Pepper Bell Healthy", "No action needed."),
    ("Potato Early Blight", "Use resistant varieties, apply fungicide, rotate crops."),
    ("Potato Late Blight", "Destroy infected plants, apply copper fungicide."),
    ("Potato Healthy", "No action needed."),
    ("Raspberry Healthy", "No action needed."),
    ("Soybean Healthy", "No action needed."),
    ("Squash Powdery Mildew", "Apply sulfur fungicide, improve air circulation."),
    ("Strawberry Leaf Scorch", "Remove infected leaves, use fungicide."),
    ("Strawberry Healthy", "No action needed."),
    ("Tomato Bacterial Spot", "Remove infected plants, apply copper spray."),
    ("Tomato Early Blight", "Use resistant varieties, apply fungicide."),
    ("Tomato Late Blight", "Destroy infected plants, apply copper fungicide."),
    ("Tomato Leaf Mold", "Increase ventilation, apply fungicide."),
    ("Tomato Septoria Leaf Spot", "Remove infected leaves, apply fungicide."),
    ("Tomato Spider Mites (Two-spotted)", "Spray with miticide or insecticidal soap."),
    ("Tomato Target Spot", "Apply fungicide, avoid overhead watering."),
    ("Tomato Yellow Leaf Curl Virus", "Control whiteflies, remove infected plants."),
    ("Tomato Mosaic Virus", "Remove infected plants, disinfect tools."),
    ("Tomato Healthy", "No action needed."),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub label: ClassLabel,
    pub care: CareRecommendation,
}

/// On-disk layout of a catalog file (TOML or JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    classes: Vec<CatalogFileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFileEntry {
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    care: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelCatalog {
    entries: Vec<CatalogEntry>,
}

impl LabelCatalog {
    /// Build a catalog from an ordered label list and a label -> care table.
    ///
    /// Fails on an empty list, a blank label or a duplicated label. Labels
    /// without care text get [`FALLBACK_CARE`].
    pub fn new(labels: Vec<String>, mut care: HashMap<String, String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(LeafError::Configuration("label list is empty".to_string()));
        }

        let mut seen = HashSet::with_capacity(labels.len());
        let mut entries = Vec::with_capacity(labels.len());

        for (index, label) in labels.into_iter().enumerate() {
            let label = label.trim().to_string();
            if label.is_empty() {
                return Err(LeafError::Configuration(format!("label at index {} is empty", index)));
            }
            if !seen.insert(label.clone()) {
                return Err(LeafError::Configuration(format!("duplicate label: {}", label)));
            }

            let text = match care.remove(&label) {
                Some(text) if !text.trim().is_empty() => text,
                _ => {
                    warn!(label = %label, "No care recommendation; using fallback text");
                    FALLBACK_CARE.to_string()
                }
            };

            entries.push(CatalogEntry {
                label: ClassLabel::new(label),
                care: CareRecommendation::new(text),
            });
        }

        for orphan in care.keys() {
            warn!(label = %orphan, "Care recommendation names a label that is not in the list");
        }

        Ok(Self { entries })
    }

    /// The 38-class PlantVillage catalog the reference model was trained on.
    pub fn plant_village() -> Self {
        let entries = PLANT_VILLAGE
            .iter()
            .map(|(label, care)| CatalogEntry {
                label: ClassLabel::new(*label),
                care: CareRecommendation::new(*care),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Resolve a model output index. An index past the end means the model
    /// and the catalog disagree, which is a deployment defect.
    pub fn get(&self, index: usize) -> Result<&CatalogEntry> {
        self.entries.get(index).ok_or_else(|| {
            LeafError::Configuration(format!(
                "class index {} is out of range for a catalog of {} labels",
                index,
                self.entries.len()
            ))
        })
    }

    fn from_catalog_file(file: CatalogFile) -> Result<Self> {
        let mut labels = Vec::with_capacity(file.classes.len());
        let mut care = HashMap::new();
        for entry in file.classes {
            if let Some(text) = entry.care {
                care.insert(entry.label.trim().to_string(), text);
            }
            labels.push(entry.label);
        }
        Self::new(labels, care)
    }

    fn to_catalog_file(&self) -> CatalogFile {
        CatalogFile {
            classes: self
                .entries
                .iter()
                .map(|entry| CatalogFileEntry {
                    label: entry.label.to_string(),
                    care: Some(entry.care.to_string()),
                })
                .collect(),
        }
    }

    /// Load a catalog from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_catalog_file(file)
    }

    /// Load a catalog from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Self::from_catalog_file(file)
    }

    /// Auto-detect file format from the extension and load
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(LeafError::Configuration(format!(
                "unsupported catalog format: {}. Please use .toml or .json files",
                path.display()
            ))),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.to_catalog_file())?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_catalog_file())?)
    }
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self::plant_village()
    }
}
