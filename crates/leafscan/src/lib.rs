//! # Leaf Disease Classification
//!
//! Turns a photo of a plant leaf into a disease label and a care
//! recommendation, plus a JPEG preview of the photo for display.
//!
//! ## Stages
//!
//! - **Decode**: JPEG/PNG bytes or a base64 data URI to an RGB pixel grid
//! - **Preprocess**: bilinear resize to the model input, scale to `[0, 1]`
//! - **Classify**: one forward pass through a loaded model, serialized behind a mutex
//! - **Look up**: argmax to label, label to care text
//! - **Preview**: re-encode the original image as JPEG
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leafscan::{BurnClassifier, DefaultBackend, LabelCatalog, Pipeline};
//! use std::path::Path;
//!
//! let model = BurnClassifier::<DefaultBackend>::from_dir(Path::new("models/plant_village"), Default::default())?;
//! let pipeline = Pipeline::builder()
//!     .model(model)
//!     .catalog(LabelCatalog::plant_village())
//!     .build()?;
//!
//! let bytes = std::fs::read("leaf.jpg")?;
//! let result = pipeline.process(&bytes)?;
//! println!("{}: {}", result.label, result.care);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod decode;
pub mod error;
pub mod handle;
pub mod lookup;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod preview;
pub mod traits;
pub mod types;
pub mod weights;

pub use catalog::{CatalogEntry, FALLBACK_CARE, LabelCatalog};
pub use decode::{decode_data_uri, decode_image};
pub use error::{LeafError, Result};
pub use handle::{Deadline, ModelHandle};
pub use lookup::{Prediction, argmax, resolve};
pub use model::{LeafCnn, LeafCnnConfig};
pub use pipeline::{DEFAULT_INFERENCE_TIMEOUT, Pipeline, builder::PipelineBuilder};
pub use preprocessing::{ChannelOrder, ImageTensor, PreprocessConfig, preprocess_image};
pub use preview::{PreviewConfig, PreviewImage, encode_preview};
pub use traits::ClassificationModel;
pub use types::{CareRecommendation, ClassLabel, InferenceResult, InputSize};
pub use weights::{BurnClassifier, DefaultBackend, load_leaf_cnn, save_leaf_cnn};
