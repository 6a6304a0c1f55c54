pub mod builder;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::{
    catalog::LabelCatalog,
    decode::{decode_data_uri, decode_image},
    error::{LeafError, Result},
    handle::{Deadline, ModelHandle},
    lookup::resolve,
    preprocessing::{PreprocessConfig, preprocess_image},
    preview::{PreviewConfig, encode_preview},
    types::{InferenceResult, InputSize},
};

/// Default bound on one pipeline run when called through the async entry point
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Decode, preprocess, classify, look up and re-encode one image.
///
/// Cheap to clone: the model and catalog are shared behind `Arc`s, so a clone
/// per request handler is the intended use.
#[derive(Clone, Debug)]
pub struct Pipeline {
    model: ModelHandle,
    catalog: Arc<LabelCatalog>,
    preprocess: PreprocessConfig,
    preview: PreviewConfig,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a pipeline from loaded parts.
    ///
    /// The catalog must have exactly one label per model output.
    pub fn new(
        model: ModelHandle,
        catalog: LabelCatalog,
        preprocess: PreprocessConfig,
        preview: PreviewConfig,
    ) -> Result<Self> {
        if model.num_classes() != catalog.len() {
            return Err(LeafError::Configuration(format!(
                "model has {} outputs but the label catalog has {} entries",
                model.num_classes(),
                catalog.len()
            )));
        }
        preview.validate()?;

        info!(
            classes = catalog.len(),
            input = %model.input_size(),
            channel_order = %preprocess.channel_order,
            "Pipeline ready"
        );

        Ok(Self {
            model,
            catalog: Arc::new(catalog),
            preprocess,
            preview,
        })
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn input_size(&self) -> InputSize {
        self.model.input_size()
    }

    /// Run encoded image bytes through the entire pipeline
    pub fn process(&self, bytes: &[u8]) -> Result<InferenceResult> {
        self.run(bytes, None)
    }

    fn run(&self, bytes: &[u8], deadline: Option<Deadline>) -> Result<InferenceResult> {
        let started = Instant::now();
        if let Some(deadline) = deadline {
            deadline.check()?;
        }

        // Step 1: Decode
        let image = decode_image(bytes)?;

        // Step 2: Resize and scale to the model's input
        let tensor = preprocess_image(&image, self.model.input_size(), &self.preprocess);

        // Step 3: Classify
        let probabilities = self.model.predict_within(&tensor, deadline)?;

        // Step 4: Resolve label and care text
        let prediction = resolve(&probabilities, &self.catalog)?;

        // Step 5: Re-encode the original image for display
        let preview = encode_preview(&image, &self.preview)?;

        debug!(
            label = %prediction.entry.label,
            confidence = prediction.confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Classified image"
        );

        Ok(InferenceResult {
            label: prediction.entry.label.clone(),
            care: prediction.entry.care.clone(),
            class_index: prediction.class_index,
            confidence: prediction.confidence,
            preview,
        })
    }

    /// Same as [`Self::process`] for a camera capture sent as a data URI
    pub fn process_data_uri(&self, uri: &str) -> Result<InferenceResult> {
        let bytes = decode_data_uri(uri)?;
        self.process(&bytes)
    }

    /// Run [`Self::process`] on the blocking pool, giving up after `limit`.
    ///
    /// A forward pass already running when the limit hits finishes in the
    /// background and its result is dropped. Runs still waiting for the model
    /// at that point skip it.
    pub async fn process_with_timeout(&self, bytes: Vec<u8>, limit: Duration) -> Result<InferenceResult> {
        let pipeline = self.clone();
        let deadline = Deadline::after(limit);
        let task = tokio::task::spawn_blocking(move || pipeline.run(&bytes, Some(deadline)));

        match tokio::time::timeout(limit, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(LeafError::Inference(format!("inference task failed: {}", join_error))),
            Err(_) => {
                warn!(limit_ms = limit.as_millis() as u64, "Inference timed out");
                Err(LeafError::Timeout(limit))
            }
        }
    }
}
