use std::fs;
use std::path::Path;

use burn::prelude::*;
use burn::record::{DefaultFileRecorder, FullPrecisionSettings};
use tracing::info;

use crate::error::{LeafError, Result};
use crate::model::{LeafCnn, LeafCnnConfig};
use crate::preprocessing::ImageTensor;
use crate::traits::ClassificationModel;
use crate::types::InputSize;

/// Backend used for inference unless the caller picks another one
pub type DefaultBackend = burn::backend::NdArray;

/// Architecture file inside a model directory
pub const MODEL_CONFIG_FILE: &str = "model.json";

/// Weight record stem inside a model directory; the recorder adds `.mpk`
pub const MODEL_WEIGHTS_STEM: &str = "model";

fn recorder() -> DefaultFileRecorder<FullPrecisionSettings> {
    DefaultFileRecorder::<FullPrecisionSettings>::new()
}

/// Load a [`LeafCnn`] and its configuration from a model directory
pub fn load_leaf_cnn<B: Backend>(dir: &Path, device: &B::Device) -> Result<(LeafCnn<B>, LeafCnnConfig)> {
    let config_path = dir.join(MODEL_CONFIG_FILE);
    if !config_path.exists() {
        return Err(LeafError::Configuration(format!(
            "model config not found: {}",
            config_path.display()
        )));
    }

    let config = LeafCnnConfig::load(&config_path)
        .map_err(|e| LeafError::Configuration(format!("invalid model config {}: {}", config_path.display(), e)))?;
    config.validate()?;

    let weights_path = dir.join(MODEL_WEIGHTS_STEM);
    let model = LeafCnn::new(&config, device)
        .load_file(weights_path, &recorder(), device)
        .map_err(|e| LeafError::Configuration(format!("failed to load weights from {}: {:?}", dir.display(), e)))?;

    info!(
        path = %dir.display(),
        classes = config.num_classes,
        input = %config.input_size(),
        "Loaded leaf classifier"
    );
    Ok((model, config))
}

/// Write a model directory that [`load_leaf_cnn`] can read back
pub fn save_leaf_cnn<B: Backend>(model: LeafCnn<B>, config: &LeafCnnConfig, dir: &Path) -> Result<()> {
    config.validate()?;
    fs::create_dir_all(dir)?;

    config.save(dir.join(MODEL_CONFIG_FILE))?;
    model
        .save_file(dir.join(MODEL_WEIGHTS_STEM), &recorder())
        .map_err(|e| LeafError::Configuration(format!("failed to save weights to {}: {:?}", dir.display(), e)))?;

    info!(path = %dir.display(), classes = config.num_classes, "Saved leaf classifier");
    Ok(())
}

/// [`ClassificationModel`] backed by a burn [`LeafCnn`]
#[derive(Debug)]
pub struct BurnClassifier<B: Backend> {
    model: LeafCnn<B>,
    config: LeafCnnConfig,
    device: B::Device,
}

impl<B: Backend> BurnClassifier<B> {
    pub fn new(model: LeafCnn<B>, config: LeafCnnConfig, device: B::Device) -> Self {
        Self { model, config, device }
    }

    /// Load from a model directory
    pub fn from_dir(dir: &Path, device: B::Device) -> Result<Self> {
        let (model, config) = load_leaf_cnn::<B>(dir, &device)?;
        Ok(Self::new(model, config, device))
    }

    /// Freshly initialized weights, for smoke tests and `init-model`
    pub fn random(config: LeafCnnConfig, device: B::Device) -> Result<Self> {
        config.validate()?;
        let model = config.init::<B>(&device);
        Ok(Self::new(model, config, device))
    }

    pub fn config(&self) -> &LeafCnnConfig {
        &self.config
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        save_leaf_cnn(self.model.clone(), &self.config, dir)
    }
}

impl<B: Backend> ClassificationModel for BurnClassifier<B> {
    fn input_size(&self) -> InputSize {
        self.config.input_size()
    }

    fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        let output = self.model.forward(input.to_burn::<B>(&self.device));
        output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| LeafError::Inference(format!("could not read model output: {:?}", e)))
    }
}
