//! Small two-stage CNN for leaf disease classification.
//!
//! Layer layout matches the Keras network the PlantVillage weights were
//! trained with, so exported weights map one to one:
//!
//! ```text
//! [1, H, W, 3] -> Conv 3x3 (32) -> ReLU -> MaxPool 2x2
//!              -> Conv 3x3 (64) -> ReLU -> MaxPool 2x2
//!              -> Flatten (HWC) -> Dense 128 -> ReLU -> Dropout -> Dense N -> Softmax
//! ```

use burn::prelude::*;
use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{MaxPool2d, MaxPool2dConfig},
    Dropout, DropoutConfig,
    Linear, LinearConfig,
    Relu,
};
use burn::tensor::{activation, backend::Backend};

use crate::error::LeafError;
use crate::types::InputSize;

const CONV1_FILTERS: usize = 32;
const CONV2_FILTERS: usize = 64;
const HIDDEN_UNITS: usize = 128;

/// Smallest side that survives two valid 3x3 convolutions and two 2x2 pools
pub const MIN_INPUT_SIDE: usize = 10;

#[derive(Config, Debug)]
pub struct LeafCnnConfig {
    /// Number of output classes (38 for PlantVillage)
    #[config(default = 38)]
    pub num_classes: usize,
    /// Input image height
    #[config(default = 64)]
    pub input_height: usize,
    /// Input image width
    #[config(default = 64)]
    pub input_width: usize,
    /// Dropout before the classifier head (inactive at inference)
    #[config(default = 0.3)]
    pub dropout: f64,
}

impl LeafCnnConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.num_classes == 0 {
            return Err(LeafError::Configuration("model must have at least one class".to_string()));
        }
        if self.input_height < MIN_INPUT_SIDE || self.input_width < MIN_INPUT_SIDE {
            return Err(LeafError::Configuration(format!(
                "model input {}x{} is too small, each side must be at least {}",
                self.input_height, self.input_width, MIN_INPUT_SIDE
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(LeafError::Configuration(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    pub fn input_size(&self) -> InputSize {
        InputSize::new(self.input_height as u32, self.input_width as u32)
    }

    /// Spatial size after both conv/pool stages
    fn feature_map(&self) -> (usize, usize) {
        let stage = |side: usize| (side - 2) / 2;
        (stage(stage(self.input_height)), stage(stage(self.input_width)))
    }

    /// Length of the flattened feature vector fed to the dense head
    pub fn flattened_features(&self) -> usize {
        let (h, w) = self.feature_map();
        h * w * CONV2_FILTERS
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> LeafCnn<B> {
        LeafCnn::new(self, device)
    }
}

#[derive(Module, Debug)]
pub struct LeafCnn<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    pool: MaxPool2d,
    activation: Relu,
    fc1: Linear<B>,
    dropout: Dropout,
    fc2: Linear<B>,
}

impl<B: Backend> LeafCnn<B> {
    pub fn new(config: &LeafCnnConfig, device: &B::Device) -> Self {
        // Valid padding is the Conv2dConfig default
        let conv1 = Conv2dConfig::new([3, CONV1_FILTERS], [3, 3]).init(device);
        let conv2 = Conv2dConfig::new([CONV1_FILTERS, CONV2_FILTERS], [3, 3]).init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        let fc1 = LinearConfig::new(config.flattened_features(), HIDDEN_UNITS).init(device);
        let dropout = DropoutConfig::new(config.dropout).init();
        let fc2 = LinearConfig::new(HIDDEN_UNITS, config.num_classes).init(device);

        Self {
            conv1,
            conv2,
            pool,
            activation: Relu::new(),
            fc1,
            dropout,
            fc2,
        }
    }

    /// Forward pass.
    ///
    /// Takes `[batch, H, W, 3]` in `[0, 1]` and returns class probabilities
    /// of shape `[batch, num_classes]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        // NHWC -> NCWH -> NCHW
        let x = x.swap_dims(1, 3).swap_dims(2, 3);

        let x = self.pool.forward(self.activation.forward(self.conv1.forward(x)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));

        // Back to NHWC before flattening so dense weights line up with Keras
        let x = x.swap_dims(1, 2).swap_dims(2, 3);
        let [batch, h, w, c] = x.dims();
        let x = x.reshape([batch, h * w * c]);

        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.dropout.forward(x);
        let x = self.fc2.forward(x);

        activation::softmax(x, 1)
    }
}
