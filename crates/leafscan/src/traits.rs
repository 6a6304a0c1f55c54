use crate::{error::Result, preprocessing::ImageTensor, types::InputSize};

/// A frozen image classifier.
///
/// Implementations are loaded once and never mutated. They only need to be
/// `Send`: [`crate::handle::ModelHandle`] serializes every call behind a mutex.
pub trait ClassificationModel: Send {
    /// Spatial size every input must be resized to
    fn input_size(&self) -> InputSize;

    /// Length of the probability vector returned by [`Self::predict`]
    fn num_classes(&self) -> usize;

    /// Run one forward pass on a `[1, H, W, 3]` tensor
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>>;
}
