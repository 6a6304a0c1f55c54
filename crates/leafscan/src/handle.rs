use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{LeafError, Result};
use crate::preprocessing::ImageTensor;
use crate::traits::ClassificationModel;
use crate::types::InputSize;

/// Point in time after which a queued forward pass is no longer wanted.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now() + limit,
            limit,
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.at
    }

    /// `Timeout` once the deadline has passed
    pub fn check(&self) -> Result<()> {
        if self.has_passed() {
            return Err(LeafError::Timeout(self.limit));
        }
        Ok(())
    }
}

/// Shared, serialized access point to the loaded model.
///
/// Cloning is cheap and every clone points at the same model. Calls take the
/// lock for the duration of one forward pass. The model is never mutated, so
/// a lock poisoned by a panicking forward pass is taken over as is.
#[derive(Clone)]
pub struct ModelHandle {
    model: Arc<Mutex<Box<dyn ClassificationModel>>>,
    input_size: InputSize,
    num_classes: usize,
}

impl ModelHandle {
    pub fn new<M>(model: M) -> Self
    where
        M: ClassificationModel + 'static,
    {
        let input_size = model.input_size();
        let num_classes = model.num_classes();
        Self {
            model: Arc::new(Mutex::new(Box::new(model))),
            input_size,
            num_classes,
        }
    }

    pub fn input_size(&self) -> InputSize {
        self.input_size
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Run one forward pass and check the output before handing it back.
    pub fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        self.predict_within(input, None)
    }

    /// Like [`Self::predict`], but skips the forward pass with `Timeout` when
    /// the deadline passed while waiting for the model.
    pub fn predict_within(&self, input: &ImageTensor, deadline: Option<Deadline>) -> Result<Vec<f32>> {
        let expected = [1, self.input_size.height as usize, self.input_size.width as usize, 3];
        if input.dims() != expected {
            return Err(LeafError::Inference(format!(
                "input tensor has shape {:?}, model expects {:?}",
                input.dims(),
                expected
            )));
        }

        let probabilities = {
            let model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(deadline) = deadline.filter(Deadline::has_passed) {
                debug!("Caller gave up while queued for the model, skipping forward pass");
                return Err(LeafError::Timeout(deadline.limit()));
            }
            model.predict(input)?
        };

        if probabilities.len() != self.num_classes {
            return Err(LeafError::Inference(format!(
                "model returned {} probabilities, expected {}",
                probabilities.len(),
                self.num_classes
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(LeafError::Inference("model returned non-finite probabilities".to_string()));
        }

        debug!(classes = probabilities.len(), "Forward pass complete");
        Ok(probabilities)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("input_size", &self.input_size)
            .field("num_classes", &self.num_classes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{PreprocessConfig, preprocess_image};
    use image::RgbImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedModel {
        output: Vec<f32>,
        calls: Arc<AtomicUsize>,
    }

    impl ClassificationModel for FixedModel {
        fn input_size(&self) -> InputSize {
            InputSize::new(8, 8)
        }

        fn num_classes(&self) -> usize {
            3
        }

        fn predict(&self, _input: &ImageTensor) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    fn tensor(size: InputSize) -> ImageTensor {
        preprocess_image(&RgbImage::new(10, 10), size, &PreprocessConfig::default())
    }

    #[test]
    fn test_shape_mismatch_is_inference_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ModelHandle::new(FixedModel { output: vec![0.2, 0.3, 0.5], calls: calls.clone() });

        let result = handle.predict(&tensor(InputSize::new(16, 8)));
        assert!(matches!(result, Err(LeafError::Inference(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_wrong_output_length_is_inference_error() {
        let handle = ModelHandle::new(FixedModel {
            output: vec![0.5, 0.5],
            calls: Arc::new(AtomicUsize::new(0)),
        });
        assert!(matches!(
            handle.predict(&tensor(InputSize::new(8, 8))),
            Err(LeafError::Inference(_))
        ));
    }

    #[test]
    fn test_non_finite_output_is_inference_error() {
        let handle = ModelHandle::new(FixedModel {
            output: vec![0.5, f32::INFINITY, 0.0],
            calls: Arc::new(AtomicUsize::new(0)),
        });
        assert!(matches!(
            handle.predict(&tensor(InputSize::new(8, 8))),
            Err(LeafError::Inference(_))
        ));
    }

    #[test]
    fn test_clones_share_one_model() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ModelHandle::new(FixedModel { output: vec![0.2, 0.3, 0.5], calls: calls.clone() });
        let other = handle.clone();

        let input = tensor(InputSize::new(8, 8));
        assert_eq!(handle.predict(&input).unwrap(), vec![0.2, 0.3, 0.5]);
        assert_eq!(other.predict(&input).unwrap(), vec![0.2, 0.3, 0.5]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Panics on its first forward pass only
    struct PanicsOnce {
        calls: Arc<AtomicUsize>,
    }

    impl ClassificationModel for PanicsOnce {
        fn input_size(&self) -> InputSize {
            InputSize::new(8, 8)
        }

        fn num_classes(&self) -> usize {
            3
        }

        fn predict(&self, _input: &ImageTensor) -> Result<Vec<f32>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("forward pass blew up");
            }
            Ok(vec![0.1, 0.1, 0.8])
        }
    }

    #[test]
    fn test_model_usable_after_panicking_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ModelHandle::new(PanicsOnce { calls: calls.clone() });
        let input = tensor(InputSize::new(8, 8));

        let panicked = {
            let handle = handle.clone();
            let input = input.clone();
            std::thread::spawn(move || handle.predict(&input)).join()
        };
        assert!(panicked.is_err());

        for _ in 0..3 {
            assert_eq!(handle.predict(&input).unwrap(), vec![0.1, 0.1, 0.8]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_expired_deadline_skips_forward_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ModelHandle::new(FixedModel { output: vec![0.2, 0.3, 0.5], calls: calls.clone() });
        let input = tensor(InputSize::new(8, 8));

        let expired = Deadline::after(Duration::ZERO);
        assert!(matches!(
            handle.predict_within(&input, Some(expired)),
            Err(LeafError::Timeout(limit)) if limit == Duration::ZERO
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let open = Deadline::after(Duration::from_secs(60));
        assert_eq!(handle.predict_within(&input, Some(open)).unwrap(), vec![0.2, 0.3, 0.5]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ModelHandle::new(FixedModel { output: vec![0.2, 0.3, 0.5], calls: calls.clone() });
        let input = tensor(InputSize::new(8, 8));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let handle = handle.clone();
                let input = &input;
                scope.spawn(move || handle.predict(input).unwrap());
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }
}
