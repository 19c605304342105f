// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-frame pose estimation.
//!
//! The extractor only depends on [`PoseEstimator`]. [`YoloPoseEstimator`] is the
//! production implementation, backed by a YOLO pose ONNX model.

use std::path::Path;

use image::{DynamicImage, GenericImageView};

use crate::error::Result;
use crate::inference::InferenceConfig;
use crate::landmark::{FrameLandmarks, landmarks_from_coco};
use crate::model::PoseModel;
use crate::results::best_detection;
use crate::verbose;

/// Turns one frame into body landmarks.
pub trait PoseEstimator {
    /// Landmarks of the most prominent person in `frame`, or `None` if nobody
    /// was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame can't be processed at all.
    fn detect(&mut self, frame: &DynamicImage) -> Result<Option<FrameLandmarks>>;
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for &mut E {
    fn detect(&mut self, frame: &DynamicImage) -> Result<Option<FrameLandmarks>> {
        (**self).detect(frame)
    }
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for Box<E> {
    fn detect(&mut self, frame: &DynamicImage) -> Result<Option<FrameLandmarks>> {
        (**self).detect(frame)
    }
}

/// [`PoseEstimator`] running a YOLO pose model.
#[derive(Debug)]
pub struct YoloPoseEstimator {
    model: PoseModel,
    frames: u64,
    total_ms: f64,
}

impl YoloPoseEstimator {
    /// Load the model at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model can't be loaded or isn't a pose model.
    pub fn new<P: AsRef<Path>>(path: P, config: InferenceConfig) -> Result<Self> {
        Ok(Self::from_model(PoseModel::load_with_config(path, config)?))
    }

    /// Wrap an already loaded model.
    #[must_use]
    pub const fn from_model(model: PoseModel) -> Self {
        Self {
            model,
            frames: 0,
            total_ms: 0.0,
        }
    }

    /// The underlying model.
    #[must_use]
    pub const fn model(&self) -> &PoseModel {
        &self.model
    }

    /// Average milliseconds per processed frame.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_frame_ms(&self) -> f64 {
        if self.frames == 0 { 0.0 } else { self.total_ms / self.frames as f64 }
    }
}

impl PoseEstimator for YoloPoseEstimator {
    fn detect(&mut self, frame: &DynamicImage) -> Result<Option<FrameLandmarks>> {
        let detections = self.model.predict(frame)?;

        let speed = self.model.last_speed();
        self.frames += 1;
        self.total_ms += speed.total();
        if self.frames == 1 {
            verbose!(
                "Speed: {:.1}ms preprocess, {:.1}ms inference, {:.1}ms postprocess per frame",
                speed.preprocess,
                speed.inference,
                speed.postprocess
            );
        }

        let (width, height) = frame.dimensions();
        Ok(best_detection(&detections).map(|person| landmarks_from_coco(&person.keypoints, width, height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{Landmark, NUM_LANDMARKS};

    struct Constant(Option<FrameLandmarks>);

    impl PoseEstimator for Constant {
        fn detect(&mut self, _frame: &DynamicImage) -> Result<Option<FrameLandmarks>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_estimator_through_references() {
        let frame = DynamicImage::new_rgb8(4, 4);
        let mut inner = Constant(Some(vec![Landmark::UNTRACKED; NUM_LANDMARKS]));

        let mut by_ref = &mut inner;
        assert_eq!(by_ref.detect(&frame).unwrap().map(|l| l.len()), Some(NUM_LANDMARKS));

        let mut boxed: Box<dyn PoseEstimator> = Box::new(Constant(None));
        assert!(boxed.detect(&frame).unwrap().is_none());
    }

    #[test]
    fn test_missing_model_fails_to_load() {
        let result = YoloPoseEstimator::new("definitely-missing-model.onnx", InferenceConfig::default());
        assert!(result.is_err());
    }
}
