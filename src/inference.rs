// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose inference configuration.
//!
//! This module defines the [`InferenceConfig`] struct, which controls how the pose
//! estimator runs: person confidence threshold, Non-Maximum Suppression (NMS),
//! input image sizing, and ONNX Runtime threading.

/// Default person confidence threshold, matching the usual pose tracker default.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Default `IoU` threshold for NMS.
pub const DEFAULT_IOU: f32 = 0.45;

/// Configuration for pose inference.
///
/// Built with chained `with_*` calls.
///
/// # Example
///
/// ```rust
/// use signverse::InferenceConfig;
///
/// let config = InferenceConfig::new()
///     .with_confidence(0.6)
///     .with_iou(0.5)
///     .with_imgsz(640, 640);
/// ```
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Minimum person score (0.0 to 1.0).
    /// Frames whose best person scores lower than this count as "no pose".
    pub confidence_threshold: f32,
    /// `IoU` threshold for Non-Maximum Suppression (0.0 to 1.0).
    pub iou_threshold: f32,
    /// Maximum number of people kept per frame after NMS.
    pub max_detections: usize,
    /// Explicit input image size (height, width).
    /// If `None`, the model's metadata decides.
    pub imgsz: Option<(usize, usize)>,
    /// Number of intra-op threads for ONNX Runtime, `0` for the runtime default.
    pub num_threads: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU,
            max_detections: 10,
            imgsz: None,
            num_threads: 0,
        }
    }
}

impl InferenceConfig {
    /// Create a new configuration with default values.
    ///
    /// # Returns
    ///
    /// * An `InferenceConfig` with the default thresholds and automatic sizing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum person score.
    ///
    /// A frame whose best person scores below this value yields no landmarks.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Minimum person confidence (0.0 to 1.0).
    ///
    /// # Returns
    ///
    /// * The updated `InferenceConfig`.
    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the `IoU` threshold used to merge overlapping people.
    ///
    /// Two person boxes overlapping more than this are treated as the same
    /// person and only the higher-scoring one is kept.
    ///
    /// # Arguments
    ///
    /// * `threshold` - The `IoU` threshold (0.0 to 1.0).
    ///
    /// # Returns
    ///
    /// * The updated `InferenceConfig`.
    #[must_use]
    pub const fn with_iou(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Set how many people survive NMS per frame.
    ///
    /// # Arguments
    ///
    /// * `max` - Upper bound on detections kept, highest score first.
    ///
    /// # Returns
    ///
    /// * The updated `InferenceConfig`.
    #[must_use]
    pub const fn with_max_detections(mut self, max: usize) -> Self {
        self.max_detections = max;
        self
    }

    /// Override the model input size.
    ///
    /// # Arguments
    ///
    /// * `height` - The target image height.
    /// * `width` - The target image width.
    ///
    /// # Returns
    ///
    /// * The updated `InferenceConfig`.
    #[must_use]
    pub const fn with_imgsz(mut self, height: usize, width: usize) -> Self {
        self.imgsz = Some((height, width));
        self
    }

    /// Set the number of ONNX Runtime intra-op threads.
    ///
    /// # Arguments
    ///
    /// * `threads` - Thread count, or `0` to let the runtime decide.
    ///
    /// # Returns
    ///
    /// * The updated `InferenceConfig`.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }
}
