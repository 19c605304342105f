// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose detections produced by the model for a single frame.

/// Timing information for one frame (in milliseconds).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Speed {
    /// Time spent letterboxing the frame.
    pub preprocess: f64,
    /// Time spent in ONNX Runtime.
    pub inference: f64,
    /// Time spent decoding and suppressing candidates.
    pub postprocess: f64,
}

impl Speed {
    /// Create a new `Speed` from the three stage timings.
    #[must_use]
    pub const fn new(preprocess: f64, inference: f64, postprocess: f64) -> Self {
        Self {
            preprocess,
            inference,
            postprocess,
        }
    }

    /// Total time across all stages.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.preprocess + self.inference + self.postprocess
    }
}

/// A single person found in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseDetection {
    /// Bounding box `[x1, y1, x2, y2]` in original frame pixels.
    pub bbox: [f32; 4],
    /// Person score.
    pub confidence: f32,
    /// Keypoints as `[x, y, confidence]` in original frame pixels.
    pub keypoints: Vec<[f32; 3]>,
}

impl PoseDetection {
    /// Area of the bounding box in pixels.
    #[must_use]
    pub fn area(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]).max(0.0) * (self.bbox[3] - self.bbox[1]).max(0.0)
    }
}

/// Pick the detection with the highest score, ties broken by the larger box.
#[must_use]
pub fn best_detection(detections: &[PoseDetection]) -> Option<&PoseDetection> {
    detections.iter().filter(|d| d.confidence.is_finite()).max_by(|a, b| {
        a.confidence
            .total_cmp(&b.confidence)
            .then_with(|| a.area().total_cmp(&b.area()))
    })
}
