// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Landmark data produced by the extractor.
//!
//! Every detected frame is stored as [`NUM_LANDMARKS`] landmarks laid out in
//! the 33-point body topology below. Estimators that track fewer points put
//! theirs at the matching index and leave the rest as [`Landmark::UNTRACKED`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::{read_json, write_json_pretty};

/// Number of landmarks in one detected frame.
pub const NUM_LANDMARKS: usize = 33;

/// Names of the 33 body landmarks, indexed by landmark index.
pub const LANDMARK_NAMES: [&str; NUM_LANDMARKS] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

/// Landmark index for each of the 17 COCO keypoints, in COCO order.
///
/// COCO: nose, eyes, ears, shoulders, elbows, wrists, hips, knees, ankles.
pub const COCO_TO_LANDMARK: [usize; 17] = [0, 2, 5, 7, 8, 11, 12, 13, 14, 15, 16, 23, 24, 25, 26, 27, 28];

/// One tracked body point in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position, normalized by frame width.
    pub x: f64,
    /// Vertical position, normalized by frame height.
    pub y: f64,
    /// Depth relative to the hips; 0 for 2D estimators.
    pub z: f64,
    /// Confidence that the point is visible (0.0 - 1.0).
    pub visibility: f64,
}

impl Landmark {
    /// Placeholder for a slot the estimator does not track.
    pub const UNTRACKED: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        visibility: 0.0,
    };

    /// Create a landmark.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    /// Position as `[x, y, z]`.
    #[must_use]
    pub const fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Landmarks of a single frame, ordered by landmark index.
pub type FrameLandmarks = Vec<Landmark>;

/// All detected frames of one source video.
///
/// Either key may be absent when reading; it falls back to an empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoKeypoints {
    /// Source video file name (not the full path).
    #[serde(default)]
    pub video: String,
    /// Per-frame landmark lists.
    #[serde(default)]
    pub keypoints: Vec<FrameLandmarks>,
}

impl VideoKeypoints {
    /// Create an empty record for `video`.
    pub fn new(video: impl Into<String>) -> Self {
        Self {
            video: video.into(),
            keypoints: Vec::new(),
        }
    }

    /// Number of recorded frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Whether no frame was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Read a word's landmark file.
///
/// # Errors
///
/// Returns an error if the file can't be read or doesn't match the schema.
pub fn read_keypoints_file(path: impl AsRef<Path>) -> Result<Vec<VideoKeypoints>> {
    read_json(path)
}

/// Write a word's landmark file.
///
/// # Errors
///
/// Returns an error if the file can't be written.
pub fn write_keypoints_file(path: impl AsRef<Path>, records: &[VideoKeypoints]) -> Result<()> {
    write_json_pretty(path, &records)
}

/// Spread 17 COCO keypoints `(x, y, conf)` in pixels over the 33-point layout.
///
/// Coordinates are normalized by `(width, height)`.
#[must_use]
pub fn landmarks_from_coco(keypoints: &[[f32; 3]], width: u32, height: u32) -> FrameLandmarks {
    let mut landmarks = vec![Landmark::UNTRACKED; NUM_LANDMARKS];
    let (w, h) = (f64::from(width.max(1)), f64::from(height.max(1)));

    for (kpt, &slot) in keypoints.iter().zip(COCO_TO_LANDMARK.iter()) {
        landmarks[slot] = Landmark::new(
            f64::from(kpt[0]) / w,
            f64::from(kpt[1]) / h,
            0.0,
            f64::from(kpt[2]),
        );
    }

    landmarks
}
