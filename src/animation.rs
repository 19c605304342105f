// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Joint remapping from landmark records to animation frames.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::io::read_json;
use crate::landmark::VideoKeypoints;

/// Landmark index to avatar joint name, as used by the default avatar rig.
pub const DEFAULT_JOINTS: [(usize, &str); 9] = [
    (0, "nose"),
    (11, "leftShoulder"),
    (12, "rightShoulder"),
    (13, "leftElbow"),
    (14, "rightElbow"),
    (15, "leftWrist"),
    (16, "rightWrist"),
    (23, "leftHip"),
    (24, "rightHip"),
];

/// Static table selecting which landmarks become named joints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointMap {
    joints: BTreeMap<usize, String>,
}

impl Default for JointMap {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_JOINTS)
    }
}

impl JointMap {
    /// Build a map from `(landmark index, joint name)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        Self {
            joints: pairs.into_iter().map(|(i, n)| (i, n.into())).collect(),
        }
    }

    /// Load a map from a JSON object such as `{"0": "nose", "11": "leftShoulder"}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, isn't an index-to-name
    /// object, or is empty.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let map: Self = read_json(path)?;
        if map.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "Joint map {} has no entries",
                path.display()
            )));
        }
        Ok(map)
    }

    /// Joint name for a landmark index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.joints.get(&index).map(String::as_str)
    }

    /// Iterate over joint names in landmark-index order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.joints.values().map(String::as_str)
    }

    /// Number of joints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Whether the map has no joints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// One frame of avatar animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationFrame {
    /// Frame index within its source video.
    pub frame: usize,
    /// Joint name to `[x, y, z]`, in landmark-index order.
    pub joints: IndexMap<String, [f64; 3]>,
    /// Source video file name.
    pub video: String,
}

/// Flatten every video of a word into a single animation track.
///
/// Frame indices restart at 0 for each video. Landmarks outside the joint
/// map are dropped, and joints whose landmark is missing from a frame are
/// simply absent.
#[must_use]
pub fn build_animation(records: &[VideoKeypoints], joint_map: &JointMap) -> Vec<AnimationFrame> {
    let total: usize = records.iter().map(VideoKeypoints::len).sum();
    let mut frames = Vec::with_capacity(total);

    for record in records {
        for (frame_idx, landmarks) in record.keypoints.iter().enumerate() {
            let joints = landmarks
                .iter()
                .enumerate()
                .filter_map(|(idx, lm)| joint_map.get(idx).map(|name| (name.to_string(), lm.position())))
                .collect();

            frames.push(AnimationFrame {
                frame: frame_idx,
                joints,
                video: record.video.clone(),
            });
        }
    }

    frames
}
