// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Animation building: per-word landmark files to avatar animation files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::animation::{JointMap, build_animation};
use crate::error::{PipelineError, Result};
use crate::io::{has_extension, write_json_pretty};
use crate::landmark::read_keypoints_file;
use crate::verbose;

/// Suffix appended to the word to name its animation file.
pub const DEFAULT_SUFFIX: &str = "_animation.json";

/// Where the transformer reads from and writes to.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Folder of `<word>.json` landmark files.
    pub input_dir: PathBuf,
    /// Folder receiving `<word><suffix>` animation files.
    pub output_dir: PathBuf,
    /// Landmarks kept as named joints.
    pub joint_map: JointMap,
    /// Output file name suffix.
    pub suffix: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("keypoints"),
            output_dir: PathBuf::from("animations"),
            joint_map: JointMap::default(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl TransformConfig {
    /// Create a configuration for the given folders with the default joints.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Use a custom joint map.
    #[must_use]
    pub fn with_joint_map(mut self, joint_map: JointMap) -> Self {
        self.joint_map = joint_map;
        self
    }

    /// Use a custom output suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

/// Counts from one transform run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSummary {
    /// Animation files written.
    pub files: usize,
    /// Animation frames written across all files.
    pub frames: usize,
}

/// Batch animation builder.
#[derive(Debug, Clone)]
pub struct Transformer {
    config: TransformConfig,
}

impl Transformer {
    /// Create a transformer.
    #[must_use]
    pub const fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Convert every landmark file in the input folder.
    ///
    /// # Errors
    ///
    /// Returns an error if a folder can't be read or created, or a landmark
    /// file is malformed. Files converted before the failure stay on disk.
    pub fn run(&self) -> Result<TransformSummary> {
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| PipelineError::io_at(output_dir, &e))?;

        let mut summary = TransformSummary::default();
        for input in self.landmark_files()? {
            let frames = self.transform_file(&input)?;
            summary.files += 1;
            summary.frames += frames;
        }
        Ok(summary)
    }

    /// Convert one landmark file, returning the number of frames written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be parsed or the output can't be
    /// written.
    pub fn transform_file(&self, input: &Path) -> Result<usize> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| PipelineError::ConfigError(format!("Bad landmark file name: {}", input.display())))?;

        let records = read_keypoints_file(input)?;
        let animation = build_animation(&records, &self.config.joint_map);

        let output = self.config.output_dir.join(format!("{stem}{}", self.config.suffix));
        write_json_pretty(&output, &animation)?;
        verbose!("{} -> {} ({} frames)", input.display(), output.display(), animation.len());

        Ok(animation.len())
    }

    /// `*.json` files of the input folder, sorted by name.
    fn landmark_files(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.config.input_dir;
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| PipelineError::io_at(dir, &e))? {
            let path = entry.map_err(|e| PipelineError::io_at(dir, &e))?.path();
            if path.is_file() && has_extension(&path, "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
