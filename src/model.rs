// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! YOLO pose model loading and inference.
//!
//! [`PoseModel`] wraps an ONNX Runtime session for an exported YOLO pose model
//! and turns single frames into [`PoseDetection`]s.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;

use crate::download::try_download_model;
use crate::error::{PipelineError, Result};
use crate::inference::InferenceConfig;
use crate::metadata::{METADATA_KEYS, ModelMetadata};
use crate::postprocessing::postprocess_pose;
use crate::preprocessing::preprocess_image;
use crate::results::{PoseDetection, Speed};
use crate::{info, verbose};

/// YOLO pose model.
///
/// # Example
///
/// ```no_run
/// use signverse::PoseModel;
///
/// let mut model = PoseModel::load("yolo11n-pose.onnx")?;
/// let frame = image::open("frame.jpg").map_err(signverse::PipelineError::from)?;
/// let people = model.predict(&frame)?;
/// println!("Found {} people", people.len());
/// # Ok::<(), signverse::PipelineError>(())
/// ```
pub struct PoseModel {
    session: Session,
    metadata: ModelMetadata,
    input_name: String,
    output_name: String,
    config: InferenceConfig,
    warmed_up: bool,
    last_speed: Speed,
}

impl PoseModel {
    /// Load a pose model with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`PoseModel::load_with_config`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, InferenceConfig::default())
    }

    /// Load a pose model, downloading a released one if the file is missing.
    ///
    /// # Arguments
    ///
    /// * `path` - ONNX model file, or a release name such as `yolo11n-pose.onnx`.
    /// * `config` - Thresholds, input size and thread count.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing and can't be downloaded, the
    /// session can't be built, or the model isn't a pose model.
    pub fn load_with_config<P: AsRef<Path>>(path: P, config: InferenceConfig) -> Result<Self> {
        let mut path = path.as_ref().to_path_buf();
        if !path.exists() {
            info!("Model {} not found locally, downloading", path.display());
            path = try_download_model(&path)?;
        }

        let session = Session::builder()
            .map_err(|e| PipelineError::ModelLoadError(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PipelineError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(config.num_threads)
            .map_err(|e| PipelineError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
            .commit_from_file(&path)
            .map_err(|e| PipelineError::ModelLoadError(format!("Failed to load {}: {e}", path.display())))?;

        let metadata = Self::extract_metadata(&session)?;
        if !metadata.is_pose() {
            return Err(PipelineError::ModelLoadError(format!(
                "{} is a '{}' model, a pose model is required",
                path.display(),
                metadata.task
            )));
        }

        let input_name = session
            .inputs
            .first()
            .map_or_else(|| "images".to_string(), |i| i.name.clone());
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| PipelineError::ModelLoadError("Model has no outputs".to_string()))?;

        verbose!(
            "Loaded {} (imgsz {:?}, {} keypoints)",
            path.display(),
            config.imgsz.unwrap_or(metadata.imgsz),
            metadata.num_keypoints()
        );

        Ok(Self {
            session,
            metadata,
            input_name,
            output_name,
            config,
            warmed_up: false,
            last_speed: Speed::default(),
        })
    }

    /// Read the Ultralytics custom metadata entries from the session.
    fn extract_metadata(session: &Session) -> Result<ModelMetadata> {
        let model_metadata = session
            .metadata()
            .map_err(|e| PipelineError::ModelLoadError(format!("Failed to get model metadata: {e}")))?;

        let entries: HashMap<String, String> = METADATA_KEYS
            .iter()
            .filter_map(|key| match model_metadata.custom(key) {
                Ok(Some(value)) => Some(((*key).to_string(), value)),
                _ => None,
            })
            .collect();

        ModelMetadata::from_entries(&entries)
    }

    /// Input size frames are letterboxed to.
    #[must_use]
    pub fn imgsz(&self) -> (usize, usize) {
        self.config.imgsz.unwrap_or(self.metadata.imgsz)
    }

    /// Model metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Inference configuration.
    #[must_use]
    pub const fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Stage timings of the most recent [`PoseModel::predict`] call.
    #[must_use]
    pub const fn last_speed(&self) -> Speed {
        self.last_speed
    }

    /// Run a zero tensor through the session once.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn warmup(&mut self) -> Result<()> {
        if self.warmed_up {
            return Ok(());
        }
        let (h, w) = self.imgsz();
        self.run_inference(&Array4::zeros((1, 3, h, w)))?;
        self.warmed_up = true;
        Ok(())
    }

    /// Detect people in a frame, best first.
    ///
    /// # Arguments
    ///
    /// * `image` - Frame in any pixel format; it is converted to RGB.
    ///
    /// # Returns
    ///
    /// Detections with keypoints in frame pixels. Timings are kept in
    /// [`PoseModel::last_speed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is empty or inference fails.
    pub fn predict(&mut self, image: &DynamicImage) -> Result<Vec<PoseDetection>> {
        self.warmup()?;

        let start = Instant::now();
        let preprocess = preprocess_image(image, self.imgsz())?;
        let preprocess_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        let (output, shape) = self.run_inference(&preprocess.tensor)?;
        let inference_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        let detections = postprocess_pose(
            &output,
            &shape,
            &preprocess,
            &self.config,
            self.metadata.num_classes(),
            self.metadata.kpt_shape,
        );
        let postprocess_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.last_speed = Speed::new(preprocess_ms, inference_ms, postprocess_ms);
        Ok(detections)
    }

    /// Run the session and copy out the first output as `(data, shape)`.
    fn run_inference(&mut self, input: &Array4<f32>) -> Result<(Vec<f32>, Vec<usize>)> {
        let contiguous = input.as_standard_layout();
        let tensor = TensorRef::from_array_view(&contiguous)
            .map_err(|e| PipelineError::InferenceError(format!("Failed to create input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| PipelineError::InferenceError(format!("Inference failed: {e}")))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            PipelineError::InferenceError(format!("Output '{}' not found", self.output_name))
        })?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::InferenceError(format!("Failed to extract output: {e}")))?;

        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        Ok((data.to_vec(), shape))
    }
}

impl std::fmt::Debug for PoseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseModel")
            .field("task", &self.metadata.task)
            .field("imgsz", &self.imgsz())
            .field("kpt_shape", &self.metadata.kpt_shape)
            .field("input", &self.input_name)
            .field("output", &self.output_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_missing_model_is_load_error() {
        let result = PoseModel::load("definitely-missing-model.onnx");
        assert!(matches!(result, Err(PipelineError::ModelLoadError(_))));
    }
}
