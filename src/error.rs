// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Error loading the ONNX model.
    ModelLoadError(String),
    /// Error during model inference.
    InferenceError(String),
    /// Error processing images or frames.
    ImageError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// IO error with context (file not found, permission denied, etc.).
    IoError(String),
    /// Wrapped `std::io::Error`.
    Io(std::io::Error),
    /// Malformed or unwritable JSON artifact.
    Json {
        /// File the JSON was read from or written to.
        path: PathBuf,
        /// Underlying parse or serialization error.
        source: serde_json::Error,
    },
    /// Error parsing model metadata.
    MetadataError(String),
    /// Video processing error.
    VideoError(String),
    /// Feature not enabled.
    FeatureNotEnabled(String),
}

impl PipelineError {
    /// Build a [`PipelineError::Json`] for `path`.
    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build a [`PipelineError::IoError`] naming the file that failed.
    pub fn io_at(path: impl AsRef<Path>, err: &std::io::Error) -> Self {
        Self::IoError(format!("{}: {err}", path.as_ref().display()))
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::Json { path, source } => {
                write!(f, "JSON error in {}: {source}", path.display())
            }
            Self::MetadataError(msg) => write!(f, "Metadata error: {msg}"),
            Self::VideoError(msg) => write!(f, "Video error: {msg}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::ModelLoadError("test".to_string());
        assert_eq!(err.to_string(), "Model load error: test");

        let err = PipelineError::VideoError("test".to_string());
        assert_eq!(err.to_string(), "Video error: test");
    }

    #[test]
    fn test_json_error_names_file() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PipelineError::json("keypoints/hello.json", parse_err);
        let msg = err.to_string();
        assert!(msg.starts_with("JSON error in keypoints/hello.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_at_includes_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = PipelineError::io_at("dataset", &io);
        assert_eq!(err.to_string(), "IO error: dataset: missing");
    }
}
