// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Signverse
//!
//! Sign-language video to avatar animation pipeline. Three stages run in
//! sequence:
//!
//! 1. **Extract** - decode every video of a word-labeled dataset, run a YOLO
//!    pose model on each frame and store the landmarks per word.
//! 2. **Transform** - remap landmarks to named avatar joints and store one
//!    animation track per word.
//! 3. **Serve** - answer `POST /text-to-sign` with the animation of a word.
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use signverse::{
//!     ExtractConfig, Extractor, InferenceConfig, TransformConfig, Transformer, YoloPoseEstimator,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Model is downloaded on first use
//!     let estimator = YoloPoseEstimator::new("yolo11n-pose.onnx", InferenceConfig::default())?;
//!
//!     let summary = Extractor::new(ExtractConfig::new("dataset", "keypoints"), estimator).run()?;
//!     println!("{} words, {} frames", summary.words, summary.frames_recorded);
//!
//!     let summary = Transformer::new(TransformConfig::new("keypoints", "animations")).run()?;
//!     println!("{} animations written", summary.files);
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Extract landmarks (needs the `video` feature to decode videos)
//! signverse extract --dataset dataset/ --output keypoints/
//!
//! # Build animations with a custom joint map
//! signverse transform --input keypoints/ --output animations/ --joint-map joints.json
//! ```
//!
//! The lookup server lives in `docker/server` and is configured through
//! `ANIMATION_DIR`, `HOST`, `PORT` and `RUST_LOG`.
//!
//! ## Data Layout
//!
//! ```text
//! dataset/<word>/<video>.mp4            input videos
//! keypoints/<word>.json                 [{video, keypoints: [[{x, y, z, visibility}]]}]
//! animations/<word>_animation.json      [{frame, joints: {name: [x, y, z]}, video}]
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`extract`] | [`Extractor`] batch stage |
//! | [`transform`] | [`Transformer`] batch stage |
//! | [`server`] | HTTP lookup service |
//! | [`pose`] | [`PoseEstimator`] trait and [`YoloPoseEstimator`] |
//! | [`model`] | [`PoseModel`] ONNX Runtime session |
//! | [`landmark`] | Landmark records and the 33-point layout |
//! | [`animation`] | [`JointMap`] and animation frames |
//! | [`source`] | Dataset listing and video frames |
//! | [`error`] | Error types ([`PipelineError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `video` | Video decoding through `video-rs` (FFmpeg) |

// Modules
pub mod animation;
pub mod cli;
pub mod download;
pub mod error;
pub mod extract;
pub mod inference;
pub mod io;
pub mod landmark;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod pose;
pub mod postprocessing;
pub mod preprocessing;
pub mod results;
pub mod server;
pub mod source;
pub mod transform;
pub mod utils;

// Re-export main types for convenience
pub use animation::{AnimationFrame, JointMap, build_animation};
pub use error::{PipelineError, Result};
pub use extract::{ExtractConfig, ExtractSummary, Extractor};
pub use inference::InferenceConfig;
pub use landmark::{FrameLandmarks, Landmark, VideoKeypoints};
pub use model::PoseModel;
pub use pose::{PoseEstimator, YoloPoseEstimator};
pub use results::{PoseDetection, Speed};
pub use server::{AppState, ServerConfig};
pub use source::{FrameSource, VideoDecoder};
pub use transform::{TransformConfig, TransformSummary, Transformer};

// Re-export metadata for advanced use
pub use metadata::ModelMetadata;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
