// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::time::Instant;

use crate::cli::args::ExtractArgs;
use crate::error::{PipelineError, Result};
use crate::extract::{ExtractConfig, ExtractSummary, Extractor};
use crate::inference::InferenceConfig;
use crate::pose::YoloPoseEstimator;
use crate::logging::warning_count;
use crate::{VERSION, info, success, verbose};

/// Build the inference configuration from command-line flags.
fn inference_config(args: &ExtractArgs) -> InferenceConfig {
    let config = InferenceConfig::new()
        .with_confidence(args.conf)
        .with_iou(args.iou)
        .with_threads(args.threads);
    match args.imgsz {
        Some(sz) => config.with_imgsz(sz, sz),
        None => config,
    }
}

/// Run the `extract` command.
///
/// # Errors
///
/// Returns an error if the binary was built without the `video` feature,
/// the model can't be loaded, or the dataset can't be processed. Without
/// the feature nothing is loaded or cleared.
pub fn run_extract(args: &ExtractArgs) -> Result<ExtractSummary> {
    verbose!("Signverse {VERSION} extract");

    if !cfg!(feature = "video") {
        return Err(PipelineError::FeatureNotEnabled(
            "video decoding requires the 'video' feature; rebuild with `--features video`".to_string(),
        ));
    }

    let estimator = YoloPoseEstimator::new(&args.model, inference_config(args))?;
    verbose!("{:?}", estimator.model());

    let config = ExtractConfig::new(&args.dataset, &args.output).with_record_empty_frames(args.keep_empty_frames);
    info!(
        "Extracting landmarks from {} into {}",
        config.dataset_dir.display(),
        config.output_dir.display()
    );

    let start = Instant::now();
    let warnings_before = warning_count();
    let mut extractor = Extractor::new(config, estimator);
    let summary = extractor.run()?;

    success!(
        "{} words, {} videos, {} of {} frames with a pose in {:.1}s",
        summary.words,
        summary.videos,
        summary.frames_recorded,
        summary.frames_decoded,
        start.elapsed().as_secs_f64()
    );
    let warnings = warning_count() - warnings_before;
    if warnings > 0 {
        info!("{warnings} warnings; skipped videos and frames are listed above");
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{Cli, Commands};
    use clap::Parser;

    fn parse(argv: &[&str]) -> ExtractArgs {
        match Cli::parse_from(argv).command {
            Commands::Extract(args) => args,
            Commands::Transform(_) => panic!("expected extract"),
        }
    }

    #[test]
    fn test_inference_config_from_flags() {
        let args = parse(&["app", "extract", "--conf", "0.7", "--iou", "0.3", "--imgsz", "320", "--threads", "2"]);
        let config = inference_config(&args);
        assert!((config.confidence_threshold - 0.7).abs() < f32::EPSILON);
        assert!((config.iou_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.imgsz, Some((320, 320)));
        assert_eq!(config.num_threads, 2);

        let args = parse(&["app", "extract"]);
        assert!(inference_config(&args).imgsz.is_none());
    }

    #[cfg(not(feature = "video"))]
    #[test]
    fn test_without_video_feature_keeps_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = tmp.path().join("dataset");
        let output = tmp.path().join("keypoints");
        std::fs::create_dir_all(dataset.join("hello")).unwrap();
        std::fs::write(dataset.join("hello/clip.mp4"), b"").unwrap();
        std::fs::create_dir_all(&output).unwrap();
        let existing = r#"[{"video": "clip.mp4", "keypoints": [[]]}]"#;
        std::fs::write(output.join("hello.json"), existing).unwrap();

        let args = parse(&[
            "app",
            "extract",
            "--verbose",
            "false",
            "--dataset",
            dataset.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--model",
            tmp.path().join("missing-pose.onnx").to_str().unwrap(),
        ]);
        assert!(matches!(run_extract(&args), Err(PipelineError::FeatureNotEnabled(_))));
        assert_eq!(std::fs::read_to_string(output.join("hello.json")).unwrap(), existing);
    }

    #[test]
    fn test_unknown_model_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let model = tmp.path().join("not-a-release.onnx");
        let args = parse(&["app", "extract", "--verbose", "false", "--model", model.to_str().unwrap()]);
        assert!(run_extract(&args).is_err());
    }
}
