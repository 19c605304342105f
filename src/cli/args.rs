// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::download::DEFAULT_POSE_MODEL;
use crate::inference::{DEFAULT_CONFIDENCE, DEFAULT_IOU};
use crate::transform::DEFAULT_SUFFIX;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r"Examples:
    signverse extract --dataset dataset/ --output keypoints/
    signverse extract -d dataset/ -m yolo11s-pose.onnx --conf 0.4 --keep-empty-frames
    signverse transform --input keypoints/ --output animations/
    signverse transform -i keypoints/ --joint-map joints.json --suffix .anim.json")]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract per-frame pose landmarks from a word-labeled video dataset
    Extract(ExtractArgs),
    /// Convert landmark files into avatar animation files
    Transform(TransformArgs),
}

/// Arguments for the extract command.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Dataset folder with one subfolder of videos per word
    #[arg(short, long, default_value = "dataset")]
    pub dataset: PathBuf,

    /// Folder receiving <word>.json landmark files (previous JSON outputs are removed)
    #[arg(short, long, default_value = "keypoints")]
    pub output: PathBuf,

    /// Path to YOLO pose ONNX model file
    #[arg(short, long, env = "SIGNVERSE_MODEL", default_value = DEFAULT_POSE_MODEL)]
    pub model: PathBuf,

    /// Minimum person confidence
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    pub conf: f32,

    /// `IoU` threshold for NMS
    #[arg(long, default_value_t = DEFAULT_IOU)]
    pub iou: f32,

    /// Inference image size (square)
    #[arg(long)]
    pub imgsz: Option<usize>,

    /// ONNX Runtime intra-op threads (0 = automatic)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Record frames without a detected person as empty landmark lists
    #[arg(long, default_value_t = false)]
    pub keep_empty_frames: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the transform command.
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Folder of <word>.json landmark files
    #[arg(short, long, default_value = "keypoints")]
    pub input: PathBuf,

    /// Folder receiving animation files
    #[arg(short, long, default_value = "animations")]
    pub output: PathBuf,

    /// JSON object mapping landmark index to joint name, e.g. {"0": "nose"}
    #[arg(long)]
    pub joint_map: Option<PathBuf>,

    /// Suffix appended to the word for each animation file
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_args_defaults() {
        let args = Cli::parse_from(["app", "extract"]);
        match args.command {
            Commands::Extract(extract_args) => {
                assert_eq!(extract_args.dataset, PathBuf::from("dataset"));
                assert_eq!(extract_args.output, PathBuf::from("keypoints"));
                assert!((extract_args.conf - 0.5).abs() < f32::EPSILON);
                assert!((extract_args.iou - 0.45).abs() < f32::EPSILON);
                assert!(extract_args.imgsz.is_none());
                assert_eq!(extract_args.threads, 0);
                assert!(!extract_args.keep_empty_frames);
                assert!(extract_args.verbose);
            }
            Commands::Transform(_) => panic!("expected extract"),
        }
    }

    #[test]
    fn test_extract_args_custom() {
        let args = Cli::parse_from([
            "app",
            "extract",
            "-d",
            "videos",
            "--model",
            "custom-pose.onnx",
            "--conf",
            "0.3",
            "--imgsz",
            "320",
            "--keep-empty-frames",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Extract(extract_args) => {
                assert_eq!(extract_args.dataset, PathBuf::from("videos"));
                assert_eq!(extract_args.model, PathBuf::from("custom-pose.onnx"));
                assert!((extract_args.conf - 0.3).abs() < f32::EPSILON);
                assert_eq!(extract_args.imgsz, Some(320));
                assert!(extract_args.keep_empty_frames);
                assert!(!extract_args.verbose);
            }
            Commands::Transform(_) => panic!("expected extract"),
        }
    }

    #[test]
    fn test_transform_args() {
        let args = Cli::parse_from(["app", "transform", "--joint-map", "joints.json", "--suffix", ".anim.json"]);
        match args.command {
            Commands::Transform(transform_args) => {
                assert_eq!(transform_args.input, PathBuf::from("keypoints"));
                assert_eq!(transform_args.output, PathBuf::from("animations"));
                assert_eq!(transform_args.joint_map, Some(PathBuf::from("joints.json")));
                assert_eq!(transform_args.suffix, ".anim.json");
            }
            Commands::Extract(_) => panic!("expected transform"),
        }
    }
}
