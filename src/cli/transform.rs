// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::animation::JointMap;
use crate::cli::args::TransformArgs;
use crate::error::Result;
use crate::transform::{TransformConfig, TransformSummary, Transformer};
use crate::{VERSION, info, success, verbose};

/// Run the `transform` command.
///
/// # Errors
///
/// Returns an error if the joint map or a landmark file can't be loaded, or
/// an animation file can't be written.
pub fn run_transform(args: &TransformArgs) -> Result<TransformSummary> {
    verbose!("Signverse {VERSION} transform");

    let joint_map = match &args.joint_map {
        Some(path) => {
            let map = JointMap::from_file(path)?;
            verbose!("Using {} joints from {}", map.len(), path.display());
            map
        }
        None => JointMap::default(),
    };

    let config = TransformConfig::new(&args.input, &args.output)
        .with_joint_map(joint_map)
        .with_suffix(args.suffix.clone());
    info!(
        "Building animations from {} into {}",
        config.input_dir.display(),
        config.output_dir.display()
    );

    let summary = Transformer::new(config).run()?;
    success!("{} animation files, {} frames", summary.files, summary.frames);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(input: &std::path::Path, output: &std::path::Path, joint_map: Option<std::path::PathBuf>) -> TransformArgs {
        TransformArgs {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            joint_map,
            suffix: crate::transform::DEFAULT_SUFFIX.to_string(),
            verbose: false,
        }
    }

    #[test]
    fn test_run_transform_with_joint_map() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("keypoints");
        let output = tmp.path().join("animations");
        fs::create_dir_all(&input).unwrap();
        fs::write(
            input.join("yes.json"),
            r#"[{"video": "y.mp4", "keypoints": [[{"x": 0.5, "y": 0.25, "z": 0.0, "visibility": 0.9}]]}]"#,
        )
        .unwrap();
        let joints = tmp.path().join("joints.json");
        fs::write(&joints, r#"{"0": "head"}"#).unwrap();

        let summary = run_transform(&args(&input, &output, Some(joints))).unwrap();
        assert_eq!(summary, TransformSummary { files: 1, frames: 1 });

        let text = fs::read_to_string(output.join("yes_animation.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["joints"]["head"], serde_json::json!([0.5, 0.25, 0.0]));
    }

    #[test]
    fn test_missing_joint_map_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let result = run_transform(&args(tmp.path(), &tmp.path().join("out"), Some(tmp.path().join("nope.json"))));
        assert!(result.is_err());
    }
}
