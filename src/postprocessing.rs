// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Decoding of raw YOLO pose output into person detections.
//!
//! Pose models emit `[1, 4 + classes + K * D, N]` (or the transposed
//! `[1, N, 4 + classes + K * D]`), where each of the `N` candidates carries a
//! `cx, cy, w, h` box, per-class scores and `K` keypoints of `D` values each.

use ndarray::{ArrayView2, s};

use crate::inference::InferenceConfig;
use crate::preprocessing::{PreprocessResult, clip_coords, scale_coords, scale_point};
use crate::results::PoseDetection;
use crate::utils::{argmax, nms};
use crate::warn;

/// Candidate layout resolved from an output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutputLayout {
    num_features: usize,
    num_preds: usize,
    transposed: bool,
}

/// Work out whether the output is `[features, preds]` or `[preds, features]`.
fn parse_pose_shape(shape: &[usize], expected_features: usize) -> Option<OutputLayout> {
    let (a, b) = match shape {
        [1, a, b] | [a, b] => (*a, *b),
        _ => return None,
    };
    if a == 0 || b == 0 {
        return None;
    }

    let layout = if a == expected_features || (b != expected_features && a < b) {
        OutputLayout {
            num_features: a,
            num_preds: b,
            transposed: false,
        }
    } else {
        OutputLayout {
            num_features: b,
            num_preds: a,
            transposed: true,
        }
    };
    Some(layout)
}

/// Decode pose model output into detections sorted by score.
///
/// `num_classes` comes from the model metadata; when the output carries a
/// different number of score columns, the count is derived from the data.
/// Keypoints with fewer than 3 values per point get a confidence of 1.
///
/// # Arguments
///
/// * `output` - Flat output tensor data.
/// * `output_shape` - Output shape, `[1, features, preds]` or `[1, preds, features]`.
/// * `preprocess` - Letterbox transform of the frame.
/// * `config` - Confidence, `IoU` and max detection settings.
/// * `num_classes` - Score columns announced by the model.
/// * `kpt_shape` - Keypoints per person and values per keypoint.
///
/// # Returns
///
/// Detections in original frame pixels; empty when the shape doesn't fit.
#[must_use]
pub fn postprocess_pose(
    output: &[f32],
    output_shape: &[usize],
    preprocess: &PreprocessResult,
    config: &InferenceConfig,
    num_classes: usize,
    kpt_shape: (usize, usize),
) -> Vec<PoseDetection> {
    let (num_keypoints, kpt_dim) = kpt_shape;
    let kpt_features = num_keypoints * kpt_dim;
    let expected_features = 4 + num_classes.max(1) + kpt_features;

    let Some(layout) = parse_pose_shape(output_shape, expected_features) else {
        return Vec::new();
    };
    if layout.num_features < 5 + kpt_features || kpt_dim < 2 {
        warn!(
            "Pose output has {} features per candidate, expected at least {}",
            layout.num_features,
            5 + kpt_features
        );
        return Vec::new();
    }

    let (rows, cols) = if layout.transposed {
        (layout.num_preds, layout.num_features)
    } else {
        (layout.num_features, layout.num_preds)
    };
    let Ok(view) = ArrayView2::from_shape((rows, cols), output) else {
        warn!(
            "Pose output of {} values doesn't match shape {output_shape:?}",
            output.len()
        );
        return Vec::new();
    };
    let preds = if layout.transposed { view } else { view.reversed_axes() };

    let num_classes = layout.num_features - 4 - kpt_features;
    let kpt_start = 4 + num_classes;
    let (orig_h, orig_w) = preprocess.orig_shape;
    #[allow(clippy::cast_precision_loss)]
    let (max_x, max_y) = (orig_w as f32, orig_h as f32);

    let mut candidates: Vec<PoseDetection> = Vec::new();
    for row in preds.outer_iter() {
        let Some((_, score)) = argmax(row.slice(s![4..kpt_start]).iter().copied()) else {
            continue;
        };
        if score < config.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let xyxy = [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0];
        let bbox = clip_coords(
            &scale_coords(&xyxy, preprocess.scale, preprocess.padding),
            preprocess.orig_shape,
        );

        let keypoints = (0..num_keypoints)
            .map(|k| {
                let offset = kpt_start + k * kpt_dim;
                let (x, y) = scale_point(row[offset], row[offset + 1], preprocess.scale, preprocess.padding);
                let conf = if kpt_dim > 2 { row[offset + 2] } else { 1.0 };
                [x.clamp(0.0, max_x), y.clamp(0.0, max_y), conf]
            })
            .collect();

        candidates.push(PoseDetection {
            bbox,
            confidence: score,
            keypoints,
        });
    }

    let boxes: Vec<([f32; 4], f32)> = candidates.iter().map(|d| (d.bbox, d.confidence)).collect();
    let keep = nms(&boxes, config.iou_threshold);

    let mut slots: Vec<Option<PoseDetection>> = candidates.into_iter().map(Some).collect();
    keep.into_iter()
        .take(config.max_detections)
        .filter_map(|i| slots[i].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    const NUM_PREDS: usize = 100;
    const NUM_FEATURES: usize = 56;

    fn identity_preprocess() -> PreprocessResult {
        PreprocessResult {
            tensor: Array4::zeros((1, 3, 640, 640)),
            orig_shape: (640, 640),
            scale: (1.0, 1.0),
            padding: (0.0, 0.0),
        }
    }

    /// Write one candidate into a `[1, 56, 100]` buffer.
    fn put_candidate(output: &mut [f32], idx: usize, bbox: [f32; 4], score: f32, kpt: [f32; 3]) {
        for (f, v) in bbox.iter().enumerate() {
            output[idx + NUM_PREDS * f] = *v;
        }
        output[idx + NUM_PREDS * 4] = score;
        for k in 0..17 {
            let offset = 5 + k * 3;
            for (d, v) in kpt.iter().enumerate() {
                output[idx + NUM_PREDS * (offset + d)] = *v;
            }
        }
    }

    #[test]
    fn test_parse_pose_shape() {
        let layout = parse_pose_shape(&[1, 56, 8400], 56).unwrap();
        assert_eq!(layout.num_features, 56);
        assert_eq!(layout.num_preds, 8400);
        assert!(!layout.transposed);

        let layout = parse_pose_shape(&[1, 8400, 56], 56).unwrap();
        assert_eq!(layout.num_preds, 8400);
        assert!(layout.transposed);

        assert!(parse_pose_shape(&[1, 2, 3, 4], 56).is_none());
        assert!(parse_pose_shape(&[1, 56, 0], 56).is_none());
    }

    #[test]
    fn test_postprocess_pose_single_person() {
        let mut output = vec![0.0; NUM_PREDS * NUM_FEATURES];
        put_candidate(&mut output, 0, [100.0, 100.0, 50.0, 50.0], 0.9, [100.0, 120.0, 0.8]);

        let dets = postprocess_pose(
            &output,
            &[1, NUM_FEATURES, NUM_PREDS],
            &identity_preprocess(),
            &InferenceConfig::default(),
            1,
            (17, 3),
        );

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox, [75.0, 75.0, 125.0, 125.0]);
        assert!((dets[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(dets[0].keypoints.len(), 17);
        assert_eq!(dets[0].keypoints[0], [100.0, 120.0, 0.8]);
    }

    #[test]
    fn test_postprocess_pose_suppresses_overlaps() {
        let mut output = vec![0.0; NUM_PREDS * NUM_FEATURES];
        put_candidate(&mut output, 0, [100.0, 100.0, 50.0, 50.0], 0.7, [1.0, 1.0, 0.5]);
        put_candidate(&mut output, 1, [102.0, 101.0, 50.0, 50.0], 0.95, [2.0, 2.0, 0.5]);
        put_candidate(&mut output, 2, [400.0, 400.0, 60.0, 60.0], 0.6, [3.0, 3.0, 0.5]);
        // Below threshold
        put_candidate(&mut output, 3, [500.0, 100.0, 60.0, 60.0], 0.2, [4.0, 4.0, 0.5]);

        let dets = postprocess_pose(
            &output,
            &[1, NUM_FEATURES, NUM_PREDS],
            &identity_preprocess(),
            &InferenceConfig::default(),
            1,
            (17, 3),
        );

        let scores: Vec<f32> = dets.iter().map(|d| d.confidence).collect();
        assert_eq!(scores, vec![0.95, 0.6]);
    }

    #[test]
    fn test_postprocess_pose_transposed_and_letterboxed() {
        let mut output = vec![0.0; NUM_PREDS * NUM_FEATURES];
        // Row-major [preds, features]
        output[0] = 320.0;
        output[1] = 320.0;
        output[2] = 100.0;
        output[3] = 100.0;
        output[4] = 0.8;
        for k in 0..17 {
            output[5 + k * 3] = 320.0;
            output[5 + k * 3 + 1] = 320.0;
            output[5 + k * 3 + 2] = 0.9;
        }

        // 1280x720 letterboxed into 640x640
        let preprocess = PreprocessResult {
            tensor: Array4::zeros((1, 3, 640, 640)),
            orig_shape: (720, 1280),
            scale: (0.5, 0.5),
            padding: (140.0, 0.0),
        };

        let dets = postprocess_pose(
            &output,
            &[1, NUM_PREDS, NUM_FEATURES],
            &preprocess,
            &InferenceConfig::default(),
            1,
            (17, 3),
        );

        assert_eq!(dets.len(), 1);
        let [x, y, conf] = dets[0].keypoints[5];
        assert!((x - 640.0).abs() < 1e-3);
        assert!((y - 360.0).abs() < 1e-3);
        assert!((conf - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_postprocess_pose_max_detections() {
        let mut output = vec![0.0; NUM_PREDS * NUM_FEATURES];
        put_candidate(&mut output, 0, [50.0, 50.0, 20.0, 20.0], 0.7, [1.0, 1.0, 0.5]);
        put_candidate(&mut output, 1, [300.0, 300.0, 20.0, 20.0], 0.9, [2.0, 2.0, 0.5]);

        let config = InferenceConfig::default().with_max_detections(1);
        let dets = postprocess_pose(
            &output,
            &[1, NUM_FEATURES, NUM_PREDS],
            &identity_preprocess(),
            &config,
            1,
            (17, 3),
        );

        assert_eq!(dets.len(), 1);
        assert!((dets[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_postprocess_pose_rejects_short_features() {
        let output = vec![0.0; 10 * 20];
        let dets = postprocess_pose(
            &output,
            &[1, 20, 10],
            &identity_preprocess(),
            &InferenceConfig::default(),
            1,
            (17, 3),
        );
        assert!(dets.is_empty());
    }

    #[test]
    fn test_postprocess_pose_mismatched_length() {
        let output = vec![0.0; 7];
        let dets = postprocess_pose(
            &output,
            &[1, NUM_FEATURES, NUM_PREDS],
            &identity_preprocess(),
            &InferenceConfig::default(),
            1,
            (17, 3),
        );
        assert!(dets.is_empty());
    }
}
