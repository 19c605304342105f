// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Landmark extraction: dataset videos to per-word landmark files.
//!
//! For every word folder in the dataset, each video is decoded frame by frame
//! and passed through a [`PoseEstimator`]. The resulting landmark lists are
//! written to `<output>/<word>.json` as an array of [`VideoKeypoints`].

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::io::clear_json_outputs;
use crate::landmark::{VideoKeypoints, write_keypoints_file};
use crate::pose::PoseEstimator;
use crate::source::{FrameSource, VideoDecoder, list_videos, list_word_dirs};
use crate::{section, verbose, warn};

/// Where the extractor reads from and writes to.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Root folder holding one subfolder per word.
    pub dataset_dir: PathBuf,
    /// Folder receiving `<word>.json` landmark files.
    pub output_dir: PathBuf,
    /// Record frames without a detected person as empty landmark lists
    /// instead of dropping them.
    pub record_empty_frames: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            output_dir: PathBuf::from("keypoints"),
            record_empty_frames: false,
        }
    }
}

impl ExtractConfig {
    /// Create a configuration for the given folders.
    pub fn new(dataset_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Keep frames without a detection as empty lists.
    #[must_use]
    pub const fn with_record_empty_frames(mut self, record: bool) -> Self {
        self.record_empty_frames = record;
        self
    }
}

/// Counts from one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Word files written.
    pub words: usize,
    /// Videos visited, including unreadable ones.
    pub videos: usize,
    /// Frames decoded across all videos.
    pub frames_decoded: usize,
    /// Frames written to landmark files.
    pub frames_recorded: usize,
    /// Stale outputs removed before the run.
    pub cleared: usize,
}

/// Batch landmark extractor.
pub struct Extractor<E, S = VideoDecoder> {
    config: ExtractConfig,
    estimator: E,
    frames: S,
    reported_no_decoder: bool,
}

impl<E: PoseEstimator> Extractor<E> {
    /// Create an extractor decoding videos with `video-rs`.
    pub fn new(config: ExtractConfig, estimator: E) -> Self {
        Self::with_frame_source(config, estimator, VideoDecoder)
    }
}

impl<E: PoseEstimator, S: FrameSource> Extractor<E, S> {
    /// Create an extractor with a custom frame source.
    pub const fn with_frame_source(config: ExtractConfig, estimator: E, frames: S) -> Self {
        Self {
            config,
            estimator,
            frames,
            reported_no_decoder: false,
        }
    }

    /// The active configuration.
    pub const fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Process the whole dataset.
    ///
    /// Previous JSON outputs are removed first. Unreadable videos produce an
    /// empty record; they never abort the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is missing or lies inside the output
    /// folder, the dataset can't be listed, the output folder can't be
    /// prepared, or a landmark file can't be written.
    pub fn run(&mut self) -> Result<ExtractSummary> {
        self.check_folders()?;

        let mut summary = ExtractSummary {
            cleared: clear_json_outputs(&self.config.output_dir)?,
            ..ExtractSummary::default()
        };
        if summary.cleared > 0 {
            verbose!(
                "Removed {} previous outputs from {}",
                summary.cleared,
                self.config.output_dir.display()
            );
        }

        for word_dir in list_word_dirs(&self.config.dataset_dir)? {
            let Some(word) = word_dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                warn!("Skipping folder with a non UTF-8 name: {}", word_dir.display());
                continue;
            };
            section!("Word '{word}'");

            let mut records = Vec::new();
            for video in list_videos(&word_dir)? {
                let (record, decoded) = self.extract_video(&video);
                verbose!("  {}: {} of {} frames", record.video, record.len(), decoded);

                summary.videos += 1;
                summary.frames_decoded += decoded;
                summary.frames_recorded += record.len();
                records.push(record);
            }

            let out_path = self.config.output_dir.join(format!("{word}.json"));
            write_keypoints_file(&out_path, &records)?;
            verbose!("Saved {}", out_path.display());
            summary.words += 1;
        }

        Ok(summary)
    }

    /// Run pose detection over every frame of one video.
    ///
    /// Returns the record together with the number of decoded frames. A video
    /// that can't be opened yields an empty record; a decode error midway
    /// keeps the frames read so far.
    pub fn extract_video(&mut self, path: &Path) -> (VideoKeypoints, usize) {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let mut record = VideoKeypoints::new(name);

        let frames = match self.frames.open(path) {
            Ok(frames) => frames,
            Err(e) => {
                self.report_open_failure(path, &e);
                return (record, 0);
            }
        };

        let mut decoded = 0;
        for frame in frames {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Stopped reading {}: {e}", path.display());
                    break;
                }
            };
            decoded += 1;

            match self.estimator.detect(&frame) {
                Ok(Some(landmarks)) => record.keypoints.push(landmarks),
                Ok(None) if self.config.record_empty_frames => record.keypoints.push(Vec::new()),
                Ok(None) => {}
                Err(e) => {
                    warn!("Pose detection failed on frame {} of {}: {e}", decoded - 1, path.display());
                    if self.config.record_empty_frames {
                        record.keypoints.push(Vec::new());
                    }
                }
            }
        }

        (record, decoded)
    }

    /// Refuse to clear an output folder that holds the dataset.
    fn check_folders(&self) -> Result<()> {
        let dataset = self
            .config
            .dataset_dir
            .canonicalize()
            .map_err(|e| PipelineError::io_at(&self.config.dataset_dir, &e))?;
        let Ok(output) = self.config.output_dir.canonicalize() else {
            return Ok(());
        };
        if dataset.starts_with(&output) {
            return Err(PipelineError::ConfigError(format!(
                "Output folder {} contains the dataset {}; choose a separate output folder",
                self.config.output_dir.display(),
                self.config.dataset_dir.display()
            )));
        }
        Ok(())
    }

    fn report_open_failure(&mut self, path: &Path, err: &PipelineError) {
        if matches!(err, PipelineError::FeatureNotEnabled(_)) {
            if !self.reported_no_decoder {
                warn!("Video decoding is unavailable ({err}); videos will have no keypoints");
                self.reported_no_decoder = true;
            }
            return;
        }
        warn!("Could not open {}: {err}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    use image::{DynamicImage, GenericImageView};

    use crate::landmark::{FrameLandmarks, Landmark, read_keypoints_file};

    /// Detects a person only in frames whose width is even.
    struct EvenWidthEstimator;

    impl PoseEstimator for EvenWidthEstimator {
        fn detect(&mut self, frame: &DynamicImage) -> Result<Option<FrameLandmarks>> {
            let (w, _) = frame.dimensions();
            Ok((w % 2 == 0).then(|| vec![Landmark::new(f64::from(w), 0.5, 0.0, 1.0); 33]))
        }
    }

    /// Serves frame widths per file name; unknown names fail to open.
    struct FakeVideos(HashMap<String, Vec<u32>>);

    impl FrameSource for FakeVideos {
        type Frames = std::vec::IntoIter<Result<DynamicImage>>;

        fn open(&mut self, path: &Path) -> Result<Self::Frames> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let widths = self
                .0
                .get(name)
                .ok_or_else(|| PipelineError::VideoError(format!("cannot open {name}")))?;
            let frames: Vec<_> = widths.iter().map(|&w| Ok(DynamicImage::new_rgb8(w, 2))).collect();
            Ok(frames.into_iter())
        }
    }

    fn fake_videos(entries: &[(&str, &[u32])]) -> FakeVideos {
        FakeVideos(entries.iter().map(|(n, w)| ((*n).to_string(), w.to_vec())).collect())
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_run_writes_one_file_per_word() {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = tmp.path().join("dataset");
        let output = tmp.path().join("keypoints");

        touch(&dataset.join("hello/b.mp4"));
        touch(&dataset.join("hello/a.MOV"));
        touch(&dataset.join("hello/notes.txt"));
        touch(&dataset.join("thanks/c.avi"));
        touch(&dataset.join("stray.mp4"));

        let videos = fake_videos(&[("a.MOV", &[2, 3, 4]), ("b.mp4", &[5]), ("c.avi", &[6, 8])]);
        let mut extractor = Extractor::with_frame_source(
            ExtractConfig::new(&dataset, &output),
            EvenWidthEstimator,
            videos,
        );
        let summary = extractor.run().unwrap();

        assert_eq!(summary.words, 2);
        assert_eq!(summary.videos, 3);
        assert_eq!(summary.frames_decoded, 6);
        assert_eq!(summary.frames_recorded, 4);

        let hello = read_keypoints_file(output.join("hello.json")).unwrap();
        assert_eq!(hello.len(), 2);
        assert_eq!(hello[0].video, "a.MOV");
        assert_eq!(hello[0].keypoints.len(), 2);
        assert!((hello[0].keypoints[1][0].x - 4.0).abs() < f64::EPSILON);
        assert_eq!(hello[1].video, "b.mp4");
        assert!(hello[1].keypoints.is_empty());

        let thanks = read_keypoints_file(output.join("thanks.json")).unwrap();
        assert_eq!(thanks.len(), 1);
        assert_eq!(thanks[0].keypoints.len(), 2);
    }

    #[test]
    fn test_unreadable_video_yields_empty_record() {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = tmp.path().join("dataset");
        let output = tmp.path().join("keypoints");
        touch(&dataset.join("bye/broken.mp4"));

        let mut extractor = Extractor::with_frame_source(
            ExtractConfig::new(&dataset, &output),
            EvenWidthEstimator,
            fake_videos(&[]),
        );
        let summary = extractor.run().unwrap();
        assert_eq!(summary.videos, 1);
        assert_eq!(summary.frames_decoded, 0);

        let bye = read_keypoints_file(output.join("bye.json")).unwrap();
        assert_eq!(bye, vec![VideoKeypoints::new("broken.mp4")]);
    }

    #[test]
    fn test_record_empty_frames_keeps_alignment() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ExtractConfig::new(tmp.path(), tmp.path().join("out")).with_record_empty_frames(true);
        let mut extractor =
            Extractor::with_frame_source(config, EvenWidthEstimator, fake_videos(&[("x.mp4", &[1, 2, 3])]));

        let (record, decoded) = extractor.extract_video(Path::new("x.mp4"));
        assert_eq!(decoded, 3);
        let lens: Vec<usize> = record.keypoints.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![0, 33, 0]);
    }

    #[test]
    fn test_run_clears_previous_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = tmp.path().join("dataset");
        let output = tmp.path().join("keypoints");
        fs::create_dir_all(&dataset).unwrap();
        fs::create_dir_all(output.join("old_word")).unwrap();
        fs::write(output.join("stale.json"), "[]").unwrap();
        fs::write(output.join("keep.txt"), "x").unwrap();

        let mut extractor =
            Extractor::with_frame_source(ExtractConfig::new(&dataset, &output), EvenWidthEstimator, fake_videos(&[]));
        let summary = extractor.run().unwrap();

        assert_eq!(summary.cleared, 2);
        assert_eq!(summary.words, 0);
        assert!(!output.join("stale.json").exists());
        assert!(!output.join("old_word").exists());
        assert!(output.join("keep.txt").exists());
    }

    #[test]
    fn test_output_holding_dataset_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let work = tmp.path().join("work");
        let video = work.join("dataset/hello/clip.mp4");
        touch(&video);
        fs::write(work.join("old.json"), "[]").unwrap();

        for (dataset, output) in [
            (work.join("dataset"), work.clone()),
            (work.join("dataset"), work.join("dataset")),
            (work.join("dataset"), work.join("dataset/../.")),
        ] {
            let mut extractor = Extractor::with_frame_source(
                ExtractConfig::new(&dataset, &output),
                EvenWidthEstimator,
                fake_videos(&[("clip.mp4", &[2])]),
            );
            assert!(matches!(extractor.run(), Err(PipelineError::ConfigError(_))));
            assert!(video.exists());
            assert!(work.join("old.json").exists());
        }
    }

    #[test]
    fn test_sibling_output_with_shared_prefix_is_allowed() {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = tmp.path().join("dataset");
        let output = tmp.path().join("data");
        touch(&dataset.join("hello/clip.mp4"));

        let mut extractor = Extractor::with_frame_source(
            ExtractConfig::new(&dataset, &output),
            EvenWidthEstimator,
            fake_videos(&[("clip.mp4", &[2])]),
        );
        let summary = extractor.run().unwrap();
        assert_eq!(summary.frames_recorded, 1);
        assert!(dataset.join("hello/clip.mp4").exists());
        assert!(output.join("hello.json").exists());
    }

    #[test]
    fn test_missing_dataset_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut extractor = Extractor::with_frame_source(
            ExtractConfig::new(tmp.path().join("nope"), tmp.path().join("out")),
            EvenWidthEstimator,
            fake_videos(&[]),
        );
        assert!(extractor.run().is_err());
    }
}
