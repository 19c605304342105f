// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Dataset layout and video frame sources.
//!
//! A dataset is a directory of word folders, each holding sample videos of
//! one sign. Frames are pulled from videos through the [`FrameSource`] trait;
//! [`VideoDecoder`] implements it with `video-rs` when the `video` feature is
//! enabled.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::{PipelineError, Result};

/// Video file extensions picked up in word folders (case-insensitive).
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// Check if a path is a video file based on extension.
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v)))
}

/// Word folders directly under `dataset`, sorted by name.
///
/// # Errors
///
/// Returns an error if `dataset` can't be listed.
pub fn list_word_dirs(dataset: &Path) -> Result<Vec<PathBuf>> {
    list_sorted(dataset, Path::is_dir)
}

/// Video files directly inside `word_dir`, sorted by name.
///
/// # Errors
///
/// Returns an error if `word_dir` can't be listed.
pub fn list_videos(word_dir: &Path) -> Result<Vec<PathBuf>> {
    list_sorted(word_dir, |p| p.is_file() && is_video_file(p))
}

fn list_sorted(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io_at(dir, &e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::io_at(dir, &e))?.path();
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Something that can open a video and yield its frames in order.
pub trait FrameSource {
    /// Iterator over decoded frames.
    type Frames: Iterator<Item = Result<DynamicImage>>;

    /// Open `path` for sequential decoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the video can't be opened.
    fn open(&mut self, path: &Path) -> Result<Self::Frames>;
}

/// [`FrameSource`] backed by `video-rs` (FFmpeg).
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoDecoder;

impl FrameSource for VideoDecoder {
    type Frames = VideoFrames;

    fn open(&mut self, path: &Path) -> Result<VideoFrames> {
        VideoFrames::open(path)
    }
}

/// Frames of one video file, decoded lazily.
pub struct VideoFrames {
    #[cfg(feature = "video")]
    decoder: Option<video_rs::decode::Decoder>,
}

impl VideoFrames {
    /// Open a video for decoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder can't be created.
    #[cfg(feature = "video")]
    pub fn open(path: &Path) -> Result<Self> {
        crate::io::init_video();
        let decoder = video_rs::decode::Decoder::new(path).map_err(|e| {
            PipelineError::VideoError(format!("Failed to open {}: {e}", path.display()))
        })?;
        Ok(Self {
            decoder: Some(decoder),
        })
    }

    /// Open a video for decoding.
    ///
    /// # Errors
    ///
    /// Always fails: decoding needs the `video` feature.
    #[cfg(not(feature = "video"))]
    pub fn open(path: &Path) -> Result<Self> {
        Err(PipelineError::FeatureNotEnabled(format!(
            "Decoding {} requires the 'video' feature",
            path.display()
        )))
    }
}

impl Iterator for VideoFrames {
    type Item = Result<DynamicImage>;

    #[cfg(feature = "video")]
    fn next(&mut self) -> Option<Self::Item> {
        let decoder = self.decoder.as_mut()?;
        match decoder.decode() {
            Ok((_ts, frame)) => Some(frame_to_image(&frame)),
            Err(video_rs::Error::DecodeExhausted) => {
                self.decoder = None;
                None
            }
            Err(e) => {
                self.decoder = None;
                Some(Err(PipelineError::VideoError(format!("Failed to decode frame: {e}"))))
            }
        }
    }

    #[cfg(not(feature = "video"))]
    fn next(&mut self) -> Option<Self::Item> {
        None
    }
}

/// Convert an HWC RGB frame to a `DynamicImage`.
#[cfg(feature = "video")]
fn frame_to_image(frame: &video_rs::Frame) -> Result<DynamicImage> {
    let (height, width, channels) = frame.dim();
    if channels != 3 {
        return Err(PipelineError::VideoError(format!(
            "Expected RGB frames, got {channels} channels"
        )));
    }
    let to_u32 = |v: usize| {
        u32::try_from(v).map_err(|_| PipelineError::ImageError("Frame dimension exceeds u32::MAX".to_string()))
    };
    let pixels: Vec<u8> = frame.as_standard_layout().iter().copied().collect();

    image::RgbImage::from_raw(to_u32(width)?, to_u32(height)?, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| PipelineError::ImageError("Failed to create image from video frame".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("a/clip.mp4")));
        assert!(is_video_file(Path::new("clip.MOV")));
        assert!(is_video_file(Path::new("clip.Avi")));
        assert!(!is_video_file(Path::new("clip.mkv")));
        assert!(!is_video_file(Path::new("notes.txt")));
        assert!(!is_video_file(Path::new("mp4")));
    }

    #[test]
    fn test_list_word_dirs_sorted_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("world")).unwrap();
        fs::create_dir(dir.path().join("hello")).unwrap();
        fs::write(dir.path().join("readme.md"), "x").unwrap();

        let words = list_word_dirs(dir.path()).unwrap();
        let names: Vec<_> = words.iter().filter_map(|p| p.file_name()?.to_str()).collect();
        assert_eq!(names, vec!["hello", "world"]);
    }

    #[test]
    fn test_list_videos_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.MOV", "c.avi", "notes.txt", "thumb.jpg"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let videos = list_videos(dir.path()).unwrap();
        let names: Vec<_> = videos.iter().filter_map(|p| p.file_name()?.to_str()).collect();
        assert_eq!(names, vec!["a.MOV", "b.mp4", "c.avi"]);
    }

    #[test]
    fn test_list_missing_dir_is_error() {
        assert!(list_word_dirs(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn test_open_missing_video_fails() {
        assert!(VideoDecoder.open(Path::new("/definitely/not/here.mp4")).is_err());
    }
}
