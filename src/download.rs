// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose model auto-download.
//!
//! When the extractor is pointed at one of the released YOLO11 pose models and
//! the file is missing, it is fetched from the Ultralytics asset releases.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{PipelineError, Result};

/// Default pose model name.
pub const DEFAULT_POSE_MODEL: &str = "yolo11n-pose.onnx";

/// Release the pose models are published under.
const ASSETS_RELEASE_URL: &str = "https://github.com/ultralytics/assets/releases/download/v8.3.0";

/// Released pose model scales.
const POSE_SCALES: [char; 5] = ['n', 's', 'm', 'l', 'x'];

/// Connection timeout in seconds.
const CONNECT_TIMEOUT: u64 = 30;

/// Body read timeout in seconds.
const READ_TIMEOUT: u64 = 300;

/// Width of the progress bar in characters.
const BAR_WIDTH: usize = 12;

/// Minimum seconds between progress redraws.
const REDRAW_INTERVAL: f64 = 0.1;

/// Release URL for a known pose model file name.
#[must_use]
pub fn pose_model_url(filename: &str) -> Option<String> {
    let scale = filename.strip_prefix("yolo11")?.strip_suffix("-pose.onnx")?;
    let mut chars = scale.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if POSE_SCALES.contains(&c) => Some(format!("{ASSETS_RELEASE_URL}/{filename}")),
        _ => None,
    }
}

/// Download a released pose model to `model_path`.
///
/// # Errors
///
/// Returns an error if the file name isn't a released pose model or the
/// download fails.
pub fn try_download_model<P: AsRef<Path>>(model_path: P) -> Result<PathBuf> {
    let path = model_path.as_ref();
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    let url = pose_model_url(filename).ok_or_else(|| {
        PipelineError::ModelLoadError(format!(
            "Model file not found: {}. Auto-download is only supported for yolo11[n|s|m|l|x]-pose.onnx",
            path.display()
        ))
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io_at(parent, &e))?;
    }

    download_file(&url, path)?;
    Ok(path.to_path_buf())
}

/// Stream `url` into `dest` through a `.part` file, renamed on success.
fn download_file(url: &str, dest: &Path) -> Result<()> {
    let config = ureq::Agent::config_builder()
        .timeout_connect(Some(Duration::from_secs(CONNECT_TIMEOUT)))
        .timeout_recv_body(Some(Duration::from_secs(READ_TIMEOUT)))
        .build();
    let agent = ureq::Agent::new_with_config(config);

    let response = agent.get(url).call().map_err(|e| {
        PipelineError::ModelLoadError(match &e {
            ureq::Error::Timeout(_) => format!("Connection timed out while downloading {url}"),
            ureq::Error::Io(io_err) => format!("Network error downloading {url}: {io_err}"),
            _ => format!("Failed to download {url}: {e}"),
        })
    })?;

    let total: Option<u64> = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok());

    let part_path = dest.with_extension("part");
    let _ = fs::remove_file(&part_path);

    let mut progress = Progress::new(format!("Downloading {url} to '{}'", dest.display()), total);
    let mut reader = response.into_body().into_reader();

    let streamed = File::create(&part_path)
        .map_err(|e| PipelineError::io_at(&part_path, &e))
        .and_then(|file| stream_to(&mut reader, BufWriter::new(file), &mut progress));

    if let Err(e) = streamed {
        let _ = fs::remove_file(&part_path);
        return Err(e);
    }
    progress.finish();

    fs::rename(&part_path, dest).map_err(|e| {
        let _ = fs::remove_file(&part_path);
        PipelineError::ModelLoadError(format!(
            "Failed to move downloaded file to {}: {e}",
            dest.display()
        ))
    })
}

/// Copy `reader` into `writer`, reporting each chunk to `progress`.
fn stream_to<R: Read, W: Write>(reader: &mut R, mut writer: W, progress: &mut Progress) -> Result<()> {
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|e| PipelineError::ModelLoadError(format!("Failed to read from network: {e}")))?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buffer[..n])
            .map_err(|e| PipelineError::ModelLoadError(format!("Failed to write model file: {e}")))?;
        progress.advance(n as u64);
    }
    writer
        .flush()
        .map_err(|e| PipelineError::ModelLoadError(format!("Failed to flush model file: {e}")))
}

/// Single-line download progress on stderr.
struct Progress {
    label: String,
    total: Option<u64>,
    done: u64,
    started: Instant,
    last_draw: Instant,
}

impl Progress {
    fn new(label: String, total: Option<u64>) -> Self {
        let now = Instant::now();
        Self {
            label,
            total: total.filter(|&t| t > 0),
            done: 0,
            started: now,
            last_draw: now,
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.done += bytes;
        if self.last_draw.elapsed().as_secs_f64() >= REDRAW_INTERVAL {
            self.last_draw = Instant::now();
            eprint!("\r\x1b[K{}", self.render(false));
            std::io::stderr().flush().ok();
        }
    }

    fn finish(&self) {
        eprintln!("\r\x1b[K{}", self.render(true));
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn render(&self, complete: bool) -> String {
        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 { self.done as f64 / elapsed } else { 0.0 };
        let tail = format!("{}/s {}", format_bytes(rate), format_time(elapsed));

        match self.total {
            Some(total) => {
                let fraction = if complete { 1.0 } else { (self.done as f64 / total as f64).min(1.0) };
                format!(
                    "{}: {}% {} {}/{} {tail}",
                    self.label,
                    (fraction * 100.0) as u8,
                    generate_bar(fraction, BAR_WIDTH),
                    format_bytes(self.done as f64),
                    format_bytes(total as f64),
                )
            }
            None => format!("{}: {} {tail}", self.label, format_bytes(self.done as f64)),
        }
    }
}

/// Format bytes as human-readable string (e.g., "10.4MB").
fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024.0 {
        return format!("{bytes:.0}B");
    }
    let mut value = bytes / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1}{unit}")
}

/// Format elapsed seconds as `s`, `m:ss.s` or `h:mm:ss.s`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn format_time(seconds: f64) -> String {
    let whole = seconds as u64;
    let secs = seconds - (whole - whole % 60) as f64;
    match (whole / 3600, (whole % 3600) / 60) {
        (0, 0) => format!("{seconds:.1}s"),
        (0, mins) => format!("{mins}:{secs:04.1}"),
        (hours, mins) => format!("{hours}:{mins:02}:{secs:04.1}"),
    }
}

/// Progress bar of `width` cells, with a half cell when the remainder passes 0.5.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_bar(fraction: f64, width: usize) -> String {
    let exact = fraction.clamp(0.0, 1.0) * width as f64;
    let filled = exact as usize;
    let mut bar = "━".repeat(filled);
    if filled < width {
        let rest = if exact - filled as f64 > 0.5 {
            bar.push('╸');
            width - filled - 1
        } else {
            width - filled
        };
        bar.push_str(&"─".repeat(rest));
    }
    bar
}
