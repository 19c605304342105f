// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! File-system helpers for the JSON artifacts the pipeline hands between stages.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{PipelineError, Result};
use crate::warn;

#[cfg(feature = "video")]
use std::sync::Once;

#[cfg(feature = "video")]
static INIT: Once = Once::new();

/// Indentation used for every JSON artifact.
const JSON_INDENT: &[u8] = b"    ";

/// Initialize global video decoding.
///
/// Ensures `video-rs` (and through it `FFmpeg`) is initialized before the
/// first decoder is opened. Safe to call multiple times.
#[allow(clippy::missing_const_for_fn)]
pub fn init_video() {
    #[cfg(feature = "video")]
    INIT.call_once(|| {
        if let Err(e) = video_rs::init() {
            eprintln!("Failed to initialize video-rs: {e}");
        }
    });
}

/// Read and deserialize a JSON file.
///
/// # Errors
///
/// Returns an error if the file can't be opened or doesn't match `T`.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PipelineError::io_at(path, &e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| PipelineError::json(path, e))
}

/// Write `value` to `path` as pretty JSON, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the file can't be created or written.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| PipelineError::io_at(path, &e))?;
    let mut writer = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| PipelineError::json(path, e))?;

    writer.flush().map_err(|e| PipelineError::io_at(path, &e))
}

/// Remove previous JSON outputs and subfolders from `dir`.
///
/// Creates `dir` if it doesn't exist. Failures to delete individual entries
/// are reported as warnings and skipped; other files are left untouched.
///
/// Returns the number of entries removed.
///
/// # Errors
///
/// Returns an error only if `dir` can't be created or listed.
pub fn clear_json_outputs(dir: impl AsRef<Path>) -> Result<usize> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| PipelineError::io_at(dir, &e))?;

    let mut removed = 0;
    for entry in fs::read_dir(dir).map_err(|e| PipelineError::io_at(dir, &e))? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error reading entry in {}: {e}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if path.is_dir() {
            match fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Error removing folder {name}: {e}"),
            }
        } else if has_extension(&path, "json") {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Error deleting {name}: {e}"),
            }
        }
    }

    Ok(removed)
}

/// Case-insensitive extension check.
#[must_use]
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}
