// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Console output for the batch stages and the CLI.
//!
//! Progress goes to stdout, problems to stderr. `verbose!` and `section!`
//! are silenced by `--verbose false`; warnings and errors never are.
//! Every `warn!` is counted so a batch run can report how many videos or
//! frames it had to skip.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(true);
static WARNINGS: AtomicUsize = AtomicUsize::new(0);

/// Enable or disable progress output.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Whether progress output is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Count one warning. Called by [`warn!`](crate::warn).
#[doc(hidden)]
pub fn record_warning() {
    WARNINGS.fetch_add(1, Ordering::Relaxed);
}

/// Warnings printed since the process started.
///
/// Take the difference of two readings to count the warnings of one run.
pub fn warning_count() -> usize {
    WARNINGS.load(Ordering::Relaxed)
}

/// Plain progress line.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        println!("{}", format!($($arg)*));
    }};
}

/// Recoverable problem, e.g. an unreadable video. Counted by [`warning_count`](crate::logging::warning_count).
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        $crate::logging::record_warning();
        eprintln!("{} {}", "WARNING ⚠️".yellow().bold(), format!($($arg)*));
    }};
}

/// Fatal problem, printed right before a non-zero exit.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "Error:".red().bold(), format!($($arg)*));
    }};
}

/// Final summary of a finished stage.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        println!("{} {}", "✅".green(), format!($($arg)*));
    }};
}

/// Per-file detail, shown only in verbose mode.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {{
        if $crate::logging::is_verbose() {
            println!("{}", format!($($arg)*));
        }
    }};
}

/// Heading for one word of the dataset, shown only in verbose mode.
#[macro_export]
macro_rules! section {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        if $crate::logging::is_verbose() {
            println!();
            println!("{}", format!($($arg)*).cyan().bold());
        }
    }};
}
