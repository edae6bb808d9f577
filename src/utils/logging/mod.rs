//! Logging, progress tracking and console output
//!
//! File operations log a start and a completion line through [`log`]; long
//! loops report through the `indicatif` bars built in [`progress`]; the
//! binaries print their end-of-run summaries with [`console`].

pub mod console;
pub mod log;
pub mod progress;

pub use log::{log_operation_complete, log_operation_start, log_warning};
pub use progress::{create_main_progress_bar, create_spinner, finish_and_clear, finish_progress_bar};
