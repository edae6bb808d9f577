//! Shared helpers: logging conventions, progress bars and console summaries

pub mod logging;
