//! Consistent log lines for file operations

use std::path::Path;
use std::time::Duration;

/// Log the start of an operation on `path`, e.g. `Reading records from data.csv`
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{operation} {}", path.display());
}

/// Log the completion of an operation on `path`
///
/// `operation` is a past-tense verb (`"read"`, `"wrote"`), `items` the number
/// of records, rows or entries it handled.
pub fn log_operation_complete(operation: &str, path: &Path, items: usize, elapsed: Option<Duration>) {
    match elapsed {
        Some(duration) => log::info!(
            "Successfully {operation} {items} items ({}) in {duration:?}",
            path.display()
        ),
        None => log::info!("Successfully {operation} {items} items ({})", path.display()),
    }
}

/// Log a warning, optionally about a file
pub fn log_warning(message: &str, path: Option<&Path>) {
    match path {
        Some(path) => log::warn!("{message}: {}", path.display()),
        None => log::warn!("{message}"),
    }
}
