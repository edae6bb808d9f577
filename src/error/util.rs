//! Utility functions for error handling
//!
//! File helpers that attach the path and the purpose of the access to
//! any IO failure.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Result, SynthError};

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.is_file() {
        let kind = if path.exists() {
            io::ErrorKind::InvalidInput
        } else {
            io::ErrorKind::NotFound
        };
        return Err(SynthError::io_with_path(
            io::Error::new(kind, format!("expected a readable file for {purpose}")),
            path,
        ));
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => {
                "Permission denied - check file permissions".to_string()
            }
            _ => format!("Failed to open file for {purpose}: {e}"),
        };
        SynthError::io_with_path(io::Error::new(e.kind(), context), path)
    })
}

/// Safely read a file to string with rich error information
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    let mut file = safe_open_file(path, purpose)?;

    let mut content = String::new();
    io::Read::read_to_string(&mut file, &mut content).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::InvalidData => {
                "File contains invalid UTF-8 data - cannot read as text".to_string()
            }
            _ => format!("Failed to read file content for {purpose}: {e}"),
        };
        SynthError::io_with_path(io::Error::new(e.kind(), context), path)
    })?;
    Ok(content)
}

/// Create (or truncate) a file for writing, creating missing parent directories
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            SynthError::io_with_path(
                io::Error::new(
                    e.kind(),
                    format!("Failed to create output directory for {purpose}: {e}"),
                ),
                parent,
            )
        })?;
    }

    fs::File::create(path).map_err(|e| {
        SynthError::io_with_path(
            io::Error::new(e.kind(), format!("Failed to create file for {purpose}: {e}")),
            path,
        )
    })
}
