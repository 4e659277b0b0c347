//! Sink trait, error types and the atomic write helper
//!
//! Every sink writes into a temporary file next to the destination and
//! renames it into place only after the whole file was written, so a failed
//! write never leaves a truncated or half-written file behind.

use crate::pipeline::HotelRecord;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while writing records
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Permission denied writing {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Disk full while writing {}", path.display())]
    DiskFull { path: PathBuf },

    #[error("Invalid output path {}: {reason}", path.display())]
    PathInvalid { path: PathBuf, reason: String },

    #[error("IO error writing {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OutputError {
    /// Classifies an IO failure for `path`
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        let path = path.to_path_buf();
        match error.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied { path }
            }
            io::ErrorKind::StorageFull => Self::DiskFull { path },
            io::ErrorKind::NotFound
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::IsADirectory => Self::PathInvalid {
                path,
                reason: error.to_string(),
            },
            _ => Self::Io {
                path,
                source: error,
            },
        }
    }

    /// Classifies a CSV failure, unwrapping IO errors
    pub fn from_csv(path: &Path, error: csv::Error) -> Self {
        if !error.is_io_error() {
            return Self::Csv(error);
        }
        match error.into_kind() {
            csv::ErrorKind::Io(io_error) => Self::from_io(path, io_error),
            other => Self::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, format!("{:?}", other)),
            },
        }
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for record sinks
///
/// A sink serializes the whole record set to `destination`, replacing any
/// previous file. Implementations must either write the complete file or
/// leave the destination untouched.
pub trait RecordSink {
    /// Writes `records` to `destination`
    fn write(&self, records: &[HotelRecord], destination: &Path) -> OutputResult<()>;

    /// File extension conventionally used by this sink
    fn extension(&self) -> &'static str;
}

/// Writes a file through a temporary sibling and renames it into place
///
/// # Arguments
///
/// * `destination` - Final path of the file
/// * `write` - Produces the file content into the given writer
pub(crate) fn write_atomically<F>(destination: &Path, write: F) -> OutputResult<()>
where
    F: FnOnce(&mut dyn Write) -> OutputResult<()>,
{
    if destination.file_name().is_none() {
        return Err(OutputError::PathInvalid {
            path: destination.to_path_buf(),
            reason: "path has no file name".to_string(),
        });
    }

    if destination.is_dir() {
        return Err(OutputError::PathInvalid {
            path: destination.to_path_buf(),
            reason: "path is a directory".to_string(),
        });
    }

    let dir = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    if !dir.is_dir() {
        return Err(OutputError::PathInvalid {
            path: destination.to_path_buf(),
            reason: format!("directory {} does not exist", dir.display()),
        });
    }

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| OutputError::from_io(destination, e))?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer)?;
        writer
            .flush()
            .map_err(|e| OutputError::from_io(destination, e))?;
    }

    temp.as_file()
        .sync_all()
        .map_err(|e| OutputError::from_io(destination, e))?;

    // Temp files are created owner-only; keep the mode of the file being
    // replaced, or use the usual mode for a new file.
    if let Some(permissions) = std::fs::metadata(destination)
        .ok()
        .map(|metadata| metadata.permissions())
        .or_else(new_file_permissions)
    {
        temp.as_file()
            .set_permissions(permissions)
            .map_err(|e| OutputError::from_io(destination, e))?;
    }

    temp.persist(destination)
        .map_err(|e| OutputError::from_io(destination, e.error))?;

    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    None
}
