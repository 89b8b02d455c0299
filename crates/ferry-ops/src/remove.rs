//! Permanent deletion.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use ferry_core::{TransferError, TransferResult};

/// Delete every path; directories are removed recursively.
///
/// Paths that do not exist are skipped without error. Symbolic links are
/// removed themselves, never followed.
pub fn remove_paths(paths: &[PathBuf]) -> TransferResult<()> {
    for path in paths {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(TransferError::io(path, e)),
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| TransferError::io(path, e))?;
    }
    Ok(())
}
