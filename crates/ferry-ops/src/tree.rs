//! Directory listing helpers shared by the traversing actions.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use ferry_core::{TransferError, TransferResult};

/// List the immediate children of `dir`, sorted by name.
pub(crate) fn children(dir: &Path) -> TransferResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| TransferError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TransferError::io(dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// The final component of `path`, used to name it at its destination.
pub(crate) fn file_name(path: &Path) -> TransferResult<OsString> {
    path.file_name().map(|n| n.to_os_string()).ok_or_else(|| {
        TransferError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })
}
