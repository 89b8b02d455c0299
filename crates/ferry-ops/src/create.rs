//! Directory creation.

use std::fs;
use std::path::PathBuf;

use ferry_core::{TransferError, TransferResult};

/// Create every path as a directory, including missing parents.
///
/// Paths that already exist as directories are left alone.
pub fn make_directories(paths: &[PathBuf]) -> TransferResult<()> {
    for path in paths {
        fs::create_dir_all(path).map_err(|e| TransferError::io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_make_directories_with_parents() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b/c");
        make_directories(&[nested.clone(), nested.clone()]).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_make_directory_over_file_fails() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(make_directories(&[file]).is_err());
    }
}
