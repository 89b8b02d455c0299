//! Recursive size estimation.

use std::fs;
use std::path::Path;

/// Total byte size of `paths`.
///
/// Missing paths count as zero. Directories are summed recursively and
/// entries that cannot be read are skipped, since the action that later
/// touches them reports the real error.
pub fn total_size<P: AsRef<Path>>(paths: &[P]) -> u64 {
    paths.iter().map(|p| path_size(p.as_ref())).sum()
}

/// Byte size of a single file or directory tree.
pub fn path_size(path: &Path) -> u64 {
    let Ok(metadata) = fs::metadata(path) else {
        return 0;
    };

    if !metadata.is_dir() {
        return metadata.len();
    }

    let mut size = 0u64;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            size += path_size(&entry.path());
        }
    }
    size
}
