//! Recursive copy and move.

use std::fs;
use std::path::{Path, PathBuf};

use ferry_core::{TransferError, TransferResult};

use crate::StepObserver;
use crate::tree::{children, file_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Copy,
    Move,
}

/// Copy every source into `destination`.
///
/// Directories are recreated under `destination` with their own name and
/// filled recursively. Files replace any existing file of the same name. The
/// observer is advanced by each file's size once it has been fully copied.
pub fn copy_paths(
    sources: &[PathBuf],
    destination: &Path,
    observer: &mut dyn StepObserver,
) -> TransferResult<()> {
    transfer(sources, destination, Mode::Copy, observer)
}

/// Move every source into `destination`.
///
/// Same traversal as [`copy_paths`], but files are relocated and source
/// directories are removed once the move has emptied them.
pub fn move_paths(
    sources: &[PathBuf],
    destination: &Path,
    observer: &mut dyn StepObserver,
) -> TransferResult<()> {
    transfer(sources, destination, Mode::Move, observer)
}

fn transfer(
    sources: &[PathBuf],
    destination: &Path,
    mode: Mode,
    observer: &mut dyn StepObserver,
) -> TransferResult<()> {
    for source in sources {
        observer.checkpoint()?;
        traverse(source, destination, mode, observer)?;
    }
    Ok(())
}

fn traverse(
    source: &Path,
    destination: &Path,
    mode: Mode,
    observer: &mut dyn StepObserver,
) -> TransferResult<()> {
    if source.is_dir() {
        let dest_dir = destination.join(file_name(source)?);

        if dest_dir.starts_with(source) {
            return Err(TransferError::io(
                source,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "cannot transfer a directory into itself",
                ),
            ));
        }

        fs::create_dir_all(&dest_dir).map_err(|e| TransferError::io(&dest_dir, e))?;

        for child in children(source)? {
            traverse(&child, &dest_dir, mode, observer)?;
        }

        if mode == Mode::Move {
            // Only succeeds when nothing new appeared while moving.
            if let Err(e) = fs::remove_dir(source) {
                tracing::debug!(path = %source.display(), error = %e, "source directory kept after move");
            }
        }
        return Ok(());
    }

    let to = file_destination(source, destination)?;
    let bytes = match mode {
        Mode::Copy => copy_file(source, &to)?,
        Mode::Move => move_file(source, &to)?,
    };
    observer.advance(bytes);
    Ok(())
}

/// Where a single file lands: inside `destination` when it is (or will be) a
/// directory, or onto `destination` itself when it is an existing file.
fn file_destination(source: &Path, destination: &Path) -> TransferResult<PathBuf> {
    if destination.is_dir() {
        return Ok(destination.join(file_name(source)?));
    }
    if destination.exists() {
        return Ok(destination.to_path_buf());
    }

    fs::create_dir_all(destination).map_err(|e| TransferError::io(destination, e))?;
    Ok(destination.join(file_name(source)?))
}

fn copy_file(source: &Path, dest: &Path) -> TransferResult<u64> {
    // Copying a file onto itself would truncate it before reading.
    if same_file(source, dest) {
        tracing::debug!(path = %source.display(), "file already in place");
        return fs::metadata(source)
            .map(|m| m.len())
            .map_err(|e| TransferError::io(source, e));
    }
    fs::copy(source, dest).map_err(|e| TransferError::io(source, e))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn move_file(source: &Path, dest: &Path) -> TransferResult<u64> {
    let size = fs::metadata(source)
        .map_err(|e| TransferError::io(source, e))?
        .len();

    // Try rename first (fast path for same filesystem)
    if fs::rename(source, dest).is_ok() {
        return Ok(size);
    }

    // Fall back to copy + delete for cross-filesystem moves
    fs::copy(source, dest).map_err(|e| TransferError::io(source, e))?;
    fs::remove_file(source).map_err(|e| TransferError::io(source, e))?;
    Ok(size)
}
