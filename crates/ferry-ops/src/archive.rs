//! Zip archive creation and extraction.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use ferry_core::{TransferError, TransferResult};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::StepObserver;
use crate::tree::{children, file_name};

/// Write every source into a single zip archive at `archive`.
///
/// Each source is stored under its own name at the root of the archive;
/// directories are stored recursively, empty ones included. The archive file
/// itself is never added when it lies inside a source directory. The observer
/// is advanced by each file's size once its entry has been written.
pub fn create_archive(
    sources: &[PathBuf],
    archive: &Path,
    observer: &mut dyn StepObserver,
) -> TransferResult<()> {
    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
    }

    let file = File::create(archive).map_err(|e| TransferError::io(archive, e))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let output = Output {
        path: archive,
        canonical: fs::canonicalize(archive).unwrap_or_else(|_| archive.to_path_buf()),
        options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
    };

    for source in sources {
        observer.checkpoint()?;
        let name = file_name(source)?.to_string_lossy().into_owned();
        add_entry(&mut writer, source, &name, &output, observer)?;
    }

    let mut inner = writer.finish().map_err(|e| archive_error(archive, e))?;
    inner.flush().map_err(|e| TransferError::io(archive, e))?;
    Ok(())
}

/// The archive being written.
struct Output<'a> {
    path: &'a Path,
    canonical: PathBuf,
    options: SimpleFileOptions,
}

impl Output<'_> {
    fn is_self(&self, path: &Path) -> bool {
        fs::canonicalize(path).is_ok_and(|p| p == self.canonical)
    }
}

fn add_entry<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    path: &Path,
    entry_name: &str,
    output: &Output<'_>,
    observer: &mut dyn StepObserver,
) -> TransferResult<()> {
    if path.is_dir() {
        writer
            .add_directory(format!("{entry_name}/"), output.options)
            .map_err(|e| archive_error(output.path, e))?;

        for child in children(path)? {
            let child_name = format!("{entry_name}/{}", file_name(&child)?.to_string_lossy());
            add_entry(writer, &child, &child_name, output, observer)?;
        }
        return Ok(());
    }

    if output.is_self(path) {
        tracing::debug!(path = %path.display(), "skipping the archive being written");
        return Ok(());
    }

    let mut file = File::open(path).map_err(|e| TransferError::io(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| TransferError::io(path, e))?
        .len();

    writer
        .start_file(entry_name, output.options.large_file(size >= u64::from(u32::MAX)))
        .map_err(|e| archive_error(output.path, e))?;
    let written = io::copy(&mut file, writer).map_err(|e| TransferError::io(path, e))?;

    observer.advance(written);
    Ok(())
}

/// Extract every entry of every archive into `destination`.
///
/// The observer is checked before each archive is opened and advanced by
/// each entry's compressed size once the entry is on disk. Entries whose
/// names would escape `destination` fail the action.
pub fn extract_archives(
    archives: &[PathBuf],
    destination: &Path,
    observer: &mut dyn StepObserver,
) -> TransferResult<()> {
    fs::create_dir_all(destination).map_err(|e| TransferError::io(destination, e))?;

    for archive_path in archives {
        observer.checkpoint()?;
        extract_archive(archive_path, destination, observer)?;
    }
    Ok(())
}

fn extract_archive(
    archive_path: &Path,
    destination: &Path,
    observer: &mut dyn StepObserver,
) -> TransferResult<()> {
    let file = File::open(archive_path).map_err(|e| TransferError::io(archive_path, e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| archive_error(archive_path, e))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| archive_error(archive_path, e))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(TransferError::UnsafeArchiveEntry {
                name: entry.name().to_string(),
            });
        };
        let out = destination.join(relative);
        let weight = entry.compressed_size();

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| TransferError::io(&out, e))?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
            }
            let mut target = File::create(&out).map_err(|e| TransferError::io(&out, e))?;
            io::copy(&mut entry, &mut target).map_err(|e| TransferError::io(&out, e))?;
        }

        observer.advance(weight);
    }
    Ok(())
}

fn archive_error(path: &Path, error: zip::result::ZipError) -> TransferError {
    match error {
        zip::result::ZipError::Io(source) => TransferError::io(path, source),
        other => TransferError::Archive {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoopObserver;
    use tempfile::TempDir;

    struct CancelAfter(usize);

    impl StepObserver for CancelAfter {
        fn checkpoint(&mut self) -> TransferResult<()> {
            if self.0 == 0 {
                return Err(TransferError::Cancelled);
            }
            self.0 -= 1;
            Ok(())
        }

        fn advance(&mut self, _bytes: u64) {}
    }

    #[test]
    fn test_archive_keeps_empty_directories() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("empty")).unwrap();
        let zip_path = temp.path().join("out.zip");

        create_archive(&[src], &zip_path, &mut NoopObserver).unwrap();

        let out = temp.path().join("extracted");
        extract_archives(&[zip_path], &out, &mut NoopObserver).unwrap();
        assert!(out.join("src/empty").is_dir());
    }

    #[test]
    fn test_archive_inside_source_skips_itself() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.txt"), "a").unwrap();
        let zip_path = dir.join("z.zip");

        create_archive(&[dir.clone()], &zip_path, &mut NoopObserver).unwrap();

        let out = temp.path().join("extracted");
        extract_archives(&[zip_path], &out, &mut NoopObserver).unwrap();
        assert!(out.join("dir/a.txt").is_file());
        assert!(!out.join("dir/z.zip").exists());
    }

    #[test]
    fn test_extract_checks_before_each_archive() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "a").unwrap();
        let first = temp.path().join("first.zip");
        let second = temp.path().join("second.zip");
        create_archive(&[file.clone()], &first, &mut NoopObserver).unwrap();
        create_archive(&[file], &second, &mut NoopObserver).unwrap();

        let out = temp.path().join("out");
        let result = extract_archives(&[first, second], &out, &mut CancelAfter(1));

        assert!(matches!(result, Err(TransferError::Cancelled)));
        assert!(out.join("a.txt").exists());
    }

    #[test]
    fn test_extract_invalid_archive() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.zip");
        fs::write(&bogus, "not a zip").unwrap();

        let result = extract_archives(&[bogus], &temp.path().join("out"), &mut NoopObserver);
        assert!(matches!(result, Err(TransferError::Archive { .. })));
    }
}
