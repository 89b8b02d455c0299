//! Formatting helpers for status messages.

use std::path::Path;

use crate::SizeFormat;

/// Format a byte count for display.
pub fn format_size(bytes: u64, format: SizeFormat) -> String {
    match format {
        SizeFormat::Binary => humansize::format_size(bytes, humansize::BINARY),
        SizeFormat::Decimal => humansize::format_size(bytes, humansize::DECIMAL),
    }
}

/// Join the file names of `paths`, cutting the result at `max_chars`.
pub fn summarize_names<P: AsRef<Path>>(paths: &[P], max_chars: usize) -> String {
    let joined = paths
        .iter()
        .map(|p| {
            p.as_ref()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.as_ref().display().to_string())
        })
        .collect::<Vec<_>>()
        .join(", ");

    if joined.chars().count() > max_chars {
        let cut: String = joined.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        joined
    }
}
