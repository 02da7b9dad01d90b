//! Image layer extraction.
//!
//! An image is a single tar archive. Extraction drops character and block
//! device entries: an image may legitimately ship them, but creating them
//! is a privileged operation that the container's own tmpfs `/dev` makes
//! unnecessary. The drop is silent and intentional.

use std::io::Read;
use std::path::Path;

use minibox_common::error::{MiniboxError, Result};
use tar::EntryType;

/// Summary of an extracted layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerStats {
    /// Entries written to disk.
    pub unpacked: u64,
    /// Character and block device entries that were dropped.
    pub skipped_devices: u64,
    /// Size of the archive in bytes.
    pub size_bytes: u64,
}

/// Extracts a tar archive to the target directory, dropping device entries.
///
/// Supports both plain `.tar` and gzip-compressed `.tar.gz` / `.tgz` archives.
///
/// # Errors
///
/// Returns [`MiniboxError::Io`] if `target` cannot be created and
/// [`MiniboxError::Extraction`] if the archive cannot be read or unpacked.
pub fn extract_layer(archive_path: &Path, target: &Path) -> Result<LayerStats> {
    tracing::info!(
        archive = %archive_path.display(),
        target = %target.display(),
        "extracting layer"
    );

    std::fs::create_dir_all(target).map_err(|e| MiniboxError::io(target, e))?;

    let extraction_err = |e| MiniboxError::Extraction {
        archive: archive_path.to_path_buf(),
        source: e,
    };
    let file = std::fs::File::open(archive_path).map_err(extraction_err)?;
    let size_bytes = file.metadata().map_err(extraction_err)?.len();

    let unpacked = if is_gzip_archive(archive_path) {
        unpack_filtered(flate2::read::GzDecoder::new(file), target)
    } else {
        unpack_filtered(file, target)
    };
    let mut stats = unpacked.map_err(extraction_err)?;
    stats.size_bytes = size_bytes;

    tracing::info!(
        unpacked = stats.unpacked,
        skipped_devices = stats.skipped_devices,
        size = size_bytes,
        "layer extracted"
    );
    Ok(stats)
}

fn unpack_filtered<R: Read>(reader: R, target: &Path) -> std::io::Result<LayerStats> {
    let mut archive = tar::Archive::new(reader);
    let mut stats = LayerStats::default();
    let mut directories = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        match kind {
            _ if is_device(kind) => {
                tracing::debug!(path = %entry.path()?.display(), "dropping device entry");
                stats.skipped_devices += 1;
            }
            // a read-only directory must not be applied before its children
            EntryType::Directory => directories.push(entry),
            _ => {
                if entry.unpack_in(target)? {
                    stats.unpacked += 1;
                }
            }
        }
    }

    // deepest first, so a parent's mode is applied after its subdirectories
    directories.sort_by(|a, b| b.path_bytes().cmp(&a.path_bytes()));
    for mut dir in directories {
        if dir.unpack_in(target)? {
            stats.unpacked += 1;
        }
    }
    Ok(stats)
}

const fn is_device(kind: EntryType) -> bool {
    matches!(kind, EntryType::Char | EntryType::Block)
}

/// Determines whether the archive is gzip-compressed based on extension.
pub(crate) fn is_gzip_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("tgz"))
}
