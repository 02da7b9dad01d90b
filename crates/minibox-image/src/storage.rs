//! Local storage of images.
//!
//! The images directory holds one archive per image (`<name>.tar`) and, once
//! the image has been used, its extracted tree at `<name>/rootfs`:
//!
//! ```text
//! images/
//!   ubuntu.tar
//!   ubuntu/rootfs/...
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use minibox_common::constants::{
    COMPRESSED_ARCHIVE_SUFFIXES, IMAGE_ARCHIVE_SUFFIX, IMAGE_ROOTFS_DIR, IMAGE_STAGING_DIR,
};
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::ImageName;

/// An image archive found in the images directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Image name.
    pub name: ImageName,
    /// Archive backing the image.
    pub archive: PathBuf,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Whether the extracted tree exists.
    pub materialized: bool,
}

/// Manages the images directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    /// Root directory for archives and extracted trees.
    root: PathBuf,
}

impl ImageStore {
    /// Opens the image store rooted at the given directory.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        tracing::debug!(path = %root.display(), "opening image store");
        Self { root }
    }

    /// Returns the root storage path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the archive backing `name`, preferring `<name>.tar` over the
    /// gzip-compressed variants. `None` if no archive exists.
    #[must_use]
    pub fn archive_path(&self, name: &ImageName) -> Option<PathBuf> {
        std::iter::once(IMAGE_ARCHIVE_SUFFIX)
            .chain(COMPRESSED_ARCHIVE_SUFFIXES.iter().copied())
            .map(|suffix| self.root.join(format!("{name}.{suffix}")))
            .find(|path| path.is_file())
    }

    /// Returns the path of the extracted tree of `name`.
    #[must_use]
    pub fn rootfs_path(&self, name: &ImageName) -> PathBuf {
        self.root.join(name.as_str()).join(IMAGE_ROOTFS_DIR)
    }

    /// Checks whether `name` has already been extracted.
    #[must_use]
    pub fn is_materialized(&self, name: &ImageName) -> bool {
        self.rootfs_path(name).exists()
    }

    /// Ensures the extracted tree of `name` exists and returns its path.
    ///
    /// The archive is extracted only when the tree does not exist yet; later
    /// calls touch nothing on disk. Extraction goes through a staging
    /// directory that is renamed into place once complete, so an interrupted
    /// extraction is never mistaken for a finished one.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::ImageNotFound`] if no archive exists, and
    /// [`MiniboxError::Extraction`] or [`MiniboxError::Io`] if extraction
    /// fails.
    pub fn materialize(&self, name: &ImageName) -> Result<PathBuf> {
        let archive = self
            .archive_path(name)
            .ok_or_else(|| MiniboxError::ImageNotFound {
                name: name.to_string(),
                path: self.root.join(format!("{name}.{IMAGE_ARCHIVE_SUFFIX}")),
            })?;

        let rootfs = self.rootfs_path(name);
        if rootfs.exists() {
            tracing::debug!(image = %name, rootfs = %rootfs.display(), "image already materialized");
            return Ok(rootfs);
        }

        let staging = self.root.join(name.as_str()).join(IMAGE_STAGING_DIR);
        if staging.exists() {
            tracing::warn!(path = %staging.display(), "removing interrupted extraction");
            std::fs::remove_dir_all(&staging).map_err(|e| MiniboxError::io(&staging, e))?;
        }

        let _ = crate::layer::extract_layer(&archive, &staging)?;
        std::fs::rename(&staging, &rootfs).map_err(|e| MiniboxError::io(&rootfs, e))?;

        tracing::info!(image = %name, rootfs = %rootfs.display(), "image materialized");
        Ok(rootfs)
    }

    /// Lists every image with an archive in the store, sorted by name.
    ///
    /// Files whose names are not valid image names are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the images directory cannot be read.
    pub fn list(&self) -> Result<Vec<ImageEntry>> {
        let read_dir = std::fs::read_dir(&self.root).map_err(|e| MiniboxError::io(&self.root, e))?;

        let mut names = BTreeSet::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| MiniboxError::io(&self.root, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let stem = std::iter::once(IMAGE_ARCHIVE_SUFFIX)
                .chain(COMPRESSED_ARCHIVE_SUFFIXES.iter().copied())
                .find_map(|suffix| file_name.strip_suffix(suffix)?.strip_suffix('.'));
            if let Some(name) = stem.and_then(|stem| ImageName::parse(stem).ok()) {
                let _ = names.insert(name);
            }
        }

        let mut images = Vec::with_capacity(names.len());
        for name in names {
            let Some(archive) = self.archive_path(&name) else {
                continue;
            };
            let size_bytes = std::fs::metadata(&archive)
                .map_err(|e| MiniboxError::io(&archive, e))?
                .len();
            images.push(ImageEntry {
                materialized: self.is_materialized(&name),
                name,
                archive,
                size_bytes,
            });
        }
        Ok(images)
    }
}
