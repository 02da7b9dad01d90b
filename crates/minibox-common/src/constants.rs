//! System-wide constants and default paths.

/// Default directory holding image archives and their extracted trees.
pub const DEFAULT_IMAGES_DIR: &str = "/var/lib/minibox/images";
/// Default directory holding per-container writable layers.
pub const DEFAULT_CONTAINERS_DIR: &str = "/var/lib/minibox/containers";
/// Image used when none is requested.
pub const DEFAULT_IMAGE_NAME: &str = "ubuntu";

/// Archive extension looked up first for an image.
pub const IMAGE_ARCHIVE_SUFFIX: &str = "tar";
/// Gzip-compressed archive extensions tried when the plain archive is absent.
pub const COMPRESSED_ARCHIVE_SUFFIXES: &[&str] = &["tar.gz", "tgz"];
/// Directory under an image's cache holding the extracted tree.
pub const IMAGE_ROOTFS_DIR: &str = "rootfs";
/// Staging directory used while an image is being extracted.
pub const IMAGE_STAGING_DIR: &str = "rootfs.partial";

/// Directory under the containers directory holding overlay layers.
pub const OVERLAY_DIR: &str = "overlay";
/// Writable layer of a container.
pub const UPPER_DIR: &str = "upper";
/// Scratch directory required by overlayfs.
pub const WORK_DIR: &str = "work";
/// Merged view that becomes the container root.
pub const MERGED_DIR: &str = "merged";
/// Directory inside the new root receiving the old root during `pivot_root`.
pub const OLD_ROOT_DIR: &str = "old_root";
