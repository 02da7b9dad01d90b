//! Layered root construction.
//!
//! Materializes the image and mounts the container's overlay on top of it.

use std::path::PathBuf;

use minibox_common::config::RuntimeConfig;
use minibox_common::error::Result;
use minibox_common::types::ContainerId;
use minibox_core::filesystem::overlayfs::{self, OverlayConfig};
use minibox_core::kernel::Kernel;
use minibox_image::storage::ImageStore;

/// Builds the root of container `id` and returns the merged directory.
///
/// The image named by `config` is extracted on first use, then the
/// container's `upper`, `work`, and `merged` directories are created if
/// absent and the overlay is mounted at `merged`.
///
/// # Errors
///
/// Returns an error if the image cannot be materialized, a directory cannot
/// be created, or the overlay mount is rejected.
pub fn build_root(kernel: &dyn Kernel, config: &RuntimeConfig, id: &ContainerId) -> Result<PathBuf> {
    let images = ImageStore::open(&config.images_dir);
    let image_root = images.materialize(&config.image_name)?;

    let overlay = OverlayConfig::for_container(&config.containers_dir, id, &image_root);
    overlayfs::mount_overlay(kernel, &overlay)?;

    tracing::info!(
        id = %id,
        image = %config.image_name,
        merged = %overlay.merged_dir.display(),
        "container root built"
    );
    Ok(overlay.merged_dir)
}
