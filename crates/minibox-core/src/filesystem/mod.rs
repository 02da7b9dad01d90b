//! Filesystem management for container isolation.
//!
//! Provides `OverlayFS` root construction, pseudo-filesystem and device
//! population, and `pivot_root` for switching into the new root.

pub mod devices;
pub mod mount;
pub mod overlayfs;
pub mod pivot_root;

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};

use crate::kernel::Kernel;

/// Populates a container root with `/proc`, `/sys`, `/dev`, `/dev/pts`,
/// the descriptor symlinks, and the standard device nodes.
///
/// Nothing is rolled back on failure; the caller abandons the whole
/// containment attempt instead.
///
/// # Errors
///
/// Returns [`MiniboxError::Populate`] wrapping the first failure.
pub fn populate_root(kernel: &dyn Kernel, root: &Path) -> Result<()> {
    mount::mount_essential_filesystems(kernel, root)
        .and_then(|()| devices::populate_dev(kernel, &root.join("dev")))
        .map_err(|e| MiniboxError::Populate {
            root: root.to_path_buf(),
            source: Box::new(e),
        })?;
    tracing::info!(root = %root.display(), "root environment populated");
    Ok(())
}
