//! Mount namespace isolation.
//!
//! Gives the container its own mount table, enabling private filesystem views.

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};
use nix::mount::MsFlags;

use crate::kernel::{Kernel, MountRequest};

/// Moves the calling process into a new mount namespace.
///
/// # Errors
///
/// Returns [`MiniboxError::Namespace`] if `unshare(CLONE_NEWNS)` fails.
pub fn create_mount_namespace(kernel: &dyn Kernel) -> Result<()> {
    tracing::debug!("creating mount namespace");
    kernel
        .unshare_mount_namespace()
        .map_err(|e| MiniboxError::Namespace {
            operation: "unshare(CLONE_NEWNS)",
            source: e,
        })
}

/// Marks every mount under `/` private, recursively, so mount events no
/// longer propagate between this namespace and the host.
///
/// # Errors
///
/// Returns [`MiniboxError::Namespace`] if the propagation change fails.
pub fn make_mounts_private(kernel: &dyn Kernel) -> Result<()> {
    let request = MountRequest::propagation(Path::new("/"), MsFlags::MS_PRIVATE | MsFlags::MS_REC);
    kernel.mount(&request).map_err(|e| MiniboxError::Namespace {
        operation: "mount --make-rprivate /",
        source: e,
    })?;
    tracing::debug!("mount propagation set to private");
    Ok(())
}
