//! Pseudo-filesystem mounts for the container root.
//!
//! Mounts `/proc`, `/sys`, a fresh tmpfs `/dev`, and `/dev/pts` inside the
//! new root before it is pivoted into place.

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};
use nix::mount::MsFlags;

use crate::kernel::{Kernel, MountRequest};

fn mount(kernel: &dyn Kernel, request: &MountRequest) -> Result<()> {
    tracing::debug!(%request, "mounting pseudo-filesystem");
    kernel.mount(request).map_err(|e| MiniboxError::Mount {
        fstype: request.fstype.clone().unwrap_or_default(),
        target: request.target.clone(),
        source: e,
    })
}

/// Mounts `proc`, `sysfs`, and a `tmpfs` `/dev` under `root`, then
/// `devpts` at `dev/pts` if that directory did not exist yet.
///
/// # Errors
///
/// Returns [`MiniboxError::Mount`] if any mount is rejected, or
/// [`MiniboxError::Io`] if `dev/pts` cannot be created.
pub fn mount_essential_filesystems(kernel: &dyn Kernel, root: &Path) -> Result<()> {
    mount(kernel, &MountRequest::filesystem("proc", root.join("proc")))?;
    mount(kernel, &MountRequest::filesystem("sysfs", root.join("sys")))?;
    mount(
        kernel,
        &MountRequest::filesystem("tmpfs", root.join("dev"))
            .with_flags(MsFlags::MS_NOSUID | MsFlags::MS_STRICTATIME)
            .with_data("mode=755"),
    )?;

    let devpts = root.join("dev").join("pts");
    if !devpts.exists() {
        std::fs::create_dir_all(&devpts).map_err(|e| MiniboxError::io(&devpts, e))?;
        mount(kernel, &MountRequest::filesystem("devpts", &devpts))?;
    }
    Ok(())
}
