//! `OverlayFS` management for the container's copy-on-write root.
//!
//! A single read-only image tree is combined with one writable upper layer
//! per container. The merged directory becomes the container's root.

use std::path::{Path, PathBuf};

use minibox_common::constants::{MERGED_DIR, OVERLAY_DIR, UPPER_DIR, WORK_DIR};
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::ContainerId;
use nix::mount::MsFlags;

use crate::kernel::{Kernel, MountRequest};

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Read-only image tree.
    pub lower_dir: PathBuf,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayConfig {
    /// Lays out `<containers_dir>/overlay/<id>/{upper,work,merged}` on top
    /// of `lower_dir`.
    #[must_use]
    pub fn for_container(containers_dir: &Path, id: &ContainerId, lower_dir: &Path) -> Self {
        let base = containers_dir.join(OVERLAY_DIR).join(id.as_str());
        Self {
            lower_dir: lower_dir.to_path_buf(),
            upper_dir: base.join(UPPER_DIR),
            work_dir: base.join(WORK_DIR),
            merged_dir: base.join(MERGED_DIR),
        }
    }

    /// Returns the option string passed to the overlay driver.
    ///
    /// The driver's parser expects exactly this comma-separated form.
    #[must_use]
    pub fn mount_options(&self) -> String {
        format!(
            "lowerdir={},upperdir={},workdir={}",
            self.lower_dir.display(),
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }

    /// Creates the upper, work, and merged directories if they are absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.upper_dir, &self.work_dir, &self.merged_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| MiniboxError::io(dir, e))?;
            }
        }
        Ok(())
    }
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// Creates the layer directories first, then mounts with `MS_NODEV` so
/// device nodes written into the upper layer are never honoured.
///
/// # Errors
///
/// Returns an error if directory creation fails or if the mount is rejected.
pub fn mount_overlay(kernel: &dyn Kernel, config: &OverlayConfig) -> Result<()> {
    config.prepare()?;

    let request = MountRequest::filesystem("overlay", &config.merged_dir)
        .with_flags(MsFlags::MS_NODEV)
        .with_data(config.mount_options());
    kernel.mount(&request).map_err(|e| MiniboxError::Mount {
        fstype: "overlay".into(),
        target: config.merged_dir.clone(),
        source: e,
    })?;

    tracing::info!(merged = %config.merged_dir.display(), "overlayfs mounted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelOp, RecordingKernel};

    fn config(root: &Path) -> OverlayConfig {
        OverlayConfig::for_container(
            &root.join("containers"),
            &ContainerId::new("c1"),
            &root.join("images/ubuntu/rootfs"),
        )
    }

    #[test]
    fn layout_follows_container_id() {
        let cfg = config(Path::new("/w"));
        assert_eq!(cfg.upper_dir, Path::new("/w/containers/overlay/c1/upper"));
        assert_eq!(cfg.work_dir, Path::new("/w/containers/overlay/c1/work"));
        assert_eq!(cfg.merged_dir, Path::new("/w/containers/overlay/c1/merged"));
    }

    #[test]
    fn mount_options_are_exact() {
        let cfg = config(Path::new("/w"));
        assert_eq!(
            cfg.mount_options(),
            "lowerdir=/w/images/ubuntu/rootfs,upperdir=/w/containers/overlay/c1/upper,workdir=/w/containers/overlay/c1/work"
        );
    }

    #[test]
    fn prepare_is_idempotent_and_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        cfg.prepare().unwrap();
        std::fs::write(cfg.upper_dir.join("kept"), b"x").unwrap();
        cfg.prepare().unwrap();

        assert!(cfg.upper_dir.join("kept").exists());
        assert!(cfg.work_dir.is_dir());
        assert!(cfg.merged_dir.is_dir());
    }

    #[test]
    fn mount_overlay_issues_nodev_overlay_mount() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let kernel = RecordingKernel::new();

        mount_overlay(&kernel, &cfg).unwrap();

        let ops = kernel.ops();
        assert_eq!(ops.len(), 1);
        let KernelOp::Mount(request) = &ops[0] else {
            panic!("expected a mount, got {ops:?}");
        };
        assert_eq!(request.fstype.as_deref(), Some("overlay"));
        assert_eq!(request.target, cfg.merged_dir);
        assert_eq!(request.flags, MsFlags::MS_NODEV);
        assert_eq!(request.data.as_deref(), Some(cfg.mount_options().as_str()));
    }

    #[test]
    fn rejected_mount_is_a_mount_error() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = RecordingKernel::failing_on(|_| true);

        let err = mount_overlay(&kernel, &config(dir.path())).unwrap_err();
        assert!(matches!(err, MiniboxError::Mount { ref fstype, .. } if fstype == "overlay"));
    }
}
