//! Root filesystem switching via `pivot_root(2)`.
//!
//! Unlike `chroot`, this replaces the root mount of the namespace, so once
//! the old root is detached nothing of the host filesystem stays reachable.

use std::path::{Path, PathBuf};

use minibox_common::constants::OLD_ROOT_DIR;
use minibox_common::error::{MiniboxError, Result};

use crate::kernel::Kernel;

/// Creates the directory inside `new_root` that will receive the old root.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn prepare_put_old(new_root: &Path) -> Result<PathBuf> {
    let put_old = new_root.join(OLD_ROOT_DIR);
    std::fs::create_dir_all(&put_old).map_err(|e| MiniboxError::io(&put_old, e))?;
    Ok(put_old)
}

/// Makes `new_root` the root mount, moving the old root to `put_old`.
///
/// # Errors
///
/// Returns [`MiniboxError::Pivot`] if `pivot_root(2)` fails.
pub fn pivot_root(kernel: &dyn Kernel, new_root: &Path, put_old: &Path) -> Result<()> {
    kernel
        .pivot_root(new_root, put_old)
        .map_err(|e| MiniboxError::Pivot {
            new_root: new_root.to_path_buf(),
            source: e,
        })?;
    tracing::info!(new_root = %new_root.display(), "root pivoted");
    Ok(())
}

/// Moves the working directory onto the new root.
///
/// # Errors
///
/// Returns [`MiniboxError::Pivot`] if `chdir(2)` fails.
pub fn enter_new_root(kernel: &dyn Kernel) -> Result<()> {
    kernel.chdir(Path::new("/")).map_err(|e| MiniboxError::Pivot {
        new_root: PathBuf::from("/"),
        source: e,
    })
}

/// Lazily unmounts `/old_root` and removes its directory.
///
/// Must run after [`pivot_root`] and [`enter_new_root`]. The detach lets the
/// unmount succeed even while something still references the old root.
///
/// # Errors
///
/// Returns [`MiniboxError::Pivot`] if the unmount or the removal fails.
pub fn detach_old_root(kernel: &dyn Kernel) -> Result<()> {
    let old_root = Path::new("/").join(OLD_ROOT_DIR);
    let pivot_err = |e| MiniboxError::Pivot {
        new_root: PathBuf::from("/"),
        source: e,
    };
    kernel.unmount_detach(&old_root).map_err(pivot_err)?;
    kernel.remove_dir(&old_root).map_err(pivot_err)?;
    tracing::debug!(path = %old_root.display(), "old root detached");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelOp, RecordingKernel};

    #[test]
    fn prepare_put_old_creates_old_root_inside_new_root() {
        let dir = tempfile::tempdir().unwrap();
        let put_old = prepare_put_old(dir.path()).unwrap();
        assert_eq!(put_old, dir.path().join("old_root"));
        assert!(put_old.is_dir());
    }

    #[test]
    fn switch_sequence_detaches_then_removes_old_root() {
        let kernel = RecordingKernel::new();
        pivot_root(&kernel, Path::new("/m"), Path::new("/m/old_root")).unwrap();
        enter_new_root(&kernel).unwrap();
        detach_old_root(&kernel).unwrap();

        assert_eq!(
            kernel.ops(),
            vec![
                KernelOp::PivotRoot {
                    new_root: PathBuf::from("/m"),
                    put_old: PathBuf::from("/m/old_root"),
                },
                KernelOp::Chdir {
                    path: PathBuf::from("/")
                },
                KernelOp::UnmountDetach {
                    target: PathBuf::from("/old_root")
                },
                KernelOp::RemoveDir {
                    path: PathBuf::from("/old_root")
                },
            ]
        );
    }

    #[test]
    fn failed_unmount_keeps_old_root_directory() {
        let kernel =
            RecordingKernel::failing_on(|op| matches!(op, KernelOp::UnmountDetach { .. }));
        let err = detach_old_root(&kernel).unwrap_err();

        assert!(matches!(err, MiniboxError::Pivot { .. }));
        assert_eq!(kernel.ops().len(), 1);
    }
}
