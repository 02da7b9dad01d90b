//! [`Kernel`] backed by real Linux syscalls.

use std::convert::Infallible;
use std::ffi::CString;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use nix::mount::{MntFlags, umount2};
use nix::sched::{CloneFlags, unshare};
use nix::sys::stat::{Mode, SFlag, makedev, mknod};

use super::{Kernel, MountRequest};

/// Issues every operation against the running kernel.
///
/// Most operations require `CAP_SYS_ADMIN` (mounts, `pivot_root`) or
/// `CAP_MKNOD` (device nodes).
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxKernel;

impl LinuxKernel {
    /// Creates a new Linux kernel handle.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Kernel for LinuxKernel {
    fn unshare_mount_namespace(&self) -> io::Result<()> {
        unshare(CloneFlags::CLONE_NEWNS)?;
        Ok(())
    }

    fn mount(&self, request: &MountRequest) -> io::Result<()> {
        tracing::debug!(%request, "mount");
        nix::mount::mount(
            request.source.as_deref(),
            request.target.as_path(),
            request.fstype.as_deref(),
            request.flags,
            request.data.as_deref(),
        )?;
        Ok(())
    }

    fn unmount_detach(&self, target: &Path) -> io::Result<()> {
        umount2(target, MntFlags::MNT_DETACH)?;
        Ok(())
    }

    fn mknod_char(&self, path: &Path, mode: u32, major: u64, minor: u64) -> io::Result<()> {
        mknod(
            path,
            SFlag::S_IFCHR,
            Mode::from_bits_truncate(mode),
            makedev(major, minor),
        )?;
        // mknod applies the umask
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
    }

    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(original, link)
    }

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> io::Result<()> {
        nix::unistd::pivot_root(new_root, put_old)?;
        Ok(())
    }

    fn chdir(&self, path: &Path) -> io::Result<()> {
        nix::unistd::chdir(path)?;
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(path)
    }

    fn exec(&self, command: &[String]) -> io::Result<Infallible> {
        let args = command
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let program = args
            .first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        tracing::debug!(program = %command[0], "exec");
        Ok(nix::unistd::execvp(program, &args)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_rejects_empty_command() {
        let err = LinuxKernel::new().exec(&[]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn exec_rejects_interior_nul() {
        let err = LinuxKernel::new()
            .exec(&["/bin/tr\0ue".to_owned()])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn symlink_and_remove_dir_operate_on_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = LinuxKernel::new();

        let link = dir.path().join("stdin");
        kernel.symlink(Path::new("/proc/self/fd/0"), &link).unwrap();
        assert_eq!(std::fs::read_link(&link).unwrap(), Path::new("/proc/self/fd/0"));

        let empty = dir.path().join("old_root");
        std::fs::create_dir(&empty).unwrap();
        kernel.remove_dir(&empty).unwrap();
        assert!(!empty.exists());
    }
}
