//! The privileged OS context.
//!
//! Every operation that mutates process-wide kernel state (namespaces,
//! mounts, device nodes, the root directory, the process image) goes through
//! the [`Kernel`] trait. [`LinuxKernel`] issues the real syscalls;
//! [`RecordingKernel`] only records them, which is what the tests and the
//! `plan` command use.
//!
//! Implementations return raw [`std::io::Error`]s. Classifying a failure
//! into a domain error is the caller's job, since only the caller knows
//! which step of the sequence failed.

mod linux;
mod recording;

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use nix::mount::MsFlags;

pub use linux::LinuxKernel;
pub use recording::RecordingKernel;

/// Arguments of a single `mount(2)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// Mount source, `None` for propagation changes.
    pub source: Option<String>,
    /// Mount point.
    pub target: PathBuf,
    /// Filesystem type, `None` for propagation changes.
    pub fstype: Option<String>,
    /// Mount flags.
    pub flags: MsFlags,
    /// Filesystem-specific option string.
    pub data: Option<String>,
}

impl MountRequest {
    /// Mounts a filesystem of type `fstype` whose source is named after it,
    /// as pseudo-filesystems conventionally are.
    #[must_use]
    pub fn filesystem(fstype: &str, target: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(fstype.to_owned()),
            target: target.into(),
            fstype: Some(fstype.to_owned()),
            flags: MsFlags::empty(),
            data: None,
        }
    }

    /// Changes the propagation type of an existing mount.
    #[must_use]
    pub fn propagation(target: impl Into<PathBuf>, flags: MsFlags) -> Self {
        Self {
            source: None,
            target: target.into(),
            fstype: None,
            flags,
            data: None,
        }
    }

    /// Sets the mount flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: MsFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the filesystem-specific option string.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

impl fmt::Display for MountRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mount {} on {} type {} flags {:?}",
            self.source.as_deref().unwrap_or("none"),
            self.target.display(),
            self.fstype.as_deref().unwrap_or("none"),
            self.flags,
        )?;
        if let Some(data) = &self.data {
            write!(f, " data {data}")?;
        }
        Ok(())
    }
}

/// Syscall-level operations minibox performs on the running kernel.
pub trait Kernel {
    /// Moves the calling process into a new mount namespace.
    ///
    /// # Errors
    ///
    /// Returns the OS error of `unshare(CLONE_NEWNS)`.
    fn unshare_mount_namespace(&self) -> io::Result<()>;

    /// Issues a `mount(2)` call.
    ///
    /// # Errors
    ///
    /// Returns the OS error of `mount(2)`.
    fn mount(&self, request: &MountRequest) -> io::Result<()>;

    /// Lazily detaches the mount at `target` (`MNT_DETACH`).
    ///
    /// # Errors
    ///
    /// Returns the OS error of `umount2(2)`.
    fn unmount_detach(&self, target: &Path) -> io::Result<()>;

    /// Creates a character device node with exactly the given permission bits.
    ///
    /// # Errors
    ///
    /// Returns the OS error of `mknod(2)` or of applying the mode.
    fn mknod_char(&self, path: &Path, mode: u32, major: u64, minor: u64) -> io::Result<()>;

    /// Creates a symbolic link at `link` pointing to `original`.
    ///
    /// # Errors
    ///
    /// Returns the OS error of `symlink(2)`.
    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()>;

    /// Makes `new_root` the root mount, moving the old root to `put_old`.
    ///
    /// # Errors
    ///
    /// Returns the OS error of `pivot_root(2)`.
    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> io::Result<()>;

    /// Changes the working directory.
    ///
    /// # Errors
    ///
    /// Returns the OS error of `chdir(2)`.
    fn chdir(&self, path: &Path) -> io::Result<()>;

    /// Removes an empty directory.
    ///
    /// # Errors
    ///
    /// Returns the OS error of `rmdir(2)`.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// Replaces the process image with `command`, searching `PATH` for
    /// `command[0]`. Only ever returns on failure.
    ///
    /// # Errors
    ///
    /// Returns the OS error of `execvp(3)`, or `InvalidInput` if the command
    /// is empty or contains a NUL byte.
    fn exec(&self, command: &[String]) -> io::Result<Infallible>;
}

/// One recorded kernel operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelOp {
    /// `unshare(CLONE_NEWNS)`.
    UnshareMountNamespace,
    /// `mount(2)`.
    Mount(MountRequest),
    /// `umount2(target, MNT_DETACH)`.
    UnmountDetach {
        /// Detached mount point.
        target: PathBuf,
    },
    /// `mknod(2)` of a character device.
    MknodChar {
        /// Device path.
        path: PathBuf,
        /// Permission bits.
        mode: u32,
        /// Device major number.
        major: u64,
        /// Device minor number.
        minor: u64,
    },
    /// `symlink(2)`.
    Symlink {
        /// Link target.
        original: PathBuf,
        /// Link path.
        link: PathBuf,
    },
    /// `pivot_root(2)`.
    PivotRoot {
        /// New root mount.
        new_root: PathBuf,
        /// Where the old root lands.
        put_old: PathBuf,
    },
    /// `chdir(2)`.
    Chdir {
        /// New working directory.
        path: PathBuf,
    },
    /// `rmdir(2)`.
    RemoveDir {
        /// Removed directory.
        path: PathBuf,
    },
    /// `execvp(3)`.
    Exec {
        /// Program and arguments.
        command: Vec<String>,
    },
}

impl fmt::Display for KernelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnshareMountNamespace => f.write_str("unshare CLONE_NEWNS"),
            Self::Mount(request) => fmt::Display::fmt(request, f),
            Self::UnmountDetach { target } => write!(f, "umount {} (detach)", target.display()),
            Self::MknodChar {
                path,
                mode,
                major,
                minor,
            } => write!(f, "mknod {} c {major} {minor} mode {mode:o}", path.display()),
            Self::Symlink { original, link } => {
                write!(f, "symlink {} -> {}", link.display(), original.display())
            }
            Self::PivotRoot { new_root, put_old } => write!(
                f,
                "pivot_root {} (old root at {})",
                new_root.display(),
                put_old.display()
            ),
            Self::Chdir { path } => write!(f, "chdir {}", path.display()),
            Self::RemoveDir { path } => write!(f, "rmdir {}", path.display()),
            Self::Exec { command } => write!(f, "exec {}", command.join(" ")),
        }
    }
}
