//! [`Kernel`] that records operations instead of performing them.

use std::cell::RefCell;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::path::Path;

use super::{Kernel, KernelOp, MountRequest};

type FailurePredicate = Box<dyn Fn(&KernelOp) -> bool>;

/// Records every operation in call order and performs none of them.
///
/// `exec` is recorded and then fails with [`io::ErrorKind::Unsupported`],
/// since the calling process cannot actually be replaced. A failure can be
/// injected for any operation with [`RecordingKernel::failing_on`].
#[derive(Default)]
pub struct RecordingKernel {
    ops: RefCell<Vec<KernelOp>>,
    fail_on: Option<FailurePredicate>,
}

impl RecordingKernel {
    /// Creates a kernel that accepts every operation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a kernel whose operations fail with `EPERM` when `predicate`
    /// matches them. Failed operations are still recorded.
    #[must_use]
    pub fn failing_on(predicate: impl Fn(&KernelOp) -> bool + 'static) -> Self {
        Self {
            ops: RefCell::default(),
            fail_on: Some(Box::new(predicate)),
        }
    }

    /// Returns the operations recorded so far.
    #[must_use]
    pub fn ops(&self) -> Vec<KernelOp> {
        self.ops.borrow().clone()
    }

    fn record(&self, op: KernelOp) -> io::Result<()> {
        let fails = self.fail_on.as_ref().is_some_and(|predicate| predicate(&op));
        self.ops.borrow_mut().push(op);
        if fails {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(())
    }
}

impl fmt::Debug for RecordingKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingKernel")
            .field("ops", &self.ops.borrow())
            .field("fail_on", &self.fail_on.is_some())
            .finish()
    }
}

impl Kernel for RecordingKernel {
    fn unshare_mount_namespace(&self) -> io::Result<()> {
        self.record(KernelOp::UnshareMountNamespace)
    }

    fn mount(&self, request: &MountRequest) -> io::Result<()> {
        self.record(KernelOp::Mount(request.clone()))
    }

    fn unmount_detach(&self, target: &Path) -> io::Result<()> {
        self.record(KernelOp::UnmountDetach {
            target: target.to_path_buf(),
        })
    }

    fn mknod_char(&self, path: &Path, mode: u32, major: u64, minor: u64) -> io::Result<()> {
        self.record(KernelOp::MknodChar {
            path: path.to_path_buf(),
            mode,
            major,
            minor,
        })
    }

    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()> {
        self.record(KernelOp::Symlink {
            original: original.to_path_buf(),
            link: link.to_path_buf(),
        })
    }

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> io::Result<()> {
        self.record(KernelOp::PivotRoot {
            new_root: new_root.to_path_buf(),
            put_old: put_old.to_path_buf(),
        })
    }

    fn chdir(&self, path: &Path) -> io::Result<()> {
        self.record(KernelOp::Chdir {
            path: path.to_path_buf(),
        })
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.record(KernelOp::RemoveDir {
            path: path.to_path_buf(),
        })
    }

    fn exec(&self, command: &[String]) -> io::Result<Infallible> {
        self.record(KernelOp::Exec {
            command: command.to_vec(),
        })?;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "exec is not performed by the recording kernel",
        ))
    }
}
