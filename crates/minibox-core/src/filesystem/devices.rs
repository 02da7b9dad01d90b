//! The minimal `/dev` a program expects to find.

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};

use crate::kernel::Kernel;

/// A character device node created in the container's `/dev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceNode {
    /// File name under `/dev`.
    pub name: &'static str,
    /// Kernel-assigned major number.
    pub major: u64,
    /// Kernel-assigned minor number.
    pub minor: u64,
}

impl DeviceNode {
    const fn new(name: &'static str, major: u64, minor: u64) -> Self {
        Self { name, major, minor }
    }
}

/// Permission bits of every created device node.
pub const DEVICE_MODE: u32 = 0o666;

/// Device nodes with their standard kernel (major, minor) assignments.
pub const DEVICES: [DeviceNode; 7] = [
    DeviceNode::new("null", 1, 3),
    DeviceNode::new("zero", 1, 5),
    DeviceNode::new("random", 1, 8),
    DeviceNode::new("urandom", 1, 9),
    DeviceNode::new("console", 136, 1),
    DeviceNode::new("tty", 5, 0),
    DeviceNode::new("full", 1, 7),
];

/// Symlinks from standard stream devices to the process's own descriptors.
pub const FD_LINKS: [(&str, &str); 4] = [
    ("stdin", "/proc/self/fd/0"),
    ("stdout", "/proc/self/fd/1"),
    ("stderr", "/proc/self/fd/2"),
    ("fd", "/proc/self/fd"),
];

/// Creates the descriptor symlinks and device nodes in `dev_dir`.
///
/// # Errors
///
/// Returns [`MiniboxError::DeviceCreation`] for the first entry that cannot
/// be created. Entries created before it are left in place.
pub fn populate_dev(kernel: &dyn Kernel, dev_dir: &Path) -> Result<()> {
    for (name, target) in FD_LINKS {
        let link = dev_dir.join(name);
        kernel
            .symlink(Path::new(target), &link)
            .map_err(|e| MiniboxError::DeviceCreation { path: link, source: e })?;
    }

    for device in DEVICES {
        let path = dev_dir.join(device.name);
        tracing::debug!(
            path = %path.display(),
            major = device.major,
            minor = device.minor,
            "creating device node"
        );
        kernel
            .mknod_char(&path, DEVICE_MODE, device.major, device.minor)
            .map_err(|e| MiniboxError::DeviceCreation { path, source: e })?;
    }
    Ok(())
}
