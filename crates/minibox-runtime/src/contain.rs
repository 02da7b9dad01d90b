//! The containment sequence run by the child process.
//!
//! The steps run in a fixed order. Nothing is mounted before the namespace
//! is private, and the target program starts only once the old root is
//! gone. A failed step aborts the sequence without undoing earlier ones; the
//! process exits and its namespace goes with it.

use std::convert::Infallible;

use minibox_common::config::RuntimeConfig;
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::{ContainerId, ContainmentStep};
use minibox_core::filesystem::{self, pivot_root};
use minibox_core::kernel::{Kernel, KernelOp, RecordingKernel};
use minibox_core::namespace::mount as mount_ns;

use crate::rootfs;

/// What to run, and where.
#[derive(Debug, Clone, Copy)]
pub struct ContainmentRequest<'a> {
    /// Program and arguments. `command[0]` is looked up on the new root's `PATH`.
    pub command: &'a [String],
    /// Image and storage locations.
    pub config: &'a RuntimeConfig,
    /// Identifier of the container's writable layer.
    pub container_id: &'a ContainerId,
}

/// Isolates the calling process and replaces it with the target program.
///
/// On success this never returns. The returned error names the step that
/// failed and carries the OS error that caused it.
///
/// # Errors
///
/// Returns [`MiniboxError::Containment`] for the first failing step.
pub fn enter_container(kernel: &dyn Kernel, request: &ContainmentRequest<'_>) -> Result<Infallible> {
    step(ContainmentStep::Unshare, || mount_ns::create_mount_namespace(kernel))?;
    step(ContainmentStep::IsolatePropagation, || {
        mount_ns::make_mounts_private(kernel)
    })?;

    let root = step(ContainmentStep::BuildRoot, || {
        rootfs::build_root(kernel, request.config, request.container_id)
    })?;
    step(ContainmentStep::Populate, || filesystem::populate_root(kernel, &root))?;

    let put_old = step(ContainmentStep::PrepareSwitch, || pivot_root::prepare_put_old(&root))?;
    step(ContainmentStep::Pivot, || pivot_root::pivot_root(kernel, &root, &put_old))?;
    step(ContainmentStep::Chdir, || pivot_root::enter_new_root(kernel))?;
    step(ContainmentStep::DetachOldRoot, || pivot_root::detach_old_root(kernel))?;

    tracing::debug!(command = ?request.command, "executing target program");
    let Err(source) = kernel.exec(request.command);
    Err(MiniboxError::Containment {
        step: ContainmentStep::Exec,
        source: Box::new(MiniboxError::Exec {
            program: request.command.first().cloned().unwrap_or_default(),
            source,
        }),
    })
}

fn step<T>(step: ContainmentStep, run: impl FnOnce() -> Result<T>) -> Result<T> {
    run().map_err(|e| {
        tracing::debug!(%step, error = %e, "containment step failed");
        MiniboxError::Containment {
            step,
            source: Box::new(e),
        }
    })
}

/// Runs the containment sequence against a [`RecordingKernel`] and returns
/// the kernel operations a real run would issue, ending with the `exec`.
///
/// The image is materialized and the layer directories are created on disk
/// as in a real run; the running kernel is not touched.
///
/// # Errors
///
/// Returns the error of any step other than `exec`, for instance a missing
/// image.
pub fn dry_run(
    config: &RuntimeConfig,
    container_id: &ContainerId,
    command: &[String],
) -> Result<Vec<KernelOp>> {
    let kernel = RecordingKernel::new();
    let request = ContainmentRequest {
        command,
        config,
        container_id,
    };
    match enter_container(&kernel, &request) {
        Err(MiniboxError::Containment {
            step: ContainmentStep::Exec,
            ..
        }) => Ok(kernel.ops()),
        Err(e) => Err(e),
    }
}
