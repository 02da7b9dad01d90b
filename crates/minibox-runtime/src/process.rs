//! Process supervision.
//!
//! The supervisor forks once per run. The child enters the container and
//! either becomes the target program or exits with status 1 after printing
//! why it could not. The parent reports the child's PID, then blocks until
//! the child terminates and returns its raw wait status.

use std::io::{self, Write};

use minibox_common::config::RuntimeConfig;
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::ContainerId;
use minibox_core::kernel::Kernel;
use nix::unistd::{ForkResult, Pid};

use crate::contain::{self, ContainmentRequest};

/// Exit status of a child that failed to enter its container.
pub const CONTAINMENT_FAILURE_STATUS: i32 = 1;

type IdGenerator = Box<dyn Fn() -> ContainerId>;

/// How a supervised child terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// PID of the child in the parent's PID namespace.
    pub pid: i32,
    /// Container the child ran in.
    pub container_id: ContainerId,
    /// Status word as returned by `waitpid(2)`.
    pub raw_status: i32,
}

impl ExitReport {
    /// Exit code, if the child exited normally.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        if libc::WIFEXITED(self.raw_status) {
            Some(libc::WEXITSTATUS(self.raw_status))
        } else {
            None
        }
    }

    /// Terminating signal, if the child was killed by one.
    #[must_use]
    pub fn signal(&self) -> Option<i32> {
        if libc::WIFSIGNALED(self.raw_status) {
            Some(libc::WTERMSIG(self.raw_status))
        } else {
            None
        }
    }
}

/// Forks, contains, and waits for one program per [`Supervisor::run`].
pub struct Supervisor<K: Kernel> {
    kernel: K,
    config: RuntimeConfig,
    id_generator: IdGenerator,
}

impl<K: Kernel> Supervisor<K> {
    /// Creates a supervisor that gives every run a fresh random container ID.
    #[must_use]
    pub fn new(kernel: K, config: RuntimeConfig) -> Self {
        Self {
            kernel,
            config,
            id_generator: Box::new(ContainerId::generate),
        }
    }

    /// Replaces how container IDs are chosen.
    #[must_use]
    pub fn with_id_generator(mut self, generator: impl Fn() -> ContainerId + 'static) -> Self {
        self.id_generator = Box::new(generator);
        self
    }

    /// Returns the runtime configuration.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Runs `command` in a new container and waits for it.
    ///
    /// `on_spawn` is called in the parent with the child's PID as soon as
    /// the fork returns, before waiting.
    ///
    /// A child that fails to enter the container writes the error and its
    /// causes to stderr and exits with [`CONTAINMENT_FAILURE_STATUS`]; that
    /// is reported here as an ordinary exit, not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Config`] for an empty command, and
    /// [`MiniboxError::Process`] if forking or waiting fails.
    pub fn run(
        &self,
        command: &[String],
        on_spawn: impl FnOnce(i32, &ContainerId),
    ) -> Result<ExitReport> {
        if command.is_empty() {
            return Err(MiniboxError::Config {
                message: "no command given".into(),
            });
        }
        let container_id = (self.id_generator)();

        // SAFETY: the child only runs the containment sequence and then
        // either execs or calls `_exit`; it never returns into the caller.
        match unsafe { nix::unistd::fork() } {
            Ok(ForkResult::Child) => self.run_child(command, &container_id),
            Ok(ForkResult::Parent { child }) => {
                tracing::info!(pid = child.as_raw(), id = %container_id, "container process started");
                on_spawn(child.as_raw(), &container_id);
                let raw_status = wait_raw(child)?;
                tracing::info!(pid = child.as_raw(), raw_status, "container process exited");
                Ok(ExitReport {
                    pid: child.as_raw(),
                    container_id,
                    raw_status,
                })
            }
            Err(errno) => Err(MiniboxError::Process {
                operation: "fork",
                source: errno.into(),
            }),
        }
    }

    fn run_child(&self, command: &[String], container_id: &ContainerId) -> ! {
        let request = ContainmentRequest {
            command,
            config: &self.config,
            container_id,
        };
        let Err(err) = contain::enter_container(&self.kernel, &request);
        tracing::error!(id = %container_id, error = %err, "containment failed");
        let _ = writeln!(io::stderr(), "{}", err.chain());
        // SAFETY: `_exit` terminates the process immediately and takes no pointers.
        unsafe { libc::_exit(CONTAINMENT_FAILURE_STATUS) }
    }
}

/// Blocks until `child` terminates and returns its raw status word.
fn wait_raw(child: Pid) -> Result<i32> {
    let mut status = 0;
    loop {
        // SAFETY: `status` is a valid, exclusively borrowed out-pointer.
        let rc = unsafe { libc::waitpid(child.as_raw(), &raw mut status, 0) };
        if rc == child.as_raw() {
            return Ok(status);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(MiniboxError::Process {
                operation: "waitpid",
                source: err,
            });
        }
    }
}
