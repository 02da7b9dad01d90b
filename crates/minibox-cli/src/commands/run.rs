//! `mbox run` — Run a program inside a new container.

use std::process::ExitCode;

use clap::Args;
use minibox_core::kernel::LinuxKernel;
use minibox_runtime::process::Supervisor;

use super::RuntimeArgs;
use crate::output;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Storage and image selection.
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    /// Program and arguments, looked up on the container's `PATH`.
    #[arg(required = true, last = true)]
    pub command: Vec<String>,
}

/// Executes the `run` command.
///
/// Prints the child's PID as soon as it is forked, then its raw wait status
/// once it terminates. The process exits with the child's exit code, or
/// `128 + signal` if the child was killed.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the child cannot be
/// forked or waited for. Failures inside the child are reported by the
/// child itself on stderr.
pub fn execute(args: &RunArgs) -> anyhow::Result<ExitCode> {
    let config = args.runtime.resolve()?;
    let supervisor = Supervisor::new(LinuxKernel::new(), config);

    let report = supervisor.run(&args.command, |pid, id| {
        tracing::debug!(pid, %id, "forked container process");
        println!("{pid}");
    })?;
    println!("{} exited with status {}", report.pid, report.raw_status);

    Ok(ExitCode::from(output::exit_status_code(
        report.exit_code(),
        report.signal(),
    )))
}
