//! `mbox plan` — Display the kernel operations of a run before performing it.

use clap::Args;
use minibox_common::types::ContainerId;
use minibox_runtime::contain;

use super::RuntimeArgs;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Storage and image selection.
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    /// Container ID to plan for. A random one is used if omitted.
    #[arg(long)]
    pub id: Option<String>,

    /// Program and arguments.
    #[arg(required = true, last = true)]
    pub command: Vec<String>,
}

/// Executes the `plan` command.
///
/// The image is materialized and the container's layer directories are
/// created, exactly as `run` would; no mount, namespace, or device change is
/// made.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a step before `exec`
/// would fail, for instance because the image does not exist.
pub fn execute(args: &PlanArgs) -> anyhow::Result<()> {
    let config = args.runtime.resolve()?;
    let id = args
        .id
        .as_deref()
        .map_or_else(ContainerId::generate, ContainerId::new);

    let ops = contain::dry_run(&config, &id, &args.command)?;

    println!("Containment plan for {id} (image {})", config.image_name);
    println!();
    for (index, op) in ops.iter().enumerate() {
        println!("  {:>3}. {op}", index + 1);
    }
    println!();
    println!("  {} kernel operation(s).", ops.len());
    Ok(())
}
