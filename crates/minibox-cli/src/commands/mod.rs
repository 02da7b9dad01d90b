//! CLI command definitions and dispatch.

pub mod images;
pub mod plan;
pub mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use minibox_common::config::RuntimeConfig;
use minibox_common::types::ImageName;

/// minibox — run one program in an isolated, copy-on-write root.
#[derive(Parser, Debug)]
#[command(name = "mbox", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a program inside a new container and wait for it.
    Run(run::RunArgs),
    /// Show the kernel operations a run would perform, without performing them.
    Plan(plan::PlanArgs),
    /// List the images available in the images directory.
    Images(images::ImagesArgs),
}

/// Storage and image selection shared by every subcommand.
///
/// Each value is taken from its flag, then its environment variable, then
/// the `--config` file, then the built-in default.
#[derive(Args, Debug, Default)]
pub struct RuntimeArgs {
    /// JSON file with `images_dir`, `containers_dir`, and `image_name`.
    #[arg(long, env = "MINIBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Image to use as the container's base layer.
    #[arg(long, env = "MINIBOX_IMAGE_NAME")]
    pub image_name: Option<String>,

    /// Directory holding `<image>.tar` archives.
    #[arg(long, env = "MINIBOX_IMAGE_DIR")]
    pub image_dir: Option<PathBuf>,

    /// Directory holding per-container overlay layers.
    #[arg(long, env = "MINIBOX_CONTAINER_DIR")]
    pub container_dir: Option<PathBuf>,
}

impl RuntimeArgs {
    /// Resolves the effective runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the image
    /// name is invalid.
    pub fn resolve(&self) -> anyhow::Result<RuntimeConfig> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::load(path)?,
            None => RuntimeConfig::default(),
        };
        if let Some(name) = &self.image_name {
            config.image_name = ImageName::parse(name.as_str())?;
        }
        if let Some(dir) = &self.image_dir {
            config.images_dir.clone_from(dir);
        }
        if let Some(dir) = &self.container_dir {
            config.containers_dir.clone_from(dir);
        }
        tracing::debug!(?config, "resolved runtime configuration");
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Run(args) => run::execute(&args),
        Command::Plan(args) => plan::execute(&args).map(|()| ExitCode::SUCCESS),
        Command::Images(args) => images::execute(&args).map(|()| ExitCode::SUCCESS),
    }
}
