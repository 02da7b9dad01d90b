//! `mbox images` — List the local images.

use clap::Args;
use minibox_image::storage::ImageStore;

use super::RuntimeArgs;
use crate::output;

/// Arguments for the `images` command.
#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Storage and image selection.
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// Executes the `images` command.
///
/// # Errors
///
/// Returns an error if the images directory cannot be read.
pub fn execute(args: &ImagesArgs) -> anyhow::Result<()> {
    let config = args.runtime.resolve()?;
    let store = ImageStore::open(&config.images_dir);
    let images = store.list()?;

    println!("NAME\tSIZE\tEXTRACTED\tARCHIVE");
    for image in &images {
        println!(
            "{}\t{}\t{}\t{}",
            image.name,
            output::format_bytes(image.size_bytes),
            if image.materialized { "yes" } else { "no" },
            image.archive.display()
        );
    }
    tracing::debug!(count = images.len(), root = %store.root().display(), "listed images");
    Ok(())
}
