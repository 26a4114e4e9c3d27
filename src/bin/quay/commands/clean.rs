//! `quay clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use quay::core::Workspace;
use quay::ops::{clean, LoadOptions};
use quay::util::GlobalContext;

pub fn execute(_args: CleanArgs, ctx: &GlobalContext, load: &LoadOptions) -> Result<()> {
    let manifest_path = match &load.manifest_path {
        Some(path) => path.clone(),
        None => ctx.find_manifest()?,
    };
    let ws = Workspace::new(&manifest_path, ctx)?;

    match clean(&ws)? {
        Some(dir) => eprintln!("     Removed {}", dir.display()),
        None => eprintln!("     Nothing to clean"),
    }
    Ok(())
}
