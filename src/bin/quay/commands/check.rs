//! `quay check` command

use anyhow::{bail, Result};

use crate::cli::CheckArgs;
use quay::ops::{check, load, LoadOptions};
use quay::util::diagnostic;
use quay::util::GlobalContext;

pub fn execute(args: CheckArgs, ctx: &GlobalContext, opts: &LoadOptions) -> Result<()> {
    let session = load(ctx, opts)?;
    let report = check(&session, args.license_repository)?;

    for violation in &report.violations {
        diagnostic::emit(&violation.to_diagnostic(), ctx.color());
    }
    if !report.success() {
        bail!("{} license violation(s)", report.violations.len());
    }

    eprintln!(
        "     Checked {} suite(s), {} node(s)",
        report.suites, report.nodes
    );
    Ok(())
}
