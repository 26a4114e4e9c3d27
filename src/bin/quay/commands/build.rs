//! `quay build` command

use anyhow::{bail, Context, Result};

use crate::cli::{BuildArgs, MessageFormat};
use quay::builder::{
    BuildObserver, BuilderRegistry, CancellationToken, JsonObserver, NodeOutcome, ProgressObserver,
};
use quay::ops::{build, load, BuildOptions, LoadOptions};
use quay::util::diagnostic;
use quay::util::GlobalContext;

pub fn execute(args: BuildArgs, ctx: &GlobalContext, load_opts: &LoadOptions) -> Result<()> {
    let session = load(ctx, load_opts)?;
    let registry = BuilderRegistry::with_defaults(session.workspace.config());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("  Cancelling: waiting for running builds to finish");
            cancel.cancel();
        })
        .context("failed to install the Ctrl-C handler")?;
    }

    let json = JsonObserver;
    let progress = ProgressObserver::new();
    let observer: &dyn BuildObserver = match args.message_format {
        MessageFormat::Json => &json,
        MessageFormat::Human => &progress,
    };

    let opts = BuildOptions {
        targets: args.targets,
        platforms: args.platforms,
        jobs: args.jobs,
        no_tests: args.no_tests,
        clean: args.clean,
        license_repository: args.license_repository,
    };
    let result = build(&session, &opts, &registry, cancel, Some(observer))?;

    let report = &result.report;
    for violation in &result.violations {
        diagnostic::emit(&violation.to_diagnostic(), ctx.color());
    }
    for failure in report.failures() {
        diagnostic::emit(&failure.to_diagnostic(), ctx.color());
    }

    if args.message_format == MessageFormat::Human {
        for unit in &report.units {
            match &unit.outcome {
                NodeOutcome::Built(handle) if ctx.is_verbose() || handle.fresh => eprintln!(
                    "{:>12} `{}` -> {}",
                    if handle.fresh { "Built" } else { "Fresh" },
                    unit.node,
                    handle.path.display()
                ),
                NodeOutcome::Skipped { failed_dependency } => eprintln!(
                    "{:>12} `{}` (depends on failed `{}`)",
                    "Skipped", unit.node, failed_dependency
                ),
                _ => {}
            }
        }
    }

    if report.cancelled {
        bail!("build cancelled");
    }
    if !report.success() {
        bail!(
            "build failed: {} failed, {} skipped{}",
            report.failed(),
            report.skipped(),
            violation_note(result.violations.len())
        );
    }
    if !result.violations.is_empty() {
        bail!("{} license violation(s)", result.violations.len());
    }

    if args.message_format == MessageFormat::Human {
        eprintln!(
            "    Finished {} unit(s) in {:.2}s",
            report.built(),
            report.duration.as_secs_f64()
        );
    }
    Ok(())
}

fn violation_note(count: usize) -> String {
    match count {
        0 => String::new(),
        n => format!(", {} license violation(s)", n),
    }
}
