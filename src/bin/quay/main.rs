//! quay CLI - build suites of projects and lay out their distributions

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use quay::core::ManifestError;
use quay::layout::LayoutError;
use quay::resolver::ResolveError;
use quay::util::diagnostic::{self, Diagnostic};
use quay::util::GlobalContext;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;
    if let Err(e) = run(cli) {
        match structural_diagnostic(&e) {
            Some(diag) => diagnostic::emit(&diag, color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

/// Structural errors carry their own context and suggestions.
fn structural_diagnostic(e: &anyhow::Error) -> Option<Diagnostic> {
    e.chain().find_map(|cause| {
        if let Some(err) = cause.downcast_ref::<ResolveError>() {
            Some(err.to_diagnostic())
        } else if let Some(err) = cause.downcast_ref::<ManifestError>() {
            Some(err.to_diagnostic())
        } else {
            cause.downcast_ref::<LayoutError>().map(LayoutError::to_diagnostic)
        }
    })
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("quay=debug")
    } else {
        EnvFilter::new("quay=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(!cli.no_color);
    let load = cli.load_options();

    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &ctx, &load),
        Commands::Check(args) => commands::check::execute(args, &ctx, &load),
        Commands::Graph(args) => commands::graph::execute(args, &ctx, &load),
        Commands::Clean(args) => commands::clean::execute(args, &ctx, &load),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
