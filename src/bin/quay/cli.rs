//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use quay::core::Platform;
use quay::ops::LoadOptions;

/// quay - build suites of projects and lay out their distributions
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to Suite.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Only use path imports and cached downloads
    #[arg(long, global = true, env = "QUAY_OFFLINE")]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            manifest_path: self.manifest_path.clone(),
            offline: self.offline,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build projects and distributions
    Build(BuildArgs),

    /// Validate imports, references and licenses without building
    Check(CheckArgs),

    /// Print the dependency graph or the build plan
    Graph(GraphArgs),

    /// Remove build outputs
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MessageFormat {
    /// Progress bar and a summary
    #[default]
    Human,
    /// One JSON build event per line on stdout
    Json,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Declarations to build, `NAME` or `suite:NAME` (default: everything)
    pub targets: Vec<String>,

    /// Target platform as `<os>-<arch>`, repeatable (default: the host)
    #[arg(long = "platform", value_name = "PLATFORM")]
    pub platforms: Vec<Platform>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Leave out test projects and distributions
    #[arg(long)]
    pub no_tests: bool,

    /// Rebuild everything, ignoring fingerprints
    #[arg(long)]
    pub clean: bool,

    /// Check every suite's licenses against this repository
    #[arg(long, value_name = "NAME")]
    pub license_repository: Option<String>,

    /// Output format for build progress
    #[arg(long, value_enum, default_value_t)]
    pub message_format: MessageFormat,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Check every suite's licenses against this repository
    #[arg(long, value_name = "NAME")]
    pub license_repository: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GraphFormat {
    /// One line per node with its dependencies
    #[default]
    List,
    /// Graphviz
    Dot,
    /// The JSON build plan
    Plan,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Restrict to these declarations and their dependencies
    pub targets: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: GraphFormat,

    /// Target platform for `--format plan`, repeatable
    #[arg(long = "platform", value_name = "PLATFORM")]
    pub platforms: Vec<Platform>,

    /// Leave out test projects and distributions
    #[arg(long)]
    pub no_tests: bool,
}

#[derive(Args)]
pub struct CleanArgs {}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
