//! Build planning and execution.
//!
//! A `BuildPlan` fans the dependency graph out over the target platforms,
//! the `Executor` runs it in parallel, and `ExternalBuilder`s do the actual
//! compiling or packaging.

pub mod archive;
pub mod artifact;
pub mod command;
pub mod events;
pub mod executor;
pub mod external;
pub mod fingerprint;
pub mod plan;

pub use archive::ArchiveBuilder;
pub use artifact::{ArtifactHandle, BuildFailed, NodeOutcome};
pub use command::CommandBuilder;
pub use events::{BuildEvent, BuildObserver, JsonObserver, ProgressObserver};
pub use executor::{BuildReport, CancellationToken, Executor, UnitReport};
pub use external::{
    BuildError, BuildKind, BuildOptions, BuildOutput, BuildRequest, BuilderRegistry,
    ExternalBuilder,
};
pub use fingerprint::{FingerprintCache, FingerprintInputs};
pub use plan::{BuildPlan, PlanUnit, StepKind};
