//! High-level operations.
//!
//! This module contains the implementation of quay commands.

pub mod license;
pub mod load;
pub mod quay_build;
pub mod quay_check;
pub mod quay_clean;

pub use license::{validate, LicensePolicy, Violation};
pub use load::{load, load_with, LoadOptions, Session};
pub use quay_build::{build, BuildOptions, BuildResult};
pub use quay_check::{check, CheckReport};
pub use quay_clean::clean;
