//! quay - suite graph resolution and artifact layout engine
//!
//! This crate loads `Suite.toml` manifests, resolves the suites they import,
//! links every declaration into one dependency graph, drives external
//! builders over it in parallel and composes distribution layouts.

pub mod builder;
pub mod core;
pub mod layout;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and mocks for quay unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides suite fixtures plus mock fetchers, VCS clients and builders.
#[cfg(test)]
pub mod test_support;

pub use core::{
    Distribution, EntityId, GlobalManifest, Library, Platform, Project, Suite, Workspace,
};
pub use resolver::{DependencyGraph, ResolveError};
pub use util::context::GlobalContext;
