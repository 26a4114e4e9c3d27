//! Where suites and libraries come from.
//!
//! The resolver only talks to the `ArtifactFetcher` and `VcsClient` traits;
//! `HttpFetcher` and `GitClient` are the default implementations.

pub mod cache;
pub mod git;
pub mod http;
pub mod library;
pub mod source;

pub use cache::KeyedCache;
pub use git::GitClient;
pub use http::HttpFetcher;
pub use library::LibraryResolver;
pub use source::{ArtifactFetcher, Checkout, CheckoutError, FetchError, VcsClient};
