//! Layout composition: turning a distribution's layout rules into a file
//! tree on disk.

pub mod compose;
pub mod tree;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::entity_id::EntityId;
use crate::core::placeholder::PlaceholderError;
use crate::util::diagnostic::{suggestions, Diagnostic};

pub use compose::{ArtifactLookup, LayoutComposer};
pub use tree::OutputTree;

/// Error composing a layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout of `{distribution}` needs `{reference}`, which has no artifact")]
    ArtifactNotBuilt { distribution: EntityId, reference: String },

    #[error(
        "layout of `{distribution}`: `{}` and `{}` both land on `{}`",
        first.display(),
        second.display(),
        destination.display()
    )]
    LayoutConflict {
        distribution: EntityId,
        destination: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("layout of `{distribution}`: `{}` does not exist", path.display())]
    MissingSource { distribution: EntityId, path: PathBuf },

    #[error("layout of `{distribution}`: {source}")]
    Placeholder {
        distribution: EntityId,
        #[source]
        source: PlaceholderError,
    },

    #[error("layout of `{distribution}`: invalid pattern `{pattern}`: {message}")]
    Pattern {
        distribution: EntityId,
        pattern: String,
        message: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LayoutError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            LayoutError::ArtifactNotBuilt { .. } => diag.with_suggestion(suggestions::NOT_BUILT),
            LayoutError::LayoutConflict { .. } => {
                diag.with_suggestion(suggestions::LAYOUT_CONFLICT)
            }
            _ => diag,
        }
    }
}
