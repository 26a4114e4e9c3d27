//! Distributions: packaged aggregations of project outputs.

use serde::Serialize;

use crate::core::layout_rule::LayoutRule;
use crate::core::reference::Reference;

/// A distribution declared by a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub name: String,
    /// Constituent projects (and libraries) packed into the distribution.
    pub dependencies: Vec<Reference>,
    /// Distributions required at runtime.
    pub dist_dependencies: Vec<Reference>,
    /// Constituents reachable through `dependencies` that must be left out.
    pub exclude: Vec<Reference>,
    /// Empty unless the distribution assembles a file tree.
    pub layout: Vec<LayoutRule>,
    pub native: bool,
    pub platform_dependent: bool,
    pub description: Option<String>,
    pub main_class: Option<String>,
    pub licenses: Vec<String>,
    pub test: bool,
}

impl Distribution {
    pub fn has_layout(&self) -> bool {
        !self.layout.is_empty()
    }

    /// File name of the archive produced for a non-layout distribution.
    pub fn archive_file_name(&self) -> String {
        format!("{}.tar.gz", self.name.to_lowercase().replace('_', "-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_file_name() {
        let dist = Distribution {
            name: "TRUFFLERUBY_SHARED".into(),
            dependencies: vec![],
            dist_dependencies: vec![],
            exclude: vec![],
            layout: vec![],
            native: false,
            platform_dependent: false,
            description: None,
            main_class: None,
            licenses: vec![],
            test: false,
        };
        assert_eq!(dist.archive_file_name(), "truffleruby-shared.tar.gz");
        assert!(!dist.has_layout());
    }
}
