//! Local package artifacts: identity, descriptor and snapshot detection.

pub mod descriptor;
pub mod pattern;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use descriptor::{DESCRIPTOR_ENTRY, read_identity};
pub use pattern::{WildcardPattern, matches_any};

/// Identity of a package: group, name and version, or an explicit path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub group: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl PackageIdentity {
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            path: None,
        }
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// All of group, name and version are non-blank.
    pub fn has_coordinates(&self) -> bool {
        [&self.group, &self.name, &self.version]
            .iter()
            .all(|s| !s.trim().is_empty())
    }
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_coordinates() {
            write!(f, "{}:{}:{}", self.group, self.name, self.version)
        } else {
            write!(f, "{}", self.path.as_deref().unwrap_or("<unidentified>"))
        }
    }
}

/// What to resolve a remote package from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// A local archive whose descriptor names the package
    Archive(PathBuf),
    /// A known identity, matched against the cached listing when allowed
    Identity(PackageIdentity),
}

impl PackageSource {
    pub fn archive(path: impl AsRef<Path>) -> Self {
        PackageSource::Archive(path.as_ref().to_path_buf())
    }
}
