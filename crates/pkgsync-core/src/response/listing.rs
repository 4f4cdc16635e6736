//! Package listing returned by `list.jsp`.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::package::PackageIdentity;

/// A package known to the remote package manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePackage {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub path: String,
    #[serde(default)]
    pub download_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub conventional: bool,
    /// Epoch millis of the last install, absent when never installed
    #[serde(default)]
    pub last_unpacked: Option<i64>,
}

impl RemotePackage {
    /// A package known only by its remote path.
    pub fn at_path(path: impl Into<String>) -> Self {
        Self {
            group: String::new(),
            name: String::new(),
            version: String::new(),
            path: path.into(),
            download_name: String::new(),
            size: 0,
            conventional: false,
            last_unpacked: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.last_unpacked.is_some()
    }

    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(&self.group, &self.name, &self.version)
    }
}

/// Snapshot of every package uploaded to an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageListing {
    #[serde(default)]
    pub results: Vec<RemotePackage>,
    #[serde(default)]
    pub total: usize,
}

impl PackageListing {
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|e| SyncError::malformed("package listing", e))
    }

    pub fn packages(&self) -> &[RemotePackage] {
        &self.results
    }

    /// Find the package matching `expected`.
    ///
    /// Matches on group, name and version when all three are set, otherwise
    /// on the explicit path. No match is not an error.
    pub fn resolve(&self, expected: &PackageIdentity) -> Option<&RemotePackage> {
        if expected.has_coordinates() {
            return self.results.iter().find(|p| {
                p.group == expected.group && p.name == expected.name && p.version == expected.version
            });
        }

        let path = expected.path.as_deref().filter(|p| !p.trim().is_empty())?;
        self.results.iter().find(|p| p.path == path)
    }
}
