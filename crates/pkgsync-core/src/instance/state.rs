//! Point-in-time runtime state reported by an instance's system console.
//!
//! These snapshots are advisory: a failed query degrades to an `Unknown`
//! variant carrying the cause instead of failing the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

const MODULE_ACTIVE: &str = "Active";
const MODULE_RESOLVED: &str = "Resolved";

/// Module (OSGi bundle) as listed in `bundles.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub symbolic_name: String,
    #[serde(default)]
    pub version: String,
    pub state: String,
    #[serde(default)]
    pub fragment: bool,
}

impl ModuleInfo {
    /// Fragments never become active; resolved is their healthy state.
    pub fn is_stable(&self) -> bool {
        if self.fragment {
            self.state == MODULE_RESOLVED
        } else {
            self.state == MODULE_ACTIVE
        }
    }
}

/// Decoded `bundles.json` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    pub status: String,
    /// `[total, active, fragment, resolved, installed]`
    #[serde(rename = "s", default)]
    pub stats: Vec<u32>,
    #[serde(rename = "data", default)]
    pub modules: Vec<ModuleInfo>,
}

impl ModuleSnapshot {
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|e| SyncError::malformed("module state", e))
    }

    pub fn total(&self) -> usize {
        self.modules.len()
    }

    pub fn unstable(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.modules.iter().filter(|m| !m.is_stable())
    }

    pub fn stable_percent(&self) -> f64 {
        if self.modules.is_empty() {
            return 0.0;
        }
        let stable = self.modules.iter().filter(|m| m.is_stable()).count();
        stable as f64 * 100.0 / self.modules.len() as f64
    }
}

#[derive(Debug)]
pub enum ModuleState {
    Known(ModuleSnapshot),
    Unknown { cause: Option<SyncError> },
}

impl ModuleState {
    pub fn unknown(cause: SyncError) -> Self {
        ModuleState::Unknown { cause: Some(cause) }
    }

    pub fn snapshot(&self) -> Option<&ModuleSnapshot> {
        match self {
            ModuleState::Known(snapshot) => Some(snapshot),
            ModuleState::Unknown { .. } => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Every module active (or resolved, for fragments). Unknown is never stable.
    pub fn is_stable(&self) -> bool {
        self.snapshot()
            .is_some_and(|s| !s.modules.is_empty() && s.unstable().next().is_none())
    }
}

/// Service (declarative component) as listed in `components.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub pid: String,
    pub state: String,
}

impl ServiceInfo {
    pub fn is_unsatisfied(&self) -> bool {
        let state = self.state.to_ascii_lowercase();
        state.starts_with("unsatisfied") || state == "failed active"
    }
}

/// Decoded `components.json` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    #[serde(rename = "data", default)]
    pub services: Vec<ServiceInfo>,
}

impl ServiceSnapshot {
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|e| SyncError::malformed("service state", e))
    }

    pub fn unsatisfied(&self) -> impl Iterator<Item = &ServiceInfo> {
        self.services.iter().filter(|s| s.is_unsatisfied())
    }
}

#[derive(Debug)]
pub enum ServiceState {
    Known(ServiceSnapshot),
    Unknown { cause: Option<SyncError> },
}

impl ServiceState {
    pub fn unknown(cause: SyncError) -> Self {
        ServiceState::Unknown { cause: Some(cause) }
    }

    pub fn snapshot(&self) -> Option<&ServiceSnapshot> {
        match self {
            ServiceState::Known(snapshot) => Some(snapshot),
            ServiceState::Unknown { .. } => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn is_stable(&self) -> bool {
        self.snapshot()
            .is_some_and(|s| s.unsatisfied().next().is_none())
    }
}

/// Combined module and service state of one instance.
#[derive(Debug)]
pub struct InstanceState {
    pub instance: String,
    pub modules: ModuleState,
    pub services: ServiceState,
    pub captured_at: DateTime<Utc>,
}

impl InstanceState {
    pub fn is_stable(&self) -> bool {
        self.modules.is_stable() && self.services.is_stable()
    }
}
