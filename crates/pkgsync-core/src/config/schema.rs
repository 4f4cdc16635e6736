//! Configuration schema for pkgsync.toml
//!
//! ```toml
//! [instance.local-author]
//! url = "http://localhost:4502"
//!
//! [upload]
//! retry_times = 3
//!
//! [package]
//! snapshots = ["*-SNAPSHOT.zip"]
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::instance::{Instance, InstanceKind};
use crate::package::PackageIdentity;
use crate::retry::RetryPolicy;
use crate::sync::SyncOptions;
use crate::transport::ConnectionOptions;

/// Root configuration structure for pkgsync.toml
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct SyncConfig {
    /// Remote instances by name
    #[serde(default)]
    pub instance: BTreeMap<String, InstanceConfigEntry>,

    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub install: InstallConfig,

    #[serde(default)]
    pub package: PackageConfig,
}

/// Remote instance entry
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InstanceConfigEntry {
    /// Base URL, e.g. "http://localhost:4502"
    pub url: String,

    #[serde(default = "default_credential")]
    pub user: String,

    #[serde(default = "default_credential")]
    pub password: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// author or publish; derived from the name when absent
    #[serde(default, rename = "type")]
    pub kind: Option<InstanceKind>,
}

fn default_credential() -> String {
    "admin".to_string()
}

fn default_environment() -> String {
    "local".to_string()
}

impl InstanceConfigEntry {
    pub fn to_instance(&self, name: &str) -> Instance {
        let instance = Instance::new(name, &self.url, &self.user, &self.password)
            .with_environment(&self.environment);
        match self.kind {
            Some(kind) => instance.with_kind(kind),
            None => instance,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Trust self-signed certificates
    #[serde(default = "default_true")]
    pub untrusted_ssl: bool,

    /// Transport-level retries of failed connections
    #[serde(default = "default_true")]
    pub retries: bool,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            untrusted_ssl: true,
            retries: true,
        }
    }
}

impl From<&ConnectionConfig> for ConnectionOptions {
    fn from(config: &ConnectionConfig) -> Self {
        ConnectionOptions {
            timeout: Duration::from_millis(config.timeout_ms),
            untrusted_ssl: config.untrusted_ssl,
            retries: config.retries,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadConfig {
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Overwrite packages already uploaded
    #[serde(default)]
    pub force: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            retry_times: default_retry_times(),
            retry_delay_secs: default_retry_delay_secs(),
            force: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InstallConfig {
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Install sub-packages as well
    #[serde(default = "default_true")]
    pub recursive: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            retry_times: default_retry_times(),
            retry_delay_secs: default_retry_delay_secs(),
            recursive: true,
        }
    }
}

fn default_retry_times() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct PackageConfig {
    /// Wildcards for artifacts always uploaded with force
    #[serde(default)]
    pub snapshots: Vec<String>,

    /// Fixed remote path, skips resolving the package on the instance
    #[serde(default)]
    pub remote_path: String,

    #[serde(default)]
    pub group: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,
}

impl PackageConfig {
    /// Identity used when no local archive is at hand.
    pub fn identity(&self) -> Option<PackageIdentity> {
        let identity = PackageIdentity::new(&self.group, &self.name, &self.version);
        identity.has_coordinates().then_some(identity)
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, entry) in &self.instance {
            if name.trim().is_empty() {
                anyhow::bail!("Instance name must not be blank");
            }
            let url = url::Url::parse(&entry.url).map_err(|e| {
                anyhow::anyhow!("Instance '{}' has an invalid url '{}': {}", name, entry.url, e)
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!(
                    "Instance '{}' url must use http or https, got '{}'",
                    name,
                    url.scheme()
                );
            }
        }
        Ok(())
    }

    /// Configured instances in name order.
    pub fn instances(&self) -> Vec<Instance> {
        self.instance
            .iter()
            .map(|(name, entry)| entry.to_instance(name))
            .collect()
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions::from(&self.connection)
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            upload_retry: RetryPolicy::new(
                self.upload.retry_times,
                Duration::from_secs(self.upload.retry_delay_secs),
            ),
            install_retry: RetryPolicy::new(
                self.install.retry_times,
                Duration::from_secs(self.install.retry_delay_secs),
            ),
            upload_force: self.upload.force,
            install_recursive: self.install.recursive,
            snapshots: self.package.snapshots.clone(),
            remote_path: Some(self.package.remote_path.clone())
                .filter(|path| !path.trim().is_empty()),
        }
    }
}
