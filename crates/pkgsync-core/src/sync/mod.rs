//! Client acting on behalf of one remote instance.
//!
//! [`InstanceSync`] owns the instance, its transport and its package listing
//! cache. Operations that refresh the cache take `&mut self`, so a single
//! client can never run overlapping lifecycle steps; fan-out across
//! instances gives every worker its own client.

mod lifecycle;
mod options;
mod state;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::error::SyncError;
use crate::instance::Instance;
use crate::package::{self, PackageIdentity, PackageSource};
use crate::response::{PackageListing, RemotePackage};
use crate::retry::{LogProgress, RetryProgress};
use crate::transport::{RequestParams, Transport};

pub use lifecycle::Deployment;
pub use options::SyncOptions;

/// Last package listing fetched from an instance.
#[derive(Debug, Clone, Default)]
pub struct PackageCache {
    listing: PackageListing,
    refreshed_at: Option<DateTime<Utc>>,
}

impl PackageCache {
    /// Cached listing, `None` until the first successful fetch.
    pub fn listing(&self) -> Option<&PackageListing> {
        self.refreshed_at.map(|_| &self.listing)
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn is_empty(&self) -> bool {
        self.refreshed_at.is_none()
    }

    fn store(&mut self, listing: PackageListing) {
        self.listing = listing;
        self.refreshed_at = Some(Utc::now());
    }
}

pub struct InstanceSync<T: Transport> {
    instance: Instance,
    transport: T,
    options: SyncOptions,
    cache: PackageCache,
    progress: Arc<dyn RetryProgress>,
}

impl<T: Transport> InstanceSync<T> {
    pub fn new(instance: Instance, transport: T, options: SyncOptions) -> Self {
        Self {
            instance,
            transport,
            options,
            cache: PackageCache::default(),
            progress: Arc::new(LogProgress),
        }
    }

    /// Report retry countdowns somewhere other than the log.
    pub fn with_progress(mut self, progress: Arc<dyn RetryProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &PackageCache {
        &self.cache
    }

    /// Package listing of the instance, fetched when `refresh` is set or
    /// nothing is cached yet.
    pub fn list_packages(&mut self, refresh: bool) -> Result<&PackageListing, SyncError> {
        if refresh || self.cache.is_empty() {
            let url = self.instance.endpoints().list_packages();
            debug!(instance = %self.instance.name(), "Asking for uploaded packages using URL: '{}'", url);

            let listing = self
                .transport
                .post_multipart(&url, &RequestParams::new())
                .and_then(|json| PackageListing::from_json(&json))
                .inspect_err(|e| {
                    error!(instance = %self.instance.name(), "Cannot list packages: {}", e);
                })?;
            self.cache.store(listing);
        }

        Ok(&self.cache.listing)
    }

    /// Find the remote counterpart of a package.
    ///
    /// A configured remote path wins without asking the instance. Otherwise
    /// the identity is read from the archive (or taken as given) and matched
    /// against the listing, refreshed unless `refresh` is off and a listing is
    /// already cached.
    pub fn resolve_remote_package(
        &mut self,
        source: &PackageSource,
        refresh: bool,
    ) -> Result<Option<RemotePackage>, SyncError> {
        if let Some(path) = self.options.fixed_remote_path() {
            return Ok(Some(RemotePackage::at_path(path)));
        }

        let expected = match source {
            PackageSource::Archive(file) => package::read_identity(file).inspect_err(|e| {
                error!(instance = %self.instance.name(), "Cannot identify package: {}", e);
            })?,
            PackageSource::Identity(identity) => identity.clone(),
        };

        let listing = self.list_packages(refresh)?;
        let resolved = listing.resolve(&expected).cloned();
        debug!(
            instance = %self.instance.name(),
            "Resolved package {} to {:?}",
            expected,
            resolved.as_ref().map(|p| p.path.as_str())
        );
        Ok(resolved)
    }

    /// Remote path of a package, failing when it is not uploaded.
    pub fn determine_remote_package_path(
        &mut self,
        source: &PackageSource,
    ) -> Result<String, SyncError> {
        self.resolve_remote_package(source, true)?
            .map(|p| p.path)
            .ok_or_else(|| {
                error!(instance = %self.instance.name(), "Package {:?} is not uploaded", source);
                SyncError::PackageNotResolved {
                    instance: self.instance.name().to_string(),
                }
            })
    }

    /// Identity-based lookup without a local archive.
    pub fn resolve_identity(
        &mut self,
        identity: &PackageIdentity,
        refresh: bool,
    ) -> Result<Option<RemotePackage>, SyncError> {
        self.resolve_remote_package(&PackageSource::Identity(identity.clone()), refresh)
    }

    /// Snapshot artifacts are always uploaded with force.
    pub fn is_snapshot(&self, file: &Path) -> bool {
        package::matches_any(file, self.options.snapshots.as_slice())
    }
}

impl<T: Transport> std::fmt::Debug for InstanceSync<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceSync")
            .field("instance", &self.instance)
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
