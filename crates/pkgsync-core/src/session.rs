//! Builds per-instance clients from configuration and fans operations out.

use std::sync::Arc;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::fanout::{self, InstanceOutcome};
use crate::instance::Instance;
use crate::retry::{LogProgress, RetryProgress};
use crate::sync::{InstanceSync, SyncOptions};
use crate::transport::{ConnectionOptions, HttpTransport};

/// Settings shared by every client of one invocation.
#[derive(Clone)]
pub struct SyncSession {
    connection: ConnectionOptions,
    options: SyncOptions,
    progress: Arc<dyn RetryProgress>,
}

impl SyncSession {
    pub fn new(connection: ConnectionOptions, options: SyncOptions) -> Self {
        Self {
            connection,
            options,
            progress: Arc::new(LogProgress),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.connection_options(), config.sync_options())
    }

    pub fn with_progress(mut self, progress: Arc<dyn RetryProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn connection(&self) -> &ConnectionOptions {
        &self.connection
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// A fresh client with its own transport and empty package cache.
    pub fn client_for(&self, instance: Instance) -> Result<InstanceSync<HttpTransport>, SyncError> {
        let transport = HttpTransport::new(&instance, &self.connection)?;
        Ok(InstanceSync::new(instance, transport, self.options.clone())
            .with_progress(Arc::clone(&self.progress)))
    }

    /// Run `operation` against every instance concurrently.
    pub fn for_each_instance<R, F>(
        &self,
        instances: Vec<Instance>,
        operation: F,
    ) -> std::io::Result<Vec<InstanceOutcome<R>>>
    where
        F: Fn(&mut InstanceSync<HttpTransport>) -> Result<R, SyncError> + Send + Sync + 'static,
        R: Send + 'static,
    {
        let session = self.clone();
        fanout::for_each_instance(instances, move |instance| session.client_for(instance), operation)
    }
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("connection", &self.connection)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
