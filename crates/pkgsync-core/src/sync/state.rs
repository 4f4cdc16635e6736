//! Advisory runtime state queries and instance reload.

use chrono::Utc;
use tracing::{debug, error, info};

use super::InstanceSync;
use crate::error::SyncError;
use crate::instance::{InstanceState, ModuleSnapshot, ModuleState, ServiceSnapshot, ServiceState};
use crate::transport::{RequestParams, Transport};

impl<T: Transport> InstanceSync<T> {
    /// Module state, or `Unknown` when the instance cannot tell.
    pub fn determine_module_state(&self) -> ModuleState {
        let url = self.instance.endpoints().bundles();
        debug!(instance = %self.instance.name(), "Asking for modules using URL: '{}'", url);

        match self
            .transport
            .get(&url)
            .and_then(|json| ModuleSnapshot::from_json(&json))
        {
            Ok(snapshot) => ModuleState::Known(snapshot),
            Err(e) => {
                debug!(instance = %self.instance.name(), "Cannot determine module state: {}", e);
                ModuleState::unknown(e)
            }
        }
    }

    /// Service state, or `Unknown` when the instance cannot tell.
    pub fn determine_service_state(&self) -> ServiceState {
        let url = self.instance.endpoints().components();
        debug!(instance = %self.instance.name(), "Asking for services using URL: '{}'", url);

        match self
            .transport
            .get(&url)
            .and_then(|json| ServiceSnapshot::from_json(&json))
        {
            Ok(snapshot) => ServiceState::Known(snapshot),
            Err(e) => {
                debug!(instance = %self.instance.name(), "Cannot determine service state: {}", e);
                ServiceState::unknown(e)
            }
        }
    }

    pub fn determine_instance_state(&self) -> InstanceState {
        InstanceState {
            instance: self.instance.name().to_string(),
            modules: self.determine_module_state(),
            services: self.determine_service_state(),
            captured_at: Utc::now(),
        }
    }

    /// Ask the instance to restart its runtime.
    pub fn reload(&self) -> Result<(), SyncError> {
        let url = self.instance.endpoints().vm_stat();
        info!(instance = %self.instance.name(), "Triggering instance shutdown");

        let params = RequestParams::new().text("shutdown_type", "Restart");
        self.transport
            .post_form(&url, &params)
            .map(|_| ())
            .map_err(|e| {
                error!(instance = %self.instance.name(), "Cannot trigger instance shutdown: {}", e);
                SyncError::InstanceUnreachable {
                    instance: self.instance.name().to_string(),
                    source: Box::new(e),
                }
            })
    }
}
