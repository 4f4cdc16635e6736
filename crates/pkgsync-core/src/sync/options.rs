use crate::retry::RetryPolicy;

/// Package workflow settings applied by [`super::InstanceSync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub upload_retry: RetryPolicy,
    pub install_retry: RetryPolicy,
    /// Overwrite an already uploaded package
    pub upload_force: bool,
    /// Install embedded sub-packages too
    pub install_recursive: bool,
    /// Wildcards naming artifacts that are always uploaded with force
    pub snapshots: Vec<String>,
    /// Remote path used instead of resolving the package on the instance
    pub remote_path: Option<String>,
}

impl SyncOptions {
    pub fn fixed_remote_path(&self) -> Option<&str> {
        self.remote_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            upload_retry: RetryPolicy::default(),
            install_retry: RetryPolicy::default(),
            upload_force: false,
            install_recursive: true,
            snapshots: Vec::new(),
            remote_path: None,
        }
    }
}
