//! pkgsync Core Library
//!
//! Client for the package manager and system console of remote content
//! repository instances: uploads, installs, activates, deletes and
//! uninstalls packages, and reports runtime state, across many instances
//! at once.

pub mod config;
pub mod error;
pub mod fanout;
pub mod instance;
pub mod package;
pub mod response;
pub mod retry;
pub mod session;
pub mod sync;
pub mod transport;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, SyncConfig};

    // Errors
    pub use crate::error::{Operation, RequestFailure, SyncError};

    // Instances
    pub use crate::instance::{Instance, InstanceKind, InstanceState, ModuleState, ServiceState};

    // Packages
    pub use crate::package::{PackageIdentity, PackageSource};
    pub use crate::response::{OperationReport, PackageListing, RemotePackage, ReportStatus, UploadResult};

    // Client
    pub use crate::fanout::{InstanceOutcome, fan_out, for_each_instance};
    pub use crate::retry::{RetryPolicy, RetryProgress};
    pub use crate::session::SyncSession;
    pub use crate::sync::{Deployment, InstanceSync, SyncOptions};
    pub use crate::transport::{ConnectionOptions, HttpTransport, RequestParams, Transport};
}
