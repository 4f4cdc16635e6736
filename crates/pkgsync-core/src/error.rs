//! Error taxonomy for the instance sync client.
//!
//! Transport and parser failures surface as [`SyncError`] so that the retry
//! loop and the fan-out coordinator can reason about them uniformly.
//! Configuration loading stays on `anyhow`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Remote package operation, used to label errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Upload,
    Install,
    Activate,
    Build,
    Delete,
    Uninstall,
    Reload,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Upload => "upload",
            Operation::Install => "install",
            Operation::Activate => "activate",
            Operation::Build => "build",
            Operation::Delete => "delete",
            Operation::Uninstall => "uninstall",
            Operation::Reload => "reload",
        };
        f.write_str(name)
    }
}

/// Low-level cause of a failed request.
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// Server answered with a non-success status line
    #[error("unexpected instance response: {0}")]
    Status(String),

    /// Connect, read or TLS fault
    #[error("{0}")]
    Transport(#[source] reqwest::Error),

    /// Local I/O while preparing the request body
    #[error("{0}")]
    Io(#[source] std::io::Error),

    #[error("package file '{}' not found", .0.display())]
    FileNotFound(PathBuf),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed instance request to '{url}': {failure}")]
    RemoteRequestFailed {
        url: String,
        #[source]
        failure: RequestFailure,
    },

    #[error("malformed {context} response: {reason}")]
    MalformedResponse { context: String, reason: String },

    #[error("{operation} rejected by instance '{instance}': {message}{}", render_errors(.errors))]
    DeploymentRejected {
        operation: Operation,
        instance: String,
        message: String,
        errors: Vec<String>,
    },

    #[error("instance '{instance}' unreachable")]
    InstanceUnreachable {
        instance: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("file is not a valid package archive '{}': {reason}", .path.display())]
    InvalidPackage { path: PathBuf, reason: String },

    #[error("package is not uploaded on instance '{instance}'")]
    PackageNotResolved { instance: String },
}

impl SyncError {
    pub fn request(url: impl Into<String>, failure: RequestFailure) -> Self {
        SyncError::RemoteRequestFailed {
            url: url.into(),
            failure,
        }
    }

    pub fn malformed(context: impl Into<String>, reason: impl fmt::Display) -> Self {
        SyncError::MalformedResponse {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether a retry loop should attempt the operation again.
    ///
    /// Local problems (missing or invalid archive, unresolved package) are
    /// not going to change between attempts.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SyncError::RemoteRequestFailed {
                failure: RequestFailure::FileNotFound(_),
                ..
            } | SyncError::InvalidPackage { .. }
                | SyncError::PackageNotResolved { .. }
        )
    }

    /// Server-reported error lines, empty for anything but a rejection.
    pub fn reported_errors(&self) -> &[String] {
        match self {
            SyncError::DeploymentRejected { errors, .. } => errors,
            _ => &[],
        }
    }
}

fn render_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut rendered = String::new();
    for line in errors {
        rendered.push_str("\n  ");
        rendered.push_str(line);
    }
    rendered
}
