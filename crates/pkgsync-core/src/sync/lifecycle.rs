//! Package lifecycle steps: upload, install, activate, build, delete, uninstall.
//!
//! Each step is invoked explicitly by the caller; nothing advances on its
//! own. A failed step aborts a composed workflow and nothing already applied
//! on the instance is rolled back.

use std::path::Path;

use serde::Serialize;
use tracing::{error, info, warn};

use super::InstanceSync;
use crate::error::{Operation, RequestFailure, SyncError};
use crate::response::{OperationReport, ReportKind, ReportStatus, UploadResult};
use crate::retry::retry_with_delay;
use crate::transport::{RequestParams, Transport};

/// Outcome of [`InstanceSync::deploy`] and [`InstanceSync::distribute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub path: String,
    pub upload: UploadResult,
    pub install: OperationReport,
    pub activation: Option<UploadResult>,
}

impl<T: Transport> InstanceSync<T> {
    /// Upload an archive, retrying the whole upload per the upload policy.
    pub fn upload(&self, file: &Path) -> Result<UploadResult, SyncError> {
        retry_with_delay(
            self.options.upload_retry,
            "upload",
            self.instance.name(),
            self.progress.as_ref(),
            |_| self.upload_once(file),
        )
    }

    pub fn upload_once(&self, file: &Path) -> Result<UploadResult, SyncError> {
        let url = self.instance.endpoints().upload();
        if !file.is_file() {
            return Err(SyncError::request(
                url,
                RequestFailure::FileNotFound(file.to_path_buf()),
            ));
        }

        info!(
            instance = %self.instance.name(),
            "Uploading package at path '{}' to URL '{}'",
            file.display(),
            url
        );

        let force = self.options.upload_force || self.is_snapshot(file);
        let params = RequestParams::new()
            .file("package", file)
            .text("force", force);

        let json = self.transport.post_multipart(&url, &params)?;
        let response = UploadResult::upload_from_json(&json)?;

        if !response.success {
            error!(instance = %self.instance.name(), "{}", response.message);
            return Err(self.rejected(Operation::Upload, response.message, Vec::new()));
        }

        info!(instance = %self.instance.name(), "{}", response.message);
        Ok(response)
    }

    /// Install an uploaded package, retrying per the install policy.
    ///
    /// A retry re-runs the install even if the previous attempt was partly
    /// applied on the instance.
    pub fn install(&self, remote_path: &str) -> Result<OperationReport, SyncError> {
        retry_with_delay(
            self.options.install_retry,
            "install",
            self.instance.name(),
            self.progress.as_ref(),
            |_| self.install_once(remote_path),
        )
    }

    pub fn install_once(&self, remote_path: &str) -> Result<OperationReport, SyncError> {
        let url = self.instance.endpoints().install(remote_path);
        info!(instance = %self.instance.name(), "Installing package using command: {}", url);

        let params = RequestParams::new().text("recursive", self.options.install_recursive);
        let html = self.transport.post_multipart(&url, &params)?;

        self.check_report(Operation::Install, OperationReport::parse(ReportKind::Install, &html))
    }

    /// Replicate an installed package. Single attempt.
    pub fn activate(&self, remote_path: &str) -> Result<UploadResult, SyncError> {
        let url = self.instance.endpoints().activate(remote_path);
        info!(instance = %self.instance.name(), "Activating package using command: {}", url);

        self.acknowledged(Operation::Activate, &url)
    }

    /// Rebuild a package definition on the instance. Single attempt.
    pub fn build(&self, remote_path: &str) -> Result<UploadResult, SyncError> {
        let url = self.instance.endpoints().build(remote_path);
        info!(instance = %self.instance.name(), "Building package using command: {}", url);

        self.acknowledged(Operation::Build, &url)
    }

    /// Delete an uploaded package. Single attempt.
    pub fn delete(&self, remote_path: &str) -> Result<OperationReport, SyncError> {
        let url = self.instance.endpoints().delete(remote_path);
        info!(instance = %self.instance.name(), "Deleting package using command: {}", url);

        let html = self
            .transport
            .post_multipart(&url, &RequestParams::new())
            .map_err(|e| self.failed(Operation::Delete, e))?;
        self.check_report(Operation::Delete, OperationReport::parse(ReportKind::Delete, &html))
    }

    /// Uninstall an installed package. Single attempt.
    pub fn uninstall(&self, remote_path: &str) -> Result<OperationReport, SyncError> {
        let url = self.instance.endpoints().uninstall(remote_path);
        info!(instance = %self.instance.name(), "Uninstalling package using command: {}", url);

        let params = RequestParams::new().text("recursive", self.options.install_recursive);
        let html = self
            .transport
            .post_multipart(&url, &params)
            .map_err(|e| self.failed(Operation::Uninstall, e))?;
        self.check_report(
            Operation::Uninstall,
            OperationReport::parse(ReportKind::Uninstall, &html),
        )
    }

    /// Upload then install.
    pub fn deploy(&self, file: &Path) -> Result<Deployment, SyncError> {
        let upload = self.upload(file)?;
        let install = self.install(&upload.path)?;

        Ok(Deployment {
            path: upload.path.clone(),
            upload,
            install,
            activation: None,
        })
    }

    /// Upload, install, then activate.
    pub fn distribute(&self, file: &Path) -> Result<Deployment, SyncError> {
        let mut deployment = self.deploy(file)?;
        deployment.activation = Some(self.activate(&deployment.path)?);
        Ok(deployment)
    }

    fn acknowledged(&self, operation: Operation, url: &str) -> Result<UploadResult, SyncError> {
        let response = self
            .transport
            .post_multipart(url, &RequestParams::new())
            .and_then(|json| UploadResult::from_json(&json))
            .map_err(|e| self.failed(operation, e))?;

        if !response.success {
            error!(
                instance = %self.instance.name(),
                "Package {} failed: {}", operation, response.message
            );
            return Err(self.rejected(operation, response.message, Vec::new()));
        }

        info!(instance = %self.instance.name(), "Package {} done: {}", operation, response.message);
        Ok(response)
    }

    /// Only success without error lines passes; every reported line is
    /// logged before the rejection is raised.
    fn check_report(
        &self,
        operation: Operation,
        report: OperationReport,
    ) -> Result<OperationReport, SyncError> {
        let name = self.instance.name();
        let message = match report.status {
            ReportStatus::Success if report.errors.is_empty() => {
                info!(instance = %name, "Package {} succeeded.", operation);
                return Ok(report);
            }
            ReportStatus::Success | ReportStatus::SuccessWithErrors => {
                warn!(instance = %name, "Package {} completed with errors.", operation);
                format!("{} completed with errors", operation)
            }
            ReportStatus::Fail => {
                error!(instance = %name, "Package {} failed.", operation);
                format!("{} incomplete", operation)
            }
        };

        for line in &report.errors {
            error!(instance = %name, "{}", line);
        }
        Err(self.rejected(operation, message, report.errors))
    }

    /// Log a transport or parser failure of a single-attempt step.
    fn failed(&self, operation: Operation, error: SyncError) -> SyncError {
        error!(instance = %self.instance.name(), "Cannot {} package: {}", operation, error);
        error
    }

    fn rejected(&self, operation: Operation, message: String, errors: Vec<String>) -> SyncError {
        SyncError::DeploymentRejected {
            operation,
            instance: self.instance.name().to_string(),
            message,
            errors,
        }
    }
}
