#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use pkgsync_core::error::{RequestFailure, SyncError};
use pkgsync_core::instance::Instance;
use pkgsync_core::package::DESCRIPTOR_ENTRY;
use pkgsync_core::retry::RetryPolicy;
use pkgsync_core::sync::{InstanceSync, SyncOptions};
use pkgsync_core::transport::{ParamValue, RequestParams, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    PostForm,
    PostMultipart,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub params: RequestParams,
}

impl RecordedCall {
    pub fn text_param(&self, name: &str) -> Option<String> {
        self.params.iter().find_map(|(key, value)| match value {
            ParamValue::Text(text) if key == name => Some(text.clone()),
            _ => None,
        })
    }
}

/// Replays canned responses in order and records every call.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<String, SyncError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, body: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(body.into()));
        self
    }

    pub fn fail(self, status: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(status_failure(status)));
        self
    }

    pub fn fail_times(mut self, times: usize, status: &str) -> Self {
        for _ in 0..times {
            self = self.fail(status);
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, method: Method, url: &str, params: &RequestParams) -> Result<String, SyncError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            params: params.clone(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(status_failure("599 No Scripted Response")))
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<String, SyncError> {
        self.record(Method::Get, url, &RequestParams::new())
    }

    fn post_form(&self, url: &str, params: &RequestParams) -> Result<String, SyncError> {
        self.record(Method::PostForm, url, params)
    }

    fn post_multipart(&self, url: &str, params: &RequestParams) -> Result<String, SyncError> {
        self.record(Method::PostMultipart, url, params)
    }
}

pub fn status_failure(status: &str) -> SyncError {
    SyncError::request(
        "http://localhost:4502",
        RequestFailure::Status(status.to_string()),
    )
}

pub fn local_author() -> Instance {
    Instance::new("local-author", "http://localhost:4502", "admin", "admin")
}

/// Options with instant retries so tests never sleep.
pub fn fast_options(upload_retries: u32, install_retries: u32) -> SyncOptions {
    SyncOptions {
        upload_retry: RetryPolicy::new(upload_retries, Duration::ZERO),
        install_retry: RetryPolicy::new(install_retries, Duration::ZERO),
        ..SyncOptions::default()
    }
}

pub fn client(transport: ScriptedTransport, options: SyncOptions) -> InstanceSync<ScriptedTransport> {
    InstanceSync::new(local_author(), transport, options)
}

pub fn upload_ok(path: &str) -> String {
    format!(
        r#"{{"success":true,"msg":"Package uploaded","path":"{}"}}"#,
        path
    )
}

pub const INSTALL_OK: &str = r#"<html><body>
<span class="I"><b>I</b>&nbsp;Installing content</span><br>
<span class="Package imported.">Package imported.</span>
</body></html>"#;

pub const REPLICATE_OK: &str = r#"{"success":true,"msg":"Package replicated"}"#;

/// Write a package archive carrying a descriptor with the given identity.
pub fn write_package(dir: &Path, file_name: &str, group: &str, name: &str, version: &str) -> PathBuf {
    let path = dir.join(file_name);
    let file = std::fs::File::create(&path).expect("Failed to create package");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    zip.start_file(DESCRIPTOR_ENTRY, options)
        .expect("Failed to start descriptor");
    write!(
        zip,
        r#"<?xml version="1.0" encoding="utf-8"?>
<properties>
<entry key="group">{}</entry>
<entry key="name">{}</entry>
<entry key="version">{}</entry>
</properties>"#,
        group, name, version
    )
    .expect("Failed to write descriptor");

    zip.start_file("jcr_root/apps/.content.xml", options)
        .expect("Failed to start content");
    zip.write_all(b"<jcr:root/>").expect("Failed to write content");

    zip.finish().expect("Failed to finish package");
    path
}
