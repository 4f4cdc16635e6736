//! Authenticated HTTP calls against a remote instance.
//!
//! The [`Transport`] trait is the seam between the package lifecycle client
//! and the network: the production implementation is [`HttpTransport`],
//! tests substitute a scripted one.

pub mod http;

use std::path::{Path, PathBuf};

use crate::error::SyncError;

pub use http::{ConnectionOptions, HttpTransport};

/// Performs a single authenticated request and normalizes failures.
///
/// Every failure (non-success status or transport fault) is reported as
/// [`SyncError::RemoteRequestFailed`].
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<String, SyncError>;

    fn post_form(&self, url: &str, params: &RequestParams) -> Result<String, SyncError>;

    fn post_multipart(&self, url: &str, params: &RequestParams) -> Result<String, SyncError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, url: &str) -> Result<String, SyncError> {
        (**self).get(url)
    }

    fn post_form(&self, url: &str, params: &RequestParams) -> Result<String, SyncError> {
        (**self).post_form(url, params)
    }

    fn post_multipart(&self, url: &str, params: &RequestParams) -> Result<String, SyncError> {
        (**self).post_multipart(url, params)
    }
}

/// Value of a single request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    File(PathBuf),
}

/// Ordered request parameters (field name to value).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    entries: Vec<(String, ParamValue)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar parameter, stringified.
    pub fn text(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.entries
            .push((name.into(), ParamValue::Text(value.to_string())));
        self
    }

    /// Add a file attachment.
    pub fn file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.entries.push((name.into(), ParamValue::File(path.into())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Text pairs for a url-encoded form. Files are sent as their path.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    ParamValue::Text(text) => text.clone(),
                    ParamValue::File(path) => path.display().to_string(),
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// Parts that make it into a multipart body.
    ///
    /// A file is attached only if it exists on disk; a scalar is skipped when
    /// its stringified value is blank.
    pub fn multipart_parts(&self) -> Vec<MultipartPart<'_>> {
        self.entries
            .iter()
            .filter_map(|(name, value)| match value {
                ParamValue::File(path) => path.is_file().then_some(MultipartPart::File {
                    name,
                    path: path.as_path(),
                }),
                ParamValue::Text(text) => (!text.trim().is_empty()).then_some(MultipartPart::Text {
                    name,
                    value: text,
                }),
            })
            .collect()
    }
}

/// A part of an outgoing multipart body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartPart<'a> {
    Text { name: &'a str, value: &'a str },
    File { name: &'a str, path: &'a Path },
}

/// Percent-encode spaces so the URL parses; nothing else is touched.
pub fn normalize_url(url: &str) -> String {
    url.replace(' ', "%20")
}
