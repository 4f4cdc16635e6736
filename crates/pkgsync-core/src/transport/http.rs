//! Blocking `reqwest` implementation of [`Transport`].

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, multipart};
use tracing::{debug, trace, warn};

use super::{MultipartPart, RequestParams, Transport, normalize_url};
use crate::error::{RequestFailure, SyncError};
use crate::instance::Instance;

const USER_AGENT: &str = concat!("pkgsync/", env!("CARGO_PKG_VERSION"));

/// Attempts made when transport-level retries are enabled.
const TRANSPORT_ATTEMPTS: usize = 3;

/// Connection settings shared by every request to an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Applies to establishing the connection only; long installs are not cut off
    pub timeout: Duration,
    /// Accept self-signed certificates and mismatching host names
    pub untrusted_ssl: bool,
    /// Re-send a request whose connection could not be established
    pub retries: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            untrusted_ssl: true,
            retries: true,
        }
    }
}

/// HTTP transport bound to one instance's credentials.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    user: String,
    password: String,
    retries: bool,
}

impl HttpTransport {
    pub fn new(instance: &Instance, options: &ConnectionOptions) -> Result<Self, SyncError> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(options.timeout)
            .timeout(None::<Duration>);

        if options.untrusted_ssl {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let client = builder
            .build()
            .map_err(|e| SyncError::request(instance.url(), RequestFailure::Transport(e)))?;

        Ok(Self {
            client,
            user: instance.user().to_string(),
            password: instance.password().to_string(),
            retries: options.retries,
        })
    }

    /// Send a request built by `build`, mapping any failure to `RemoteRequestFailed`.
    ///
    /// The builder is invoked once per attempt since multipart bodies cannot
    /// be replayed.
    fn execute<F>(&self, url: &str, build: F) -> Result<String, SyncError>
    where
        F: Fn(&Client, &str) -> Result<RequestBuilder, RequestFailure>,
    {
        let url = normalize_url(url);
        let attempts = if self.retries { TRANSPORT_ATTEMPTS } else { 1 };

        let mut attempt = 1;
        let response = loop {
            let request = build(&self.client, &url)
                .map_err(|failure| SyncError::request(&url, failure))?
                .basic_auth(&self.user, Some(&self.password));

            match request.send() {
                Ok(response) => break response,
                Err(e) if e.is_connect() && attempt < attempts => {
                    warn!(url = %url, attempt, "connection failed, retrying: {}", e);
                    attempt += 1;
                }
                Err(e) => return Err(SyncError::request(&url, RequestFailure::Transport(e))),
            }
        };

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SyncError::request(&url, RequestFailure::Transport(e)))?;

        if status.is_success() {
            trace!(url = %url, "response body: {}", body);
            Ok(body)
        } else {
            debug!(url = %url, "unexpected response body: {}", body);
            Err(SyncError::request(
                &url,
                RequestFailure::Status(status.to_string()),
            ))
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String, SyncError> {
        self.execute(url, |client, url| Ok(client.get(url)))
    }

    fn post_form(&self, url: &str, params: &RequestParams) -> Result<String, SyncError> {
        let pairs = params.form_pairs();
        self.execute(url, |client, url| Ok(client.post(url).form(&pairs)))
    }

    fn post_multipart(&self, url: &str, params: &RequestParams) -> Result<String, SyncError> {
        self.execute(url, |client, url| {
            let form = multipart_form(params)?;
            Ok(client.post(url).multipart(form))
        })
    }
}

fn multipart_form(params: &RequestParams) -> Result<multipart::Form, RequestFailure> {
    let mut form = multipart::Form::new();
    for part in params.multipart_parts() {
        form = match part {
            MultipartPart::Text { name, value } => form.text(name.to_string(), value.to_string()),
            MultipartPart::File { name, path } => form
                .file(name.to_string(), path)
                .map_err(RequestFailure::Io)?,
        };
    }
    Ok(form)
}
