//! `HttpTransport` against a loopback server that records raw requests.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use pkgsync_core::error::{RequestFailure, SyncError};
use pkgsync_core::instance::Instance;
use pkgsync_core::transport::{ConnectionOptions, HttpTransport, RequestParams, Transport};
use tempfile::TempDir;

/// Request as seen on the wire; the head is lower-cased.
#[derive(Debug)]
struct RawRequest {
    request_line: String,
    head: String,
    body: String,
}

/// Serve one scripted response per connection, then stop.
fn serve(responses: Vec<(&'static str, &'static str)>) -> (String, JoinHandle<Vec<RawRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind loopback listener");
    let base = format!("http://{}", listener.local_addr().expect("Failed to read address"));

    let handle = std::thread::spawn(move || {
        responses
            .into_iter()
            .map(|(status, body)| {
                let (mut stream, _) = listener.accept().expect("Failed to accept connection");
                stream
                    .set_read_timeout(Some(Duration::from_secs(10)))
                    .expect("Failed to set read timeout");
                let request = read_request(&mut stream);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream
                    .write_all(response.as_bytes())
                    .expect("Failed to write response");
                request
            })
            .collect()
    });

    (base, handle)
}

fn read_request(stream: &mut TcpStream) -> RawRequest {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .expect("Failed to read request line");

    let mut head = String::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("Failed to read header");
        if line == "\r\n" || line.is_empty() {
            break;
        }
        head.push_str(&line.to_ascii_lowercase());
    }

    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .map(|value| value.trim().parse::<usize>().expect("Invalid content length"));

    let body = match content_length {
        Some(length) => {
            let mut body = vec![0; length];
            reader.read_exact(&mut body).expect("Failed to read body");
            body
        }
        None if head.contains("transfer-encoding: chunked") => read_chunked(&mut reader),
        None => Vec::new(),
    };

    RawRequest {
        request_line: request_line.trim_end().to_string(),
        head,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

fn read_chunked(reader: &mut impl BufRead) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line).expect("Failed to read chunk size");
        let size = usize::from_str_radix(size_line.trim(), 16).expect("Invalid chunk size");
        let mut chunk = vec![0; size + 2];
        reader.read_exact(&mut chunk).expect("Failed to read chunk");
        if size == 0 {
            return body;
        }
        body.extend_from_slice(&chunk[..size]);
    }
}

fn transport_for(base: &str, retries: bool) -> HttpTransport {
    let instance = Instance::new("local-author", base, "admin", "admin");
    let options = ConnectionOptions {
        timeout: Duration::from_secs(2),
        retries,
        ..ConnectionOptions::default()
    };
    HttpTransport::new(&instance, &options).expect("Failed to build transport")
}

// ============================================================================
// Request shape
// ============================================================================

#[test]
fn test_get_sends_basic_auth_and_encodes_spaces() {
    let (base, server) = serve(vec![("200 OK", "{}")]);
    let transport = transport_for(&base, true);

    let body = transport
        .get(&format!("{}/etc/packages/my group/a.zip", base))
        .expect("Request should succeed");

    let requests = server.join().expect("Server thread panicked");
    assert_eq!(body, "{}");
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].request_line,
        "GET /etc/packages/my%20group/a.zip HTTP/1.1"
    );
    // admin:admin, sent without waiting for a challenge
    assert!(
        requests[0]
            .head
            .contains("authorization: basic ywrtaw46ywrtaw4="),
        "head: {}",
        requests[0].head
    );
}

#[test]
fn test_form_post_encodes_params() {
    let (base, server) = serve(vec![("200 OK", "")]);
    let transport = transport_for(&base, true);

    let params = RequestParams::new().text("shutdown_type", "Restart");
    transport
        .post_form(&format!("{}/system/console/vmstat", base), &params)
        .expect("Request should succeed");

    let requests = server.join().expect("Server thread panicked");
    assert!(requests[0].request_line.starts_with("POST /system/console/vmstat "));
    assert!(
        requests[0]
            .head
            .contains("content-type: application/x-www-form-urlencoded")
    );
    assert_eq!(requests[0].body, "shutdown_type=Restart");
}

#[test]
fn test_multipart_skips_missing_files_and_blank_values() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let present = temp.path().join("present.zip");
    std::fs::write(&present, b"archive-bytes").expect("Failed to write archive");

    let (base, server) = serve(vec![("200 OK", "{}")]);
    let transport = transport_for(&base, true);

    let params = RequestParams::new()
        .file("package", temp.path().join("absent.zip"))
        .file("attachment", present.clone())
        .text("force", true)
        .text("comment", "   ");
    transport
        .post_multipart(&format!("{}/crx/packmgr/service/.json/?cmd=upload", base), &params)
        .expect("Request should succeed");

    let requests = server.join().expect("Server thread panicked");
    let body = &requests[0].body;
    assert!(requests[0].head.contains("content-type: multipart/form-data"));
    assert!(!body.contains("name=\"package\""), "body: {}", body);
    assert!(!body.contains("name=\"comment\""), "body: {}", body);
    assert!(body.contains("name=\"force\""));
    assert!(body.contains("true"));
    assert!(body.contains("name=\"attachment\""));
    assert!(body.contains("archive-bytes"));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_error_status_maps_to_request_failure_without_retry() {
    let (base, server) = serve(vec![
        ("500 Internal Server Error", "stack trace"),
        ("200 OK", "second"),
    ]);
    let transport = transport_for(&base, true);
    let url = format!("{}/crx/packmgr/list.jsp", base);

    let err = transport.get(&url).unwrap_err();
    match &err {
        SyncError::RemoteRequestFailed {
            url: failed_url,
            failure: RequestFailure::Status(status),
        } => {
            assert_eq!(failed_url, &url);
            assert_eq!(status, "500 Internal Server Error");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.to_string().contains("stack trace"));

    // The status failure was not re-sent, so the next response is still queued.
    assert_eq!(transport.get(&url).expect("Request should succeed"), "second");
    assert_eq!(server.join().expect("Server thread panicked").len(), 2);
}

#[test]
fn test_refused_connection_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind loopback listener");
    let base = format!("http://{}", listener.local_addr().expect("Failed to read address"));
    drop(listener);

    for retries in [true, false] {
        let err = transport_for(&base, retries)
            .get(&format!("{}/system/console/bundles.json", base))
            .unwrap_err();
        assert!(
            matches!(
                err,
                SyncError::RemoteRequestFailed {
                    failure: RequestFailure::Transport(_),
                    ..
                }
            ),
            "unexpected error: {err}"
        );
    }
}
