//! Every failed step leaves an error line naming the instance and the cause.

mod support;

use std::io::Write;
use std::sync::{Arc, Mutex};

use pkgsync_core::error::SyncError;
use support::{ScriptedTransport, client, fast_options};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn with_captured_logs<T>(run: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, run);
    (result, logs.contents())
}

fn error_lines(logs: &str) -> Vec<&str> {
    logs.lines().filter(|line| line.contains("ERROR")).collect()
}

#[test]
fn test_failed_delete_is_logged() {
    let sync = client(
        ScriptedTransport::new().fail("503 Service Unavailable"),
        fast_options(0, 0),
    );

    let (result, logs) = with_captured_logs(|| sync.delete("/etc/packages/my/pkg.zip"));

    assert!(matches!(result, Err(SyncError::RemoteRequestFailed { .. })));
    let errors = error_lines(&logs);
    assert_eq!(errors.len(), 1, "logs: {}", logs);
    assert!(errors[0].contains("local-author"));
    assert!(errors[0].contains("Cannot delete package"));
    assert!(errors[0].contains("503 Service Unavailable"));
}

#[test]
fn test_exhausted_install_is_logged() {
    let sync = client(
        ScriptedTransport::new().fail_times(2, "500 Internal Server Error"),
        fast_options(0, 1),
    );

    let (result, logs) = with_captured_logs(|| sync.install("/etc/packages/my/pkg.zip"));

    assert!(result.is_err());
    let errors = error_lines(&logs);
    assert_eq!(errors.len(), 1, "logs: {}", logs);
    assert!(errors[0].contains("Cannot install on local-author"));
    assert!(errors[0].contains("500 Internal Server Error"));
}

#[test]
fn test_missing_upload_file_is_logged() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let missing = temp.path().join("absent.zip");
    let sync = client(ScriptedTransport::new(), fast_options(3, 0));

    let (result, logs) = with_captured_logs(|| sync.upload(&missing));

    assert!(result.is_err());
    let errors = error_lines(&logs);
    assert_eq!(errors.len(), 1, "logs: {}", logs);
    assert!(errors[0].contains("absent.zip"));
}

#[test]
fn test_malformed_activation_is_logged() {
    let sync = client(
        ScriptedTransport::new().respond("<html>Login</html>"),
        fast_options(0, 0),
    );

    let (result, logs) = with_captured_logs(|| sync.activate("/etc/packages/my/pkg.zip"));

    assert!(matches!(result, Err(SyncError::MalformedResponse { .. })));
    let errors = error_lines(&logs);
    assert_eq!(errors.len(), 1, "logs: {}", logs);
    assert!(errors[0].contains("Cannot activate package"));
}

#[test]
fn test_failed_listing_is_logged() {
    let mut sync = client(
        ScriptedTransport::new().fail("401 Unauthorized"),
        fast_options(0, 0),
    );

    let (failed, logs) = with_captured_logs(|| sync.list_packages(true).is_err());

    assert!(failed);
    let errors = error_lines(&logs);
    assert_eq!(errors.len(), 1, "logs: {}", logs);
    assert!(errors[0].contains("Cannot list packages"));
    assert!(errors[0].contains("401 Unauthorized"));
}

#[test]
fn test_failed_reload_is_logged() {
    let sync = client(
        ScriptedTransport::new().fail("502 Bad Gateway"),
        fast_options(0, 0),
    );

    let (result, logs) = with_captured_logs(|| sync.reload());

    assert!(matches!(result, Err(SyncError::InstanceUnreachable { .. })));
    assert!(
        error_lines(&logs)
            .iter()
            .any(|line| line.contains("502 Bad Gateway")),
        "logs: {}",
        logs
    );
}
