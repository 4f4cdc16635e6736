//! Decoders for package manager responses.
//!
//! JSON endpoints (package listing, upload acknowledgement) are decoded with
//! `serde`; install/delete/uninstall answer with an HTML progress page which
//! is scraped by [`html_report`]. Nothing outside this module depends on the
//! markup.

pub mod html_report;
pub mod listing;
pub mod upload;

pub use html_report::{OperationReport, ReportKind, ReportStatus};
pub use listing::{PackageListing, RemotePackage};
pub use upload::UploadResult;
