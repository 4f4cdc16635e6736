//! Reads the package identity out of a package archive.
//!
//! The archive carries `META-INF/vault/properties.xml`, a Java properties XML
//! document with `<entry key="group|name|version">` elements.

use std::io::Read;
use std::path::Path;

use regex::Regex;

use super::PackageIdentity;
use crate::error::{RequestFailure, SyncError};

pub const DESCRIPTOR_ENTRY: &str = "META-INF/vault/properties.xml";

pub fn read_identity(archive_path: &Path) -> Result<PackageIdentity, SyncError> {
    if !archive_path.is_file() {
        return Err(SyncError::request(
            archive_path.display().to_string(),
            RequestFailure::FileNotFound(archive_path.to_path_buf()),
        ));
    }

    let invalid = |reason: String| SyncError::InvalidPackage {
        path: archive_path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(archive_path).map_err(|e| invalid(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| invalid(e.to_string()))?;
    let mut entry = archive
        .by_name(DESCRIPTOR_ENTRY)
        .map_err(|_| invalid(format!("missing {}", DESCRIPTOR_ENTRY)))?;

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| invalid(format!("unreadable {}: {}", DESCRIPTOR_ENTRY, e)))?;

    Ok(parse_identity(&xml))
}

/// Extract group, name and version from the descriptor XML. Missing keys
/// stay blank.
pub fn parse_identity(xml: &str) -> PackageIdentity {
    PackageIdentity::new(
        entry_value(xml, "group"),
        entry_value(xml, "name"),
        entry_value(xml, "version"),
    )
}

fn entry_value(xml: &str, key: &str) -> String {
    let pattern = format!(
        r#"(?s)<entry\s+key\s*=\s*["']{}["']\s*>(.*?)</entry>"#,
        regex::escape(key)
    );
    Regex::new(&pattern)
        .ok()
        .and_then(|re| re.captures(xml))
        .and_then(|caps| caps.get(1))
        .map(|m| unescape_xml(m.as_str().trim()))
        .unwrap_or_default()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
