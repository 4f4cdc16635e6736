//! Scraper for the HTML progress page of install, delete and uninstall.
//!
//! The package manager streams a log as `<span class="E"><b>E</b>&nbsp;...</span>`
//! lines and ends with a status line such as `Package imported.` or
//! `Package imported (with errors, check logs!)`. Matching is done on text
//! patterns so whitespace, quoting and letter case may vary.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<span\s+class\s*=\s*["']?E["']?\s*>\s*<b>\s*E\s*</b>(?:\s|&nbsp;|&#160;)*(.*?)\s*</span>"#,
    )
    .expect("error line pattern is valid")
});

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Success,
    SuccessWithErrors,
    Fail,
}

/// Which command produced the page; decides the status wording searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Install,
    Delete,
    Uninstall,
}

impl ReportKind {
    fn verb(self) -> &'static str {
        match self {
            ReportKind::Install => "imported",
            ReportKind::Delete => "deleted",
            ReportKind::Uninstall => "uninstalled",
        }
    }
}

/// Outcome of an install, delete or uninstall call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReport {
    pub kind: ReportKind,
    pub status: ReportStatus,
    /// Error lines in the order the server reported them
    pub errors: Vec<String>,
}

impl OperationReport {
    /// Classify a raw HTML page. Never fails: a page without a recognizable
    /// status line is reported as [`ReportStatus::Fail`].
    pub fn parse(kind: ReportKind, html: &str) -> Self {
        let mut errors = extract_errors(html);

        let status = match classify(kind, html) {
            Some(status) => status,
            None => {
                if errors.is_empty() {
                    errors.push(format!(
                        "no '{}' status found in instance response",
                        kind.verb()
                    ));
                }
                ReportStatus::Fail
            }
        };

        Self {
            kind,
            status,
            errors,
        }
    }

    /// Success with no reported error line is the only clean outcome.
    pub fn is_clean(&self) -> bool {
        self.status == ReportStatus::Success && self.errors.is_empty()
    }
}

/// Status lines for one command's verb.
struct StatusPatterns {
    with_errors: Regex,
    success: Regex,
}

impl StatusPatterns {
    fn for_verb(verb: &str) -> Self {
        Self {
            with_errors: Regex::new(&format!(r"(?i)Package\s+{verb}\s*\(\s*with\s+errors"))
                .expect("status pattern is valid"),
            success: Regex::new(&format!(r"(?i)Package\s+{verb}(?:\s*\.|\s+in\s+\d+\s*ms)"))
                .expect("status pattern is valid"),
        }
    }
}

static INSTALL_STATUS: LazyLock<StatusPatterns> =
    LazyLock::new(|| StatusPatterns::for_verb(ReportKind::Install.verb()));
static DELETE_STATUS: LazyLock<StatusPatterns> =
    LazyLock::new(|| StatusPatterns::for_verb(ReportKind::Delete.verb()));
static UNINSTALL_STATUS: LazyLock<StatusPatterns> =
    LazyLock::new(|| StatusPatterns::for_verb(ReportKind::Uninstall.verb()));

fn classify(kind: ReportKind, html: &str) -> Option<ReportStatus> {
    let patterns: &StatusPatterns = match kind {
        ReportKind::Install => &*INSTALL_STATUS,
        ReportKind::Delete => &*DELETE_STATUS,
        ReportKind::Uninstall => &*UNINSTALL_STATUS,
    };

    if patterns.with_errors.is_match(html) {
        Some(ReportStatus::SuccessWithErrors)
    } else if patterns.success.is_match(html) {
        Some(ReportStatus::Success)
    } else {
        None
    }
}

fn extract_errors(html: &str) -> Vec<String> {
    ERROR_LINE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_text(m.as_str()))
        .filter(|line| !line.is_empty())
        .collect()
}

fn decode_text(fragment: &str) -> String {
    let text = MARKUP_TAG.replace_all(fragment, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.trim().to_string()
}
