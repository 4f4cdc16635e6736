//! Terminal countdown shown while a retry delay elapses.

use std::time::Duration;

use console::{Term, style};
use pkgsync_core::retry::RetryProgress;

/// Rewrites a single stderr line every tick; falls back to plain lines when
/// stderr is not a terminal.
#[derive(Debug, Clone)]
pub struct ConsoleProgress {
    term: Term,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryProgress for ConsoleProgress {
    fn countdown(&self, header: &str, remaining: Duration) {
        // Progress output is best effort.
        if !self.term.is_term() {
            if remaining.is_zero() {
                let _ = self.term.write_line(header);
            }
            return;
        }

        let _ = self.term.clear_line();
        if remaining.is_zero() {
            let _ = self.term.write_line(&format!("{} {}", style("↻").cyan(), header));
        } else {
            let _ = self.term.write_str(&format!(
                "{} {} {}",
                style("↻").cyan(),
                header,
                style(format!("{}s", remaining.as_secs())).yellow()
            ));
        }
    }
}
