//! Wildcard matching (`*` any run, `?` one character) for file names and
//! instance names.

use std::path::Path;

use regex::Regex;

#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Self {
        let mut translated = String::with_capacity(pattern.len() + 8);
        translated.push('^');
        for c in pattern.chars() {
            match c {
                '*' => translated.push_str(".*"),
                '?' => translated.push('.'),
                other => translated.push_str(&regex::escape(&other.to_string())),
            }
        }
        translated.push('$');

        // Every character outside the wildcards is escaped above.
        let regex = Regex::new(&translated).expect("escaped wildcard is a valid regex");
        Self {
            source: pattern.to_string(),
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Match against the file name, then against the full path.
    pub fn matches_path(&self, path: &Path) -> bool {
        let by_name = path
            .file_name()
            .map(|name| self.matches(&name.to_string_lossy()))
            .unwrap_or(false);
        by_name || self.matches(&path.to_string_lossy())
    }
}

/// Whether `path` matches any of the given wildcard patterns.
pub fn matches_any<S: AsRef<str>>(path: &Path, patterns: &[S]) -> bool {
    patterns
        .iter()
        .any(|p| WildcardPattern::new(p.as_ref()).matches_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_any_run() {
        let pattern = WildcardPattern::new("*-SNAPSHOT.zip");
        assert!(pattern.matches("site-1.0.0-SNAPSHOT.zip"));
        assert!(!pattern.matches("site-1.0.0.zip"));
    }

    #[test]
    fn question_mark_matches_single_character() {
        let pattern = WildcardPattern::new("local-?ublish");
        assert!(pattern.matches("local-publish"));
        assert!(!pattern.matches("local-ppublish"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let pattern = WildcardPattern::new("pkg(1).zip");
        assert!(pattern.matches("pkg(1).zip"));
        assert!(!pattern.matches("pkg1Xzip"));
    }

    #[test]
    fn matches_file_name_or_full_path() {
        let path = Path::new("/build/distributions/site-SNAPSHOT.zip");
        assert!(matches_any(path, &["*SNAPSHOT*"]));
        assert!(matches_any(path, &["/build/*"]));
        assert!(!matches_any(path, &["*.jar"]));
        assert!(!matches_any::<&str>(path, &[]));
    }
}
