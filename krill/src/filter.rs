use crate::types::{AggregatorError, Result, StreamItem};
use regex::Regex;

/// Compiled filter patterns. An empty set accepts everything.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    patterns: Vec<Regex>,
}

impl FilterSet {
    /// Compile every pattern, failing on the first invalid one.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let pattern = p.as_ref();
                Regex::new(pattern).map_err(|source| AggregatorError::Pattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn matches(&self, item: &StreamItem) -> bool {
        matches(item, &self.patterns)
    }

    /// First pattern, in configured order, found in `text`.
    pub fn first_match(&self, text: &str) -> Option<&Regex> {
        self.patterns.iter().find(|p| p.is_match(text))
    }
}

/// True iff `patterns` is empty or any of them occurs in the item text.
pub fn matches(item: &StreamItem, patterns: &[Regex]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| p.is_match(&item.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(text: &str) -> StreamItem {
        StreamItem {
            identity: text.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            source_locator: "test".to_string(),
            source_name: None,
            link: None,
        }
    }

    #[test]
    fn empty_set_matches_everything() {
        let filters = FilterSet::compile::<&str>(&[]).unwrap();
        assert!(filters.is_empty());
        assert!(filters.matches(&item("anything")));
        assert!(filters.matches(&item("")));
    }

    #[test]
    fn any_pattern_is_enough() {
        let filters = FilterSet::compile(&["alpha", "beta"]).unwrap();
        assert!(filters.matches(&item("this is alpha")));
        assert!(filters.matches(&item("beta blockers")));
        assert!(!filters.matches(&item("gamma")));
    }

    #[test]
    fn matching_is_case_sensitive_unless_asked() {
        let strict = FilterSet::compile(&["Rust"]).unwrap();
        assert!(!strict.matches(&item("rust never sleeps")));

        let loose = FilterSet::compile(&["(?i)Rust"]).unwrap();
        assert!(loose.matches(&item("rust never sleeps")));
    }

    #[test]
    fn regex_syntax_is_supported() {
        let filters = FilterSet::compile(&[r"\bv\d+\.\d+\b"]).unwrap();
        assert!(filters.matches(&item("released v1.2 today")));
        assert!(!filters.matches(&item("released today")));
    }

    #[test]
    fn first_match_follows_configured_order() {
        let filters = FilterSet::compile(&["beta", "alpha"]).unwrap();
        let found = filters.first_match("alpha and beta").unwrap();
        assert_eq!(found.as_str(), "beta");
        assert!(filters.first_match("gamma").is_none());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = FilterSet::compile(&["ok", "(unclosed"]).unwrap_err();
        match err {
            AggregatorError::Pattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
