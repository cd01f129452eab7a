// src/workflow/matcher.rs

//! Path predicates for workflows: regexes and globs, OR-ed together.

use std::path::Path;

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::errors::{DirflowError, Result};

#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    regexes: Vec<Regex>,
    globs: Vec<GlobMatcher>,
}

impl PathMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_regex(&mut self, pattern: &str) -> Result<()> {
        let re = Regex::new(pattern).map_err(|e| DirflowError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.regexes.push(re);
        Ok(())
    }

    pub fn add_glob(&mut self, pattern: &str) -> Result<()> {
        let glob = Glob::new(pattern).map_err(|e| DirflowError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.globs.push(glob.compile_matcher());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.regexes.is_empty() && self.globs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regexes.len() + self.globs.len()
    }

    /// Regexes are tried against the full path string; globs against the
    /// path itself.
    pub fn is_match(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.regexes.iter().any(|re| re.is_match(&text))
            || self.globs.iter().any(|g| g.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_pattern_matching_is_enough() {
        let mut m = PathMatcher::new();
        m.add_regex(r"\.go$").unwrap();
        m.add_glob("**/*.scss").unwrap();

        assert!(m.is_match(Path::new("/src/main.go")));
        assert!(m.is_match(Path::new("/web/css/site.scss")));
        assert!(!m.is_match(Path::new("/web/site.css")));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn invalid_patterns_fail_at_construction() {
        let mut m = PathMatcher::new();
        assert!(matches!(
            m.add_regex("(unclosed"),
            Err(DirflowError::InvalidPattern { .. })
        ));
        assert!(matches!(
            m.add_glob("a/[b"),
            Err(DirflowError::InvalidPattern { .. })
        ));
        assert!(m.is_empty());
    }
}
