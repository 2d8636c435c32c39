//! Shell-style filename patterns (`*.pdf`, `sheet-??.pdf`) for batch runs.

use std::path::{Path, PathBuf};

use regex::Regex;

/// A compiled filename pattern. `*` matches any run of characters, `?`
/// matches exactly one; everything else is literal. Matching is
/// case-insensitive so `*.pdf` also picks up `PLAN.PDF`.
#[derive(Debug, Clone)]
pub struct FilePattern {
    source: String,
    regex: Regex,
}

impl FilePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::from("(?i)^");
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');
        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    /// Regular files directly inside `dir` whose names match, sorted by name.
    pub fn list(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| self.matches(n))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}
