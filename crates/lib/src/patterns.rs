//! Redesign-pattern reference data: a name-keyed table of process redesign
//! patterns the assistant can cite when proposing waiting-time reductions.
//!
//! A bundled default is compiled in; deployments can override it with a local
//! JSON file (see `config::resolve_patterns_path`). Lookups are all-or-nothing:
//! one unknown name makes the whole lookup fail with the missing names and the
//! full list of valid names, so the assistant never mistakes partial data for a
//! complete answer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

static BUNDLED_PATTERNS: &str = include_str!("../config/redesign_patterns.json");

/// One redesign pattern: name, reference text, and the waiting-time causes it addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    pub name: String,
    pub description: String,
    /// Waiting-time causes this pattern targets (e.g. "batching", "contention").
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Names that were requested but are not in the book, plus the valid names.
#[derive(Debug, Clone)]
pub struct MissingPatterns {
    pub missing: Vec<String>,
    pub valid_names: Vec<String>,
}

/// The loaded pattern table. Order follows the source file.
pub struct PatternBook {
    entries: Vec<PatternEntry>,
}

impl PatternBook {
    /// Load from the given file, or the bundled defaults when `path` is None.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let entries: Vec<PatternEntry> = match path {
            Some(p) => {
                let s = std::fs::read_to_string(p)
                    .with_context(|| format!("reading redesign patterns from {}", p.display()))?;
                serde_json::from_str(&s)
                    .with_context(|| format!("parsing redesign patterns from {}", p.display()))?
            }
            None => serde_json::from_str(BUNDLED_PATTERNS)
                .context("parsing bundled redesign patterns")?,
        };
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PatternEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// All valid pattern names, in book order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Look up the requested names. Succeeds only when every name is known;
    /// otherwise returns the missing names and the full valid list.
    pub fn lookup(&self, names: &[String]) -> Result<Vec<&PatternEntry>, MissingPatterns> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| self.get(n).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(MissingPatterns {
                missing,
                valid_names: self.names(),
            });
        }
        Ok(names.iter().filter_map(|n| self.get(n)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> PatternBook {
        PatternBook::load(None).expect("bundled patterns parse")
    }

    #[test]
    fn bundled_book_loads_and_includes_triage() {
        let book = bundled();
        assert!(!book.is_empty());
        let triage = book.get("Triage").expect("Triage present");
        assert!(!triage.description.is_empty());
    }

    #[test]
    fn lookup_returns_entries_in_request_order() {
        let book = bundled();
        let found = book
            .lookup(&["Parallelism".to_string(), "Triage".to_string()])
            .expect("both known");
        assert_eq!(found[0].name, "Parallelism");
        assert_eq!(found[1].name, "Triage");
    }

    #[test]
    fn lookup_is_all_or_nothing() {
        let book = bundled();
        let err = book
            .lookup(&["Triage".to_string(), "Nonexistent".to_string()])
            .expect_err("unknown name fails the whole lookup");
        assert_eq!(err.missing, vec!["Nonexistent".to_string()]);
        assert!(err.valid_names.contains(&"Triage".to_string()));
        assert_eq!(err.valid_names.len(), book.len());
    }

    #[test]
    fn load_from_file_overrides_bundled() {
        let dir = std::env::temp_dir().join("kronos-chat-patterns-test");
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("patterns.json");
        std::fs::write(
            &path,
            r#"[{"name": "Only One", "description": "just this"}]"#,
        )
        .expect("write pattern file");
        let book = PatternBook::load(Some(&path)).expect("load from file");
        assert_eq!(book.len(), 1);
        assert!(book.get("Only One").is_some());
        assert!(book.get("Triage").is_none());
    }
}
