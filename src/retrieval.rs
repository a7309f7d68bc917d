//! Background Context Retrieval
//!
//! Supplies a few grounding snippets for generated replies and promos.
//! `KnowledgeBase` is a small keyword-overlap index over local documents;
//! anything smarter plugs in behind `Retriever`.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("valid regex"));

/// Terms too common to say anything about relevance
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on", "or", "that",
    "the", "this", "to", "with", "you", "your",
];

/// Ranked snippet lookup
pub trait Retriever: Send + Sync {
    fn relevant_context(&self, query: &str, top_k: usize) -> Vec<String>;
}

/// Retriever with nothing to say
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl Retriever for NoContext {
    fn relevant_context(&self, _query: &str, _top_k: usize) -> Vec<String> {
        Vec::new()
    }
}

fn terms(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(t))
        .map(String::from)
        .collect()
}

struct Passage {
    text: String,
    terms: HashSet<String>,
}

/// Keyword-overlap index over blank-line separated passages
#[derive(Default)]
pub struct KnowledgeBase {
    passages: Vec<Passage>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every `.md` / `.txt` file directly inside `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let mut kb = Self::new();
        let mut files: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("md") | Some("txt")
                    )
            })
            .collect();
        files.sort();

        for path in files {
            match std::fs::read_to_string(&path) {
                Ok(text) => kb.add_document(&text),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }
        info!("Knowledge base: {} passage(s) from {}", kb.len(), dir.display());
        Ok(kb)
    }

    /// Split a document into passages and index them
    pub fn add_document(&mut self, text: &str) {
        for chunk in text.split("\n\n") {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            self.passages.push(Passage {
                text: chunk.to_string(),
                terms: terms(chunk),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

impl Retriever for KnowledgeBase {
    fn relevant_context(&self, query: &str, top_k: usize) -> Vec<String> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, usize)> = self
            .passages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.terms.intersection(&query_terms).count(), i))
            .filter(|(score, _)| *score > 0)
            .collect();
        // Higher score first, earlier passage on ties
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, i)| self.passages[i].text.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> KnowledgeBase {
        let mut kb = KnowledgeBase::new();
        kb.add_document(
            "API keys live at the dashboard.\n\nGPU owners earn tokens for inference.\n\nThe Python SDK wraps the API.",
        );
        kb
    }

    #[test]
    fn test_ranks_by_overlap() {
        let kb = sample();
        assert_eq!(kb.len(), 3);
        let hits = kb.relevant_context("python api sdk", 2);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].contains("Python SDK"));
        assert!(hits[1].contains("API keys"));
    }

    #[test]
    fn test_no_overlap_returns_nothing() {
        assert!(sample().relevant_context("weather forecast", 5).is_empty());
        assert!(NoContext.relevant_context("api", 5).is_empty());
    }

    #[test]
    fn test_load_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.md"), "Fair launch in 2023.\n\nStaking on site.").unwrap();
        std::fs::write(dir.path().join("b.txt"), "Bridge on site.").unwrap();
        std::fs::write(dir.path().join("c.bin"), "ignored site").unwrap();

        let kb = KnowledgeBase::load(dir.path()).unwrap();
        assert_eq!(kb.len(), 3);
        assert_eq!(kb.relevant_context("site", 10).len(), 2);
    }
}
