//! Hand-written promo posts
//!
//! Markdown blocks separated by a `---` line. Each block may carry
//! `submolt:` and `title:` lines; everything else is the body.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n-{3,}\n").expect("valid regex"));

/// One promo from the file
#[derive(Debug, Clone, PartialEq)]
pub struct PromoDraft {
    pub submolt: Option<String>,
    pub title: String,
    pub content: String,
}

/// Load promos from `path`; a missing file yields none
pub fn load_promos(path: &Path) -> std::io::Result<Vec<PromoDraft>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_promos(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

pub fn parse_promos(text: &str) -> Vec<PromoDraft> {
    let text = text.replace("\r\n", "\n");
    SEPARATOR
        .split(&text)
        .filter_map(|block| {
            let block = block.trim();
            if block.is_empty() {
                return None;
            }
            let mut submolt = None;
            let mut title = None;
            let mut body = Vec::new();
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("submolt:") {
                    submolt = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("title:") {
                    title = Some(rest.trim().to_string());
                } else {
                    body.push(line);
                }
            }
            let content = body.join("\n").trim().to_string();
            if content.is_empty() && title.is_none() {
                return None;
            }
            let title = title.unwrap_or_else(|| {
                if content.chars().count() > 80 {
                    format!("{}…", content.chars().take(80).collect::<String>())
                } else {
                    content.clone()
                }
            });
            Some(PromoDraft {
                submolt: submolt.filter(|s| !s.is_empty()),
                title,
                content,
            })
        })
        .collect()
}
