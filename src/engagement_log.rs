//! Engagement Trail
//!
//! Append-only, timestamped log of notable engagement events (DMs, comment
//! batches, replies, upvotes, promos, cycle boundaries). Meant for `tail -f`;
//! nothing reads it back. Write failures never interrupt the cycle.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Append-only engagement log
#[derive(Debug, Clone)]
pub struct EngagementLog {
    path: Option<PathBuf>,
}

impl EngagementLog {
    /// Log to a file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Tracing only, no file
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one event
    pub fn record(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!(target: "engagement", "{}", message);

        let Some(path) = &self.path else {
            return;
        };
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| {
                writeln!(f, "[{}] {}", ts, message)?;
                f.flush()
            });
        if let Err(e) = result {
            debug!("Engagement log write to {} failed: {}", path.display(), e);
        }
    }
}

/// Truncate to at most `max` chars (char boundary safe)
pub fn clip(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
