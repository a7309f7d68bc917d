//! Own Post Index
//!
//! Works out which posts are ours, cheapest source first:
//! 1. Configured ids, then ids from the on-disk log (single-post lookups)
//! 2. Our profile's recent posts
//! 3. The personalized feed, filtered by our display name
//! 4. Up to two submolt listings, filtered the same way
//!
//! Sources 2-4 only run while fewer than `MIN_TRACKED_POSTS` are known.
//! Earlier sources win when two report the same id.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Config;
use crate::platform::{Platform, Post};

/// Stop consulting fallback sources once this many posts are known
pub const MIN_TRACKED_POSTS: usize = 5;
/// Feed page scanned for our posts
pub const DISCOVERY_FEED_LIMIT: usize = 50;
/// Submolt page scanned for our posts
pub const DISCOVERY_SUBMOLT_LIMIT: usize = 30;
/// Submolts scanned for our posts
pub const MAX_SCANNED_SUBMOLTS: usize = 2;

/// Append-only file of post ids we created, one per line.
/// Never rewritten; duplicates are collapsed at read time.
#[derive(Debug, Clone)]
pub struct PostIdLog {
    path: PathBuf,
}

impl PostIdLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All logged ids in file order. A missing file is an empty log.
    pub fn load(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Could not read post id log {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    pub fn append(&self, id: &str) -> std::io::Result<()> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(());
        }
        let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(f, "{}", id)
    }
}

/// Resolved set of our posts
#[derive(Debug, Clone, Default)]
pub struct OwnPosts {
    pub posts: Vec<Post>,
    pub agent_name: String,
}

/// Ordered, id-deduplicated accumulator
#[derive(Default)]
struct PostCollector {
    seen: HashSet<String>,
    posts: Vec<Post>,
}

impl PostCollector {
    fn push(&mut self, post: Post) -> bool {
        if post.id.is_empty() || !self.seen.insert(post.id.clone()) {
            return false;
        }
        self.posts.push(post);
        true
    }

    fn has(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    fn satisfied(&self) -> bool {
        self.posts.len() >= MIN_TRACKED_POSTS
    }
}

/// Resolves the posts authored by this agent
#[derive(Debug, Clone)]
pub struct OwnPostIndex {
    log: PostIdLog,
    configured_ids: Vec<String>,
    submolts: Vec<String>,
    fallback_name: String,
}

impl OwnPostIndex {
    pub fn new(log: PostIdLog, configured_ids: Vec<String>, submolts: Vec<String>, fallback_name: &str) -> Self {
        Self {
            log,
            configured_ids,
            submolts,
            fallback_name: fallback_name.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PostIdLog::new(&config.post_ids_file),
            config.our_post_ids.clone(),
            config.submolts.clone(),
            &config.agent_name,
        )
    }

    pub fn log(&self) -> &PostIdLog {
        &self.log
    }

    /// Configured ids followed by logged ids, first occurrence kept
    pub fn tracked_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.configured_ids
            .iter()
            .cloned()
            .chain(self.log.load())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Our display name, or the configured fallback if the profile is unavailable
    pub async fn agent_name(&self, platform: &dyn Platform) -> String {
        match platform.get_own_profile().await {
            Ok(profile) => profile.name.unwrap_or_else(|| self.fallback_name.clone()),
            Err(e) => {
                debug!("Profile lookup failed, using fallback name: {}", e);
                self.fallback_name.clone()
            }
        }
    }

    /// Collect our posts from every source. Lookup failures drop the
    /// affected id or source, never the whole resolution.
    pub async fn resolve(&self, platform: &dyn Platform) -> OwnPosts {
        let profile = match platform.get_own_profile().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Own profile lookup failed: {}", e);
                None
            }
        };
        let agent_name = profile
            .as_ref()
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| self.fallback_name.clone());

        let mut found = PostCollector::default();

        // 1) Configured + logged ids
        for id in self.tracked_ids() {
            if found.has(&id) {
                continue;
            }
            match platform.get_post(&id).await {
                Ok(post) => {
                    found.push(post);
                }
                Err(e) => debug!("Tracked post {} not resolved: {}", id, e),
            }
        }

        // 2) Profile recent posts
        if !found.satisfied() {
            if let Some(profile) = profile {
                for post in profile.recent_posts {
                    found.push(post);
                }
            }
        }

        // 3) Feed filtered by author
        if !found.satisfied() {
            match platform.list_feed("new", DISCOVERY_FEED_LIMIT).await {
                Ok(posts) => {
                    for post in posts.into_iter().filter(|p| p.is_authored_by(&agent_name)) {
                        found.push(post);
                    }
                }
                Err(e) => debug!("Feed scan for own posts failed: {}", e),
            }
        }

        // 4) Submolt listings filtered by author
        for submolt in self.submolts.iter().take(MAX_SCANNED_SUBMOLTS) {
            if found.satisfied() {
                break;
            }
            match platform.list_posts(submolt, "new", DISCOVERY_SUBMOLT_LIMIT).await {
                Ok(posts) => {
                    for post in posts.into_iter().filter(|p| p.is_authored_by(&agent_name)) {
                        found.push(post);
                    }
                }
                Err(e) => debug!("Submolt m/{} scan for own posts failed: {}", submolt, e),
            }
        }

        debug!("Resolved {} own post(s) as {}", found.posts.len(), agent_name);
        OwnPosts {
            posts: found.posts,
            agent_name,
        }
    }

    /// Remember a post we just published
    pub fn append_post_id(&self, id: &str) -> std::io::Result<()> {
        self.log.append(id)
    }
}
