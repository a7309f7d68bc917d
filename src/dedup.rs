//! Bounded "already handled" sets
//!
//! Each set is cleared entirely once it grows past its cap, then the id that
//! tripped the cap is inserted again. A long-running process may therefore
//! re-act on an old id after a clear; ids are never evicted one at a time.

use std::collections::HashSet;
use tracing::debug;

/// Cap for replied comment ids
pub const REPLIED_COMMENTS_CAP: usize = 500;
/// Cap for upvoted post ids
pub const UPVOTED_POSTS_CAP: usize = 300;
/// Cap for feed posts already considered for a reply
pub const SEEN_FEED_POSTS_CAP: usize = 200;

/// Which ledger set an id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerSet {
    RepliedComments,
    UpvotedPosts,
    SeenFeedPosts,
}

impl LedgerSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RepliedComments => "replied_comments",
            Self::UpvotedPosts => "upvoted_posts",
            Self::SeenFeedPosts => "seen_feed_posts",
        }
    }

    pub fn cap(&self) -> usize {
        match self {
            Self::RepliedComments => REPLIED_COMMENTS_CAP,
            Self::UpvotedPosts => UPVOTED_POSTS_CAP,
            Self::SeenFeedPosts => SEEN_FEED_POSTS_CAP,
        }
    }
}

/// Fixed-capacity id set with clear-on-overflow
#[derive(Debug, Clone)]
pub struct DedupSet {
    ids: HashSet<String>,
    cap: usize,
}

impl DedupSet {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            ids: HashSet::new(),
            cap,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Insert an id. Returns true if the insert overflowed and cleared the set.
    pub fn mark(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string());
        if self.ids.len() > self.cap {
            self.ids.clear();
            self.ids.insert(id.to_string());
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The three process-lifetime dedup sets
#[derive(Debug, Clone)]
pub struct DedupLedger {
    replied_comments: DedupSet,
    upvoted_posts: DedupSet,
    seen_feed_posts: DedupSet,
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupLedger {
    pub fn new() -> Self {
        Self {
            replied_comments: DedupSet::with_cap(REPLIED_COMMENTS_CAP),
            upvoted_posts: DedupSet::with_cap(UPVOTED_POSTS_CAP),
            seen_feed_posts: DedupSet::with_cap(SEEN_FEED_POSTS_CAP),
        }
    }

    fn set(&self, which: LedgerSet) -> &DedupSet {
        match which {
            LedgerSet::RepliedComments => &self.replied_comments,
            LedgerSet::UpvotedPosts => &self.upvoted_posts,
            LedgerSet::SeenFeedPosts => &self.seen_feed_posts,
        }
    }

    fn set_mut(&mut self, which: LedgerSet) -> &mut DedupSet {
        match which {
            LedgerSet::RepliedComments => &mut self.replied_comments,
            LedgerSet::UpvotedPosts => &mut self.upvoted_posts,
            LedgerSet::SeenFeedPosts => &mut self.seen_feed_posts,
        }
    }

    pub fn seen(&self, which: LedgerSet, id: &str) -> bool {
        self.set(which).contains(id)
    }

    pub fn mark(&mut self, which: LedgerSet, id: &str) {
        if self.set_mut(which).mark(id) {
            debug!("Dedup set {} overflowed cap {}, cleared", which.as_str(), which.cap());
        }
    }

    pub fn len(&self, which: LedgerSet) -> usize {
        self.set(which).len()
    }
}
