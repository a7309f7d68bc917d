//! Platform Trait Definitions
//!
//! Everything the engagement cycle needs from the social platform, in
//! wire-neutral types. The HTTP client lives in `moltbook.rs`.

use async_trait::async_trait;

/// Error types for platform operations
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("API error {status}: {message}{}", fmt_hint(.hint))]
    Api {
        status: u16,
        message: String,
        hint: Option<String>,
    },

    #[error("Transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

fn fmt_hint(hint: &Option<String>) -> String {
    hint.as_ref().map(|h| format!(" ({})", h)).unwrap_or_default()
}

impl PlatformError {
    /// The platform said "too frequent"
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// HTTP-like status, when the platform answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// A post as seen in listings or single-post lookups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub submolt: Option<String>,
    pub author_name: Option<String>,
}

impl Post {
    pub fn is_authored_by(&self, name: &str) -> bool {
        self.author_name.as_deref() == Some(name)
    }
}

/// A comment on a post
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: Option<String>,
}

/// Our own agent profile
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub name: Option<String>,
    pub recent_posts: Vec<Post>,
}

/// Agent claim status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStatus {
    Claimed,
    PendingClaim,
    Other(String),
}

/// Pending DM request (never auto-approved)
#[derive(Debug, Clone, Default)]
pub struct DmRequest {
    pub from: String,
    pub preview: String,
}

/// Result of the cheap DM activity check
#[derive(Debug, Clone, Default)]
pub struct DmCheck {
    pub has_activity: bool,
    pub summary: String,
    pub requests: Vec<DmRequest>,
}

/// One entry in the DM inbox
#[derive(Debug, Clone, Default)]
pub struct ConversationSummary {
    pub id: String,
    pub unread_count: u64,
}

/// A message inside a DM conversation
#[derive(Debug, Clone, Default)]
pub struct DmMessage {
    pub from_me: bool,
    pub author: Option<String>,
    pub content: String,
}

/// Platform operations used by the engagement cycle
#[async_trait]
pub trait Platform: Send + Sync {
    /// Claim status of the agent account
    async fn status(&self) -> PlatformResult<ClaimStatus>;

    async fn subscribe_submolt(&self, name: &str) -> PlatformResult<()>;

    async fn get_own_profile(&self) -> PlatformResult<Profile>;

    async fn get_post(&self, id: &str) -> PlatformResult<Post>;

    /// Personalized feed (subscribed submolts + followed agents)
    async fn list_feed(&self, sort: &str, limit: usize) -> PlatformResult<Vec<Post>>;

    async fn list_posts(&self, submolt: &str, sort: &str, limit: usize) -> PlatformResult<Vec<Post>>;

    async fn get_comments(&self, post_id: &str, sort: &str) -> PlatformResult<Vec<Comment>>;

    async fn add_comment(&self, post_id: &str, content: &str, parent_id: Option<&str>) -> PlatformResult<()>;

    /// Create a text post. Returns the new post id when the platform reports one.
    async fn create_post(&self, submolt: &str, title: &str, content: &str) -> PlatformResult<Option<String>>;

    async fn upvote_post(&self, id: &str) -> PlatformResult<()>;

    async fn dm_check(&self) -> PlatformResult<DmCheck>;

    async fn dm_conversations(&self) -> PlatformResult<Vec<ConversationSummary>>;

    /// Read a conversation (marks it read)
    async fn dm_get_conversation(&self, conversation_id: &str) -> PlatformResult<Vec<DmMessage>>;

    async fn dm_send(&self, conversation_id: &str, message: &str) -> PlatformResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_predicate() {
        let err = PlatformError::RateLimited {
            message: "slow down".into(),
            retry_after_secs: Some(20),
        };
        assert!(err.is_rate_limited());
        assert_eq!(err.status(), Some(429));

        let err = PlatformError::Api {
            status: 404,
            message: "not found".into(),
            hint: None,
        };
        assert!(!err.is_rate_limited());
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_api_error_display_includes_hint() {
        let err = PlatformError::Api {
            status: 400,
            message: "bad".into(),
            hint: Some("check submolt".into()),
        };
        assert_eq!(err.to_string(), "API error 400: bad (check submolt)");
    }

    #[test]
    fn test_post_authorship() {
        let post = Post {
            id: "p".into(),
            author_name: Some("AIGarth".into()),
            ..Default::default()
        };
        assert!(post.is_authored_by("AIGarth"));
        assert!(!post.is_authored_by("Clawd"));
    }
}
