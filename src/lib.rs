//! Moltbook Engager
//!
//! Autonomous engagement agent for the Moltbook social platform.
//!
//! # Features
//!
//! - **Comment Replies**: one batched judge call per cycle for new comments on our posts
//! - **Spam Honeypot**: spam gets a playful "routed to the void" reply
//! - **Feed Engagement**: at most one upvote and one reply per cycle
//! - **Promos**: one generated promo post per 30 minute cooldown
//! - **Direct Messages**: short grounded replies to unread conversations
//! - **Rate Awareness**: client-side cooldowns plus platform 429 handling
//!
//! # Architecture
//!
//! ```text
//! Poll loop ──► CycleOrchestrator ──► Moltbook API
//!                     │                 (reqwest)
//!                     ├── DM phase
//!                     ├── Comment replies ──► OwnPostIndex (config + id log + discovery)
//!                     ├── Feed engagement
//!                     ├── Promo publisher
//!                     │
//!                     ├── Judge (Claude) + Retriever (KnowledgeBase)
//!                     └── EngagementState (RateGate + DedupLedger)
//! ```

pub mod commands;
pub mod config;
pub mod cycle;
pub mod dedup;
pub mod engagement_log;
pub mod judge;
pub mod own_posts;
pub mod platform;
pub mod prompts;
pub mod promo_file;
pub mod rate_gate;
pub mod retrieval;

pub use config::Config;
pub use cycle::{
    CommentBatchReplier, CycleOrchestrator, CyclePhase, CycleReport, CycleSettings, DmResponder, EngagementState,
    FeedEngager, FeedOutcome, PromoOutcome, PromoPublisher, Services,
};
pub use dedup::{DedupLedger, DedupSet, LedgerSet};
pub use engagement_log::EngagementLog;
pub use judge::{ClaudeJudge, Judge};
pub use own_posts::{OwnPostIndex, OwnPosts, PostIdLog};
pub use platform::{MoltbookClient, Platform, PlatformError};
pub use rate_gate::{ActionClass, RateGate};
pub use retrieval::{KnowledgeBase, NoContext, Retriever};
