//! Social Platform Access
//!
//! The engagement cycle talks to the platform only through the `Platform`
//! trait, so the scheduler can be driven by the real Moltbook client or by
//! an in-memory fake.

pub mod moltbook;
pub mod traits;

pub use moltbook::MoltbookClient;
pub use traits::{
    ClaimStatus, Comment, ConversationSummary, DmCheck, DmMessage, DmRequest, Platform, PlatformError,
    PlatformResult, Post, Profile,
};
