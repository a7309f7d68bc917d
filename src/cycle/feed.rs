//! Feed Engager
//!
//! Walks the personalized feed once per cycle and makes at most one upvote
//! and at most one reply. Both decisions go to the judge; both are gated by
//! the dedup ledger, and the reply additionally by the comment cooldown.

use anyhow::Result;
use tracing::{debug, info, warn};

use super::{CycleSettings, EngagementState, Services};
use crate::dedup::LedgerSet;
use crate::engagement_log::clip;
use crate::own_posts::OwnPostIndex;
use crate::platform::Post;
use crate::prompts;
use crate::rate_gate::ActionClass;

/// Raw judge answer cap before cleanup
const MAX_ANSWER_CHARS: usize = 200;

/// What the feed phase did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedOutcome {
    pub upvoted: Option<String>,
    pub replied: Option<String>,
    pub rate_limited: bool,
}

/// True when the answer is an affirmative YES
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_uppercase().starts_with("YES")
}

/// "NO", "No.", "no thanks" decline; "Nobody does this better" does not
fn is_decline(answer: &str) -> bool {
    let upper = answer.trim().to_uppercase();
    match upper.strip_prefix("NO") {
        Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric()),
        None => false,
    }
}

/// Turn a reply-or-decline answer into comment text, or `None` to skip
pub fn usable_reply(answer: &str) -> Option<String> {
    let reply = clip(answer.trim(), MAX_ANSWER_CHARS).trim();
    if reply.is_empty() || is_decline(reply) {
        return None;
    }
    // Drop an echoed leading "YES"
    let reply = match reply.get(..3) {
        Some(head) if head.eq_ignore_ascii_case("yes") && !reply[3..].starts_with(|c: char| c.is_alphanumeric()) => {
            reply[3..].trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '.' | '-' | '!'))
        }
        _ => reply,
    };
    let reply = reply.trim();
    if reply.is_empty() {
        None
    } else {
        Some(reply.to_string())
    }
}

/// Upvotes and replies on the feed
pub struct FeedEngager<'a> {
    services: &'a Services,
    index: &'a OwnPostIndex,
    state: &'a mut EngagementState,
    settings: &'a CycleSettings,
}

impl<'a> FeedEngager<'a> {
    pub fn new(
        services: &'a Services,
        index: &'a OwnPostIndex,
        state: &'a mut EngagementState,
        settings: &'a CycleSettings,
    ) -> Self {
        Self {
            services,
            index,
            state,
            settings,
        }
    }

    pub async fn run(&mut self) -> Result<FeedOutcome> {
        let services = self.services;
        let platform = services.platform.as_ref();
        let mut outcome = FeedOutcome::default();

        let agent_name = self.index.agent_name(platform).await;
        let posts = match platform.list_feed(&self.settings.feed_sort, self.settings.feed_limit).await {
            Ok(posts) => posts,
            Err(e) if e.is_rate_limited() => {
                info!("Feed rate limited, skipping this cycle: {}", e);
                outcome.rate_limited = true;
                return Ok(outcome);
            }
            Err(e) => return Err(anyhow::Error::new(e).context("feed fetch failed")),
        };

        for post in &posts {
            if post.id.is_empty() || post.is_authored_by(&agent_name) {
                continue;
            }

            if outcome.upvoted.is_none() && !self.state.ledger.seen(LedgerSet::UpvotedPosts, &post.id) {
                match self.consider_upvote(post).await {
                    Ok(true) => outcome.upvoted = Some(post.id.clone()),
                    Ok(false) => {}
                    Err(Stop) => {
                        outcome.rate_limited = true;
                        break;
                    }
                }
            }

            if !self.state.gate.may_act(ActionClass::FeedReply)
                || self.state.ledger.seen(LedgerSet::SeenFeedPosts, &post.id)
            {
                continue;
            }
            match self.consider_reply(post).await {
                Ok(true) => {
                    outcome.replied = Some(post.id.clone());
                    break;
                }
                Ok(false) => {}
                Err(Stop) => {
                    outcome.rate_limited = true;
                    break;
                }
            }
        }

        Ok(outcome)
    }

    /// Ask the judge, upvote on YES. `Err(Stop)` on a platform rate limit.
    async fn consider_upvote(&mut self, post: &Post) -> std::result::Result<bool, Stop> {
        let services = self.services;
        let prompt = prompts::upvote_prompt(&self.settings.persona_name, post);
        let answer = match services.judge.answer(&prompt, &[]).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Upvote decision failed: {:#}", e);
                return Ok(false);
            }
        };
        if !is_affirmative(&answer) {
            return Ok(false);
        }

        match services.platform.upvote_post(&post.id).await {
            Ok(()) => {
                self.state.ledger.mark(LedgerSet::UpvotedPosts, &post.id);
                services
                    .log
                    .record(format!("FEED: upvoted post {}: {:?}", post.id, clip(&post.title, 60)));
                Ok(true)
            }
            Err(e) if e.is_rate_limited() => {
                info!("Upvote rate limited, ending feed scan: {}", e);
                Err(Stop)
            }
            Err(e) => {
                warn!("Upvote of {} failed: {}", post.id, e);
                Ok(false)
            }
        }
    }

    /// Ask the judge for a reply and post it. `Ok(true)` once a reply went out.
    async fn consider_reply(&mut self, post: &Post) -> std::result::Result<bool, Stop> {
        let services = self.services;
        self.state.ledger.mark(LedgerSet::SeenFeedPosts, &post.id);

        let prompt = prompts::feed_reply_prompt(&self.settings.persona_name, post);
        let answer = match services.judge.answer(&prompt, &[]).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Reply decision failed: {:#}", e);
                return Ok(false);
            }
        };
        let Some(reply) = usable_reply(&answer) else {
            debug!("Declined to reply to {}", post.id);
            return Ok(false);
        };

        match services.platform.add_comment(&post.id, &reply, None).await {
            Ok(()) => {
                self.state.gate.record_now(ActionClass::FeedReply);
                services
                    .log
                    .record(format!("FEED: replied to post {}: {:?}", post.id, clip(&reply, 60)));
                Ok(true)
            }
            Err(e) if e.is_rate_limited() => {
                self.state.gate.record_now(ActionClass::FeedReply);
                info!("Feed reply rate limited, ending feed scan: {}", e);
                Err(Stop)
            }
            Err(e) => {
                warn!("Reply to post {} failed: {}", post.id, e);
                Ok(false)
            }
        }
    }
}

/// Platform said "too frequent": end the scan for this cycle
#[derive(Debug)]
struct Stop;
