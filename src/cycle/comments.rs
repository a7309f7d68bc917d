//! Comment Batch Replier
//!
//! Collects unreplied comments on our posts, asks the judge about all of
//! them in a single call, then posts the replies one by one under the
//! comment cooldown. A 429 mid-batch stops the batch; the rest is picked up
//! next cycle.

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{EngagementState, Services};
use crate::dedup::LedgerSet;
use crate::engagement_log::clip;
use crate::judge::parse_json;
use crate::own_posts::{OwnPostIndex, OwnPosts};
use crate::prompts::{self, BatchComment};
use crate::rate_gate::ActionClass;

/// Comments handed to the judge per cycle
pub const COMMENT_BATCH_SIZE: usize = 10;
/// Own posts whose comments are fetched per cycle
pub const MAX_SCANNED_POSTS: usize = 15;
/// Comment body sent to the judge
pub const MAX_COMMENT_CHARS: usize = 300;
/// Reply length cap
pub const MAX_REPLY_CHARS: usize = 250;
/// Context snippets grounding the batch
const CONTEXT_SNIPPETS: usize = 5;

/// Used when the judge flags spam but writes no reply of its own
pub const HONEYPOT_FALLBACKS: &[&str] = &[
    "Your signal has been routed to the honeypot. The void thanks you. 🕳️",
    "Redirecting to /dev/null. Have a nice day in the black hole.",
    "Message received and forwarded to our spam trap. We'll take it from there.",
    "The queue thanks you. Your packet is now in the void.",
    "Acknowledged. Routing to the bit bucket. 🕳️",
    "Copy that. Forwarded to the honeypot. The void appreciates your contribution.",
];

/// Reply for the first comment when the batch answer is unusable
pub const FALLBACK_REPLY: &str =
    "Thanks for stopping by! API keys and docs live at https://dashboard.aipowergrid.io";

/// An unreplied comment on one of our posts
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRef {
    pub post_id: String,
    pub comment_id: String,
    pub author_name: String,
    pub body: String,
}

/// One item of the judge's batch answer
#[derive(Debug, Clone, PartialEq)]
struct BatchReply {
    id: String,
    reply: String,
    spam: bool,
}

impl BatchReply {
    fn from_value(value: &Value) -> Option<Self> {
        let id = match value.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let reply = value
            .get("reply")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let spam = match value.get("spam") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
        Some(Self { id, reply, spam })
    }
}

/// Parse the batch answer; `None` if it is not a non-empty JSON array
fn parse_batch_answer(raw: &str) -> Option<Vec<BatchReply>> {
    match parse_json::<Vec<Value>>(raw) {
        Ok(items) if !items.is_empty() => Some(items.iter().filter_map(BatchReply::from_value).collect()),
        Ok(_) => None,
        Err(e) => {
            debug!("Batch answer rejected: {}", e);
            None
        }
    }
}

enum Commit {
    Sent,
    RateLimited,
    Failed,
}

/// Replies to comments on our posts
pub struct CommentBatchReplier<'a> {
    services: &'a Services,
    index: &'a OwnPostIndex,
    state: &'a mut EngagementState,
    persona_name: &'a str,
    honeypots_used: usize,
}

impl<'a> CommentBatchReplier<'a> {
    pub fn new(
        services: &'a Services,
        index: &'a OwnPostIndex,
        state: &'a mut EngagementState,
        persona_name: &'a str,
    ) -> Self {
        Self {
            services,
            index,
            state,
            persona_name,
            honeypots_used: 0,
        }
    }

    /// Reply to up to `max_batch` comments. Returns replies sent.
    pub async fn run(&mut self, max_batch: usize) -> Result<usize> {
        let services = self.services;
        let log = &services.log;
        let own = self.index.resolve(services.platform.as_ref()).await;
        if own.posts.is_empty() {
            info!("No own posts found (set MOLTBOOK_OUR_POST_IDS or publish a promo)");
            log.record("COMMENTS: no our posts found");
            return Ok(0);
        }
        log.record(format!("COMMENTS: checking {} our post(s)", own.posts.len()));

        let batch = self.collect_batch(&own, max_batch).await;
        if batch.is_empty() {
            log.record("COMMENTS: no new comments to reply to (all caught up)");
            return Ok(0);
        }

        log.record(format!("COMMENTS: batch of {} comment(s), calling judge once", batch.len()));
        let sent = match self.judge_batch(&batch).await {
            Some(replies) => self.commit_replies(&batch, replies).await,
            None => {
                warn!("Batch answer unusable, replying to first comment only");
                match self.commit(&batch[0], FALLBACK_REPLY).await {
                    Commit::Sent => 1,
                    Commit::RateLimited | Commit::Failed => 0,
                }
            }
        };

        if sent > 0 {
            log.record(format!("COMMENTS: replied to {} comment(s) this cycle (batch)", sent));
        }
        Ok(sent)
    }

    /// Gather unreplied comments, newest first per post, up to `max_batch`
    async fn collect_batch(&mut self, own: &OwnPosts, max_batch: usize) -> Vec<CommentRef> {
        let services = self.services;
        let platform = services.platform.as_ref();
        let mut batch: Vec<CommentRef> = Vec::new();

        for post in own.posts.iter().take(MAX_SCANNED_POSTS) {
            if batch.len() >= max_batch {
                break;
            }
            let comments = match platform.get_comments(&post.id, "new").await {
                Ok(comments) => comments,
                Err(e) => {
                    if e.is_rate_limited() {
                        self.state.gate.record_now(ActionClass::Comment);
                    }
                    debug!("Comments for {} unavailable: {}", post.id, e);
                    continue;
                }
            };

            for comment in comments {
                if batch.len() >= max_batch {
                    break;
                }
                if comment.id.is_empty()
                    || self.state.ledger.seen(LedgerSet::RepliedComments, &comment.id)
                    || batch.iter().any(|c| c.comment_id == comment.id)
                {
                    continue;
                }
                // Never answer ourselves
                if comment.author_name == own.agent_name {
                    self.state.ledger.mark(LedgerSet::RepliedComments, &comment.id);
                    continue;
                }
                let body = clip(comment.body.trim(), MAX_COMMENT_CHARS);
                if body.is_empty() {
                    continue;
                }
                services.log.record(format!(
                    "ENGAGEMENT: comment on post {} from {:?}: {:?}",
                    post.id,
                    comment.author_name,
                    clip(body, 120)
                ));
                batch.push(CommentRef {
                    post_id: post.id.clone(),
                    comment_id: comment.id.clone(),
                    author_name: comment.author_name.clone(),
                    body: body.to_string(),
                });
            }
        }
        batch
    }

    /// One judge call for the whole batch; `None` when the answer is unusable
    async fn judge_batch(&self, batch: &[CommentRef]) -> Option<Vec<BatchReply>> {
        let items: Vec<BatchComment<'_>> = batch
            .iter()
            .map(|c| BatchComment {
                id: &c.comment_id,
                author: &c.author_name,
                body: &c.body,
            })
            .collect();
        let prompt = prompts::comment_batch_prompt(self.persona_name, &items);
        let context = self
            .services
            .retriever
            .relevant_context(prompts::COMMENT_CONTEXT_QUERY, CONTEXT_SNIPPETS);

        match self.services.judge.answer(&prompt, &context).await {
            Ok(raw) => parse_batch_answer(&raw),
            Err(e) => {
                warn!("Batch judge call failed: {:#}", e);
                None
            }
        }
    }

    async fn commit_replies(&mut self, batch: &[CommentRef], replies: Vec<BatchReply>) -> usize {
        let mut sent = 0;
        for item in replies {
            let Some(target) = batch.iter().find(|c| c.comment_id == item.id) else {
                debug!("Judge answered unknown comment id {}", item.id);
                continue;
            };
            if self.state.ledger.seen(LedgerSet::RepliedComments, &target.comment_id) {
                continue;
            }

            let mut reply = clip(item.reply.trim(), MAX_REPLY_CHARS).to_string();
            if reply.is_empty() && item.spam {
                reply = self.next_honeypot().to_string();
                self.services
                    .log
                    .record(format!("SPAM: fallback honeypot for {:?}", target.author_name));
            }
            if reply.is_empty() {
                continue;
            }

            match self.commit(target, &reply).await {
                Commit::Sent => sent += 1,
                Commit::RateLimited => break,
                Commit::Failed => continue,
            }
        }
        sent
    }

    /// Consecutive honeypots within one run never repeat
    fn next_honeypot(&mut self) -> &'static str {
        let line = HONEYPOT_FALLBACKS[self.honeypots_used % HONEYPOT_FALLBACKS.len()];
        self.honeypots_used += 1;
        line
    }

    /// Wait out the comment cooldown, post, and record the result
    async fn commit(&mut self, target: &CommentRef, reply: &str) -> Commit {
        let wait = self.state.gate.remaining_wait(ActionClass::Comment);
        if !wait.is_zero() {
            debug!("Comment cooldown: sleeping {:?}", wait);
            tokio::time::sleep(wait).await;
        }

        let result = self
            .services
            .platform
            .add_comment(&target.post_id, reply, Some(&target.comment_id))
            .await;
        match result {
            Ok(()) => {
                self.state.ledger.mark(LedgerSet::RepliedComments, &target.comment_id);
                self.state.gate.record_now(ActionClass::Comment);
                self.services.log.record(format!(
                    "REPLIED: to {:?} on post {}: {:?}",
                    target.author_name,
                    target.post_id,
                    clip(reply, 80)
                ));
                Commit::Sent
            }
            Err(e) if e.is_rate_limited() => {
                self.state.gate.record_now(ActionClass::Comment);
                info!("Comment rate limited, stopping batch: {}", e);
                Commit::RateLimited
            }
            Err(e) => {
                warn!("Reply to comment {} failed: {}", target.comment_id, e);
                Commit::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_answer() {
        let raw = r#"```json
[{"id": "c1", "reply": "hi"}, {"id": 7, "spam": "true"}, {"reply": "no id"}]
```"#;
        let replies = parse_batch_answer(raw).unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], BatchReply { id: "c1".into(), reply: "hi".into(), spam: false });
        assert_eq!(replies[1], BatchReply { id: "7".into(), reply: String::new(), spam: true });
    }

    #[test]
    fn test_parse_batch_answer_rejects_non_arrays() {
        assert!(parse_batch_answer("[]").is_none());
        assert!(parse_batch_answer(r#"{"id": "c1"}"#).is_none());
        assert!(parse_batch_answer("I'd be happy to help!").is_none());
    }

    #[test]
    fn test_honeypots_are_distinct() {
        let mut unique = HONEYPOT_FALLBACKS.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), HONEYPOT_FALLBACKS.len());
    }
}
