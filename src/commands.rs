//! Startup checks and one-shot commands run from the CLI

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::engagement_log::{clip, EngagementLog};
use crate::own_posts::OwnPostIndex;
use crate::platform::{ClaimStatus, Comment, Platform, Post};
use crate::promo_file::PromoDraft;

/// Comments shown per post by `recent_comments`
pub const RECENT_COMMENTS_PER_POST: usize = 25;

/// Fail unless the agent has been claimed by its owner
pub async fn check_claim(platform: &dyn Platform) -> Result<ClaimStatus> {
    let status = platform.status().await.context("status check failed")?;
    if status == ClaimStatus::PendingClaim {
        bail!("agent is not claimed yet; have your human visit the claim URL first");
    }
    Ok(status)
}

/// Subscribe to every submolt. Returns how many subscriptions succeeded.
pub async fn subscribe_all(platform: &dyn Platform, submolts: &[String]) -> usize {
    let mut subscribed = 0;
    for submolt in submolts {
        match platform.subscribe_submolt(submolt).await {
            Ok(()) => {
                info!("Subscribed to m/{}", submolt);
                subscribed += 1;
            }
            Err(e) if e.is_rate_limited() => warn!("Subscribe to m/{} rate limited: {}", submolt, e),
            Err(e) => warn!("Subscribe to m/{} failed: {}", submolt, e),
        }
    }
    subscribed
}

/// Pick promo `choice` (1-based) or the last one
pub fn choose_promo(drafts: &[PromoDraft], choice: Option<usize>) -> Result<&PromoDraft> {
    if drafts.is_empty() {
        bail!("no promos found in promo file");
    }
    match choice {
        None => Ok(&drafts[drafts.len() - 1]),
        Some(n) if n >= 1 && n <= drafts.len() => Ok(&drafts[n - 1]),
        Some(n) => bail!("promo {} out of range (1-{})", n, drafts.len()),
    }
}

/// Publish a hand-written promo and remember its id
pub async fn post_promo(
    platform: &dyn Platform,
    index: &OwnPostIndex,
    log: &EngagementLog,
    draft: &PromoDraft,
    default_submolt: &str,
) -> Result<Option<String>> {
    let submolt = draft.submolt.as_deref().unwrap_or(default_submolt);
    let post_id = platform
        .create_post(submolt, &draft.title, &draft.content)
        .await
        .with_context(|| format!("posting promo to m/{}", submolt))?;

    match &post_id {
        Some(id) => {
            if let Err(e) = index.append_post_id(id) {
                warn!("Could not save post id {}: {}", id, e);
            }
            info!("Posted to m/{} (id {})", submolt, id);
        }
        None => warn!("Posted to m/{} but no post id was returned", submolt),
    }
    log.record(format!("PROMO: posted to m/{}: {:?}", submolt, clip(&draft.title, 60)));
    Ok(post_id)
}

/// A post with its most recent comments
#[derive(Debug, Clone)]
pub struct PostComments {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Recent comments on every tracked post. Unresolvable posts are skipped.
pub async fn recent_comments(platform: &dyn Platform, index: &OwnPostIndex) -> Vec<PostComments> {
    let mut out = Vec::new();
    for id in index.tracked_ids() {
        let post = match platform.get_post(&id).await {
            Ok(post) => post,
            Err(e) => {
                warn!("Post {} unavailable: {}", id, e);
                continue;
            }
        };
        let mut comments = match platform.get_comments(&id, "new").await {
            Ok(comments) => comments,
            Err(e) => {
                warn!("Comments for {} unavailable: {}", id, e);
                Vec::new()
            }
        };
        comments.truncate(RECENT_COMMENTS_PER_POST);
        out.push(PostComments { post, comments });
    }
    out
}
