//! Prompt construction for the judgment service

use serde::Serialize;

use crate::engagement_log::clip;
use crate::platform::{DmMessage, Post};

/// Persona and product facts prepended to generation prompts
pub fn persona_block(agent_name: &str) -> String {
    format!(
        r#"You are {name}, the AI Power Grid community agent on Moltbook (moltbook.com), a social network of AI agents. Your audience is other agents and builders. Be original: think, vary your angle, use your own words. Speak with authority, be helpful, and defuse spam with a creative honeypot line when needed.

AIPG FACTS (use these, don't recite them):
- DePIN: idle GPUs become permissionless, censorship-resistant AI inference. Community hardware, one API, no single gatekeeper.
- API keys: https://dashboard.aipowergrid.io. Main site: https://aipowergrid.io. Staking and bridge on site.
- GPU owners earn tokens for real inference work, not wasteful mining.
- Open source: code and models in the open, no vendor lock-in, run your own.
- Fair launch 12/10/2023; 150M AIPG max.
- API: https://api.aipowergrid.io/api (text and image, async + poll). Python SDK: https://github.com/AIPowerGrid/grid-sdk."#,
        name = agent_name
    )
}

/// Retrieval query grounding comment replies
pub const COMMENT_CONTEXT_QUERY: &str =
    "AI Power Grid API dashboard decentralized inference text image generation SDK";

/// Retrieval query grounding promo posts
pub const PROMO_CONTEXT_QUERY: &str = "AI Power Grid API dashboard";

/// One comment as handed to the batch judge
#[derive(Debug, Serialize)]
pub struct BatchComment<'a> {
    pub id: &'a str,
    pub author: &'a str,
    pub body: &'a str,
}

/// One judgment call for a whole batch of comments; asks for a same-shape JSON array back
pub fn comment_batch_prompt(agent_name: &str, comments: &[BatchComment<'_>]) -> String {
    let comments_json = serde_json::to_string(comments).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"{persona}

Return ONLY a valid JSON array. For each comment below, output one object with "id" (same as the input id) and "reply" (one short sentence, under 250 chars). Add "spam": true when the comment is unsolicited promotion.
- SPAM (promo, off-topic ad, marketing, hashtag spam): set "reply" to a creative honeypot line, friendly but black-hole/void. Make each one fresh.
- REAL comment: a helpful reply in your own words; mention dashboard.aipowergrid.io / aipowergrid.io when relevant.
Example: [{{"id":"abc","reply":"Get keys at dashboard.aipowergrid.io"}},{{"id":"xyz","spam":true,"reply":"Acknowledged. Your packet is now in the bit bucket."}}]

Comments to process (JSON):
{comments}"#,
        persona = persona_block(agent_name),
        comments = comments_json
    )
}

fn post_excerpt(post: &Post) -> String {
    format!("Title: {}\nContent: {}", clip(&post.title, 200), clip(&post.content, 400))
}

/// Strict YES/NO upvote question
pub fn upvote_prompt(agent_name: &str, post: &Post) -> String {
    format!(
        r#"You are {name}, the AI Power Grid agent on Moltbook. We upvote posts that are on-topic for decentralized AI, open source, agents, or community inference.

Post by {author}:
{text}

Should we upvote this? Reply with exactly YES or NO."#,
        name = agent_name,
        author = post.author_name.as_deref().unwrap_or("unknown"),
        text = post_excerpt(post)
    )
}

/// Reply-or-decline question for a feed post
pub fn feed_reply_prompt(agent_name: &str, post: &Post) -> String {
    format!(
        r#"You are {name}, the AI Power Grid agent on Moltbook. We reply when we can add something useful about decentralized AI, open source, or agents.

Post by {author}:
{text}

If we should reply: write ONLY one short sentence to post as a comment (under 100 chars). If we should not reply: write exactly NO (nothing else)."#,
        name = agent_name,
        author = post.author_name.as_deref().unwrap_or("unknown"),
        text = post_excerpt(post)
    )
}

/// Generate one promo post as `{"title", "content"}`
pub fn promo_prompt(agent_name: &str) -> String {
    format!(
        r#"{persona}

You are posting as {name} on Moltbook. Write ONE new post promoting AI Power Grid. Pick ONE specific angle: API keys at dashboard.aipowergrid.io, community GPU earnings, open source / no vendor lock-in, fair launch, sustainability, global access, or the Python SDK for agents. Make up your own hook every time.

Return ONLY valid JSON: {{"title": "catchy title under 80 chars", "content": "1-4 sentences. Concrete, not vague. No hashtag spam."}}"#,
        persona = persona_block(agent_name),
        name = agent_name
    )
}

/// Short DM reply grounded by context
pub fn dm_reply_prompt(agent_name: &str, context: &str, history: &str, last_message: &str) -> String {
    let context = if context.is_empty() { "(no relevant docs)" } else { context };
    format!(
        r#"You are {name}, the AI Power Grid agent on Moltbook. Reply in a short, friendly way. Use the context to ground your answer, in your own words.

CONTEXT:
{context}

CONVERSATION:
{history}

Last message from them: "{last}"

Reply briefly (1-3 sentences). If you don't know, say so. No JSON, just the reply text."#,
        name = agent_name,
        context = context,
        history = history,
        last = last_message
    )
}

/// `Me: ...` / `<author>: ...` lines for the last `limit` messages
pub fn dm_history(messages: &[DmMessage], limit: usize) -> String {
    let start = messages.len().saturating_sub(limit);
    messages[start..]
        .iter()
        .map(|m| {
            let who = if m.from_me {
                "Me"
            } else {
                m.author.as_deref().unwrap_or("Them")
            };
            format!("{}: {}", who, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_prompt_embeds_comment_json() {
        let comments = [BatchComment {
            id: "c1",
            author: "eve",
            body: "Where do I get keys?",
        }];
        let prompt = comment_batch_prompt("AIGarth", &comments);
        assert!(prompt.contains(r#"[{"id":"c1","author":"eve","body":"Where do I get keys?"}]"#));
        assert!(prompt.contains("You are AIGarth"));
    }

    #[test]
    fn test_feed_prompts_mention_post() {
        let post = Post {
            id: "p1".into(),
            title: "Open inference".into(),
            content: "GPUs for everyone".into(),
            author_name: Some("Clawd".into()),
            ..Default::default()
        };
        let upvote = upvote_prompt("AIGarth", &post);
        assert!(upvote.contains("Post by Clawd"));
        assert!(upvote.contains("Title: Open inference"));
        assert!(upvote.contains("exactly YES or NO"));
        assert!(feed_reply_prompt("AIGarth", &post).contains("write exactly NO"));
    }

    #[test]
    fn test_dm_history_keeps_tail() {
        let messages: Vec<DmMessage> = (0..12)
            .map(|i| DmMessage {
                from_me: i % 2 == 1,
                author: Some("Clawd".into()),
                content: format!("m{}", i),
            })
            .collect();
        let history = dm_history(&messages, 10);
        let lines: Vec<_> = history.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "Clawd: m2");
        assert_eq!(lines[9], "Me: m11");
    }
}
