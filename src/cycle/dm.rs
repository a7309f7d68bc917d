//! DM phase: reply to unread direct-message conversations.
//!
//! Pending DM requests are logged for the human owner and never approved.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::Services;
use crate::engagement_log::clip;
use crate::judge::{format_context, unquote};
use crate::platform::ConversationSummary;
use crate::prompts;

/// Sent when the judge cannot produce a reply
pub const GLITCH_REPLY: &str = "I had a glitch — try again in a bit?";
/// Messages of history shown to the judge
const HISTORY_MESSAGES: usize = 10;
const CONTEXT_SNIPPETS: usize = 3;

/// Answers unread DM conversations
pub struct DmResponder<'a> {
    services: &'a Services,
    persona_name: &'a str,
}

impl<'a> DmResponder<'a> {
    pub fn new(services: &'a Services, persona_name: &'a str) -> Self {
        Self {
            services,
            persona_name,
        }
    }

    /// Returns the number of replies sent
    pub async fn run(&self) -> Result<usize> {
        let platform = self.services.platform.as_ref();
        let log = &self.services.log;

        let check = platform.dm_check().await.context("DM check failed")?;
        if !check.has_activity {
            debug!("No DM activity");
            return Ok(0);
        }

        log.record(format!("DM: {}", check.summary));
        for request in &check.requests {
            log.record(format!(
                "DM REQUEST from {:?}: {:?} (needs human approval)",
                request.from,
                clip(&request.preview, 80)
            ));
        }

        let conversations = platform.dm_conversations().await.context("DM conversation list failed")?;
        let mut sent = 0;
        for conversation in conversations.iter().filter(|c| c.unread_count > 0) {
            if self.reply_to(conversation).await {
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Read one conversation and answer its last incoming message
    async fn reply_to(&self, conversation: &ConversationSummary) -> bool {
        let platform = self.services.platform.as_ref();

        let messages = match platform.dm_get_conversation(&conversation.id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("DM conversation {} unreadable: {}", conversation.id, e);
                return false;
            }
        };
        let Some(last) = messages.iter().rev().find(|m| !m.from_me && !m.content.trim().is_empty()) else {
            return false;
        };
        let last_text = last.content.trim();

        let history = prompts::dm_history(&messages, HISTORY_MESSAGES);
        let context = self.services.retriever.relevant_context(last_text, CONTEXT_SNIPPETS);
        let prompt = prompts::dm_reply_prompt(self.persona_name, &format_context(&context), &history, last_text);

        let reply = match self.services.judge.answer(&prompt, &[]).await {
            Ok(raw) => unquote(&raw),
            Err(e) => {
                warn!("DM reply generation failed: {:#}", e);
                GLITCH_REPLY.to_string()
            }
        };
        if reply.is_empty() {
            return false;
        }

        match platform.dm_send(&conversation.id, &reply).await {
            Ok(()) => {
                self.services.log.record(format!(
                    "DM: replied in conversation {}: {:?}",
                    conversation.id,
                    clip(&reply, 80)
                ));
                info!("Replied to DM conversation {}", conversation.id);
                true
            }
            Err(e) => {
                warn!("DM send to {} failed: {}", conversation.id, e);
                false
            }
        }
    }
}
