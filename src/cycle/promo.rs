//! Promo Publisher
//!
//! Once the 30 minute post cooldown has passed, generates one promo post and
//! publishes it. A generation that fails to parse falls back to a fixed
//! title/content pair so a publish is always attempted.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use super::{CycleSettings, EngagementState, Services};
use crate::engagement_log::clip;
use crate::judge::parse_json;
use crate::own_posts::OwnPostIndex;
use crate::prompts;
use crate::rate_gate::ActionClass;

/// Submolt used when no target is configured
pub const DEFAULT_SUBMOLT: &str = "general";
pub const FALLBACK_TITLE: &str = "AI Power Grid";
pub const FALLBACK_CONTENT: &str =
    "Decentralized inference. API keys at https://dashboard.aipowergrid.io - aipowergrid.io";
const DEFAULT_CONTENT: &str = "Get API keys at https://dashboard.aipowergrid.io - aipowergrid.io";
const MAX_TITLE_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 2000;
const CONTEXT_SNIPPETS: usize = 3;

/// What the promo phase did
#[derive(Debug, Clone, PartialEq)]
pub enum PromoOutcome {
    /// Promo posting switched off
    Disabled,
    /// Cooldown still running for this long
    CoolingDown(Duration),
    Published {
        submolt: String,
        post_id: Option<String>,
    },
    /// Platform refused; cooldown recorded anyway
    RateLimited,
}

#[derive(Debug, Deserialize)]
struct GeneratedPromo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// First ad target on the top allow-list, else the first ad target, else the default
pub fn promo_target(ad_submolts: &[String], top_submolts: &[String]) -> String {
    ad_submolts
        .iter()
        .find(|s| top_submolts.is_empty() || top_submolts.contains(s))
        .or_else(|| ad_submolts.first())
        .cloned()
        .unwrap_or_else(|| DEFAULT_SUBMOLT.to_string())
}

/// Title and content from a generation answer, or the fixed fallback pair
fn promo_from_answer(raw: &str) -> (String, String) {
    match parse_json::<GeneratedPromo>(raw) {
        Ok(generated) => {
            let title = generated
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| FALLBACK_TITLE.to_string());
            let content = generated
                .content
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT.to_string());
            (
                clip(&title, MAX_TITLE_CHARS).to_string(),
                clip(&content, MAX_CONTENT_CHARS).to_string(),
            )
        }
        Err(e) => {
            warn!("Promo generation unusable ({}), using fallback", e);
            (FALLBACK_TITLE.to_string(), FALLBACK_CONTENT.to_string())
        }
    }
}

/// Publishes promo posts on cooldown expiry
pub struct PromoPublisher<'a> {
    services: &'a Services,
    index: &'a OwnPostIndex,
    state: &'a mut EngagementState,
    settings: &'a CycleSettings,
}

impl<'a> PromoPublisher<'a> {
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

    pub async fn run(&mut self) -> Result<PromoOutcome> {
        if !self.settings.post_promos {
            return Ok(PromoOutcome::Disabled);
        }
        let wait = self.state.gate.remaining_wait(ActionClass::Promo);
        if !wait.is_zero() {
            return Ok(PromoOutcome::CoolingDown(wait));
        }

        let (title, content) = self.generate().await;
        let submolt = promo_target(&self.settings.ad_submolts, &self.settings.top_submolts);

        match self.services.platform.create_post(&submolt, &title, &content).await {
            Ok(post_id) => {
                self.state.gate.record_now(ActionClass::Promo);
                if let Some(id) = &post_id {
                    if let Err(e) = self.index.append_post_id(id) {
                        warn!(
                            "Could not save post id to {}: {}",
                            self.index.log().path().display(),
                            e
                        );
                    }
                }
                self.services
                    .log
                    .record(format!("PROMO: posted to m/{}: {:?}", submolt, clip(&title, 60)));
                info!("Promo posted to m/{}: {}", submolt, clip(&title, 50));
                Ok(PromoOutcome::Published { submolt, post_id })
            }
            Err(e) if e.is_rate_limited() => {
                self.state.gate.record_now(ActionClass::Promo);
                info!("Post cooldown (30 min); will retry later: {}", e);
                Ok(PromoOutcome::RateLimited)
            }
            Err(e) => Err(anyhow::Error::new(e).context(format!("promo post to m/{} failed", submolt))),
        }
    }

    async fn generate(&self) -> (String, String) {
        let prompt = prompts::promo_prompt(&self.settings.persona_name);
        let context = self
            .services
            .retriever
            .relevant_context(prompts::PROMO_CONTEXT_QUERY, CONTEXT_SNIPPETS);
        match self.services.judge.answer(&prompt, &context).await {
            Ok(raw) => promo_from_answer(&raw),
            Err(e) => {
                warn!("Promo generation failed ({:#}), using fallback", e);
                (FALLBACK_TITLE.to_string(), FALLBACK_CONTENT.to_string())
            }
        }
    }
}
