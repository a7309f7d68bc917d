//! Engagement Cycle
//!
//! One cycle runs four phases in a fixed order:
//!
//! ```text
//! Idle ──► DirectMessages ──► CommentReplies ──► Feed ──► Promo ──► Idle
//! ```
//!
//! A phase that fails is logged and skipped; the remaining phases still run.
//! Everything happens on one task: phases never overlap, so the cooldown
//! gate and dedup ledger are plain owned state. If phases are ever run
//! concurrently, `EngagementState` becomes the synchronization boundary.

pub mod comments;
pub mod dm;
pub mod feed;
pub mod promo;

pub use comments::{CommentBatchReplier, CommentRef, COMMENT_BATCH_SIZE, HONEYPOT_FALLBACKS};
pub use dm::DmResponder;
pub use feed::{FeedEngager, FeedOutcome};
pub use promo::{promo_target, PromoOutcome, PromoPublisher};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{Config, MIN_POLL_INTERVAL_SECS};
use crate::dedup::DedupLedger;
use crate::engagement_log::EngagementLog;
use crate::judge::Judge;
use crate::own_posts::OwnPostIndex;
use crate::platform::Platform;
use crate::rate_gate::RateGate;
use crate::retrieval::Retriever;

/// External collaborators shared by every phase
#[derive(Clone)]
pub struct Services {
    pub platform: Arc<dyn Platform>,
    pub judge: Arc<dyn Judge>,
    pub retriever: Arc<dyn Retriever>,
    pub log: EngagementLog,
}

/// Process-lifetime engagement state: cooldowns and dedup sets
#[derive(Debug, Default)]
pub struct EngagementState {
    pub gate: RateGate,
    pub ledger: DedupLedger,
}

impl EngagementState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cycle-level settings
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Name used in generated text
    pub persona_name: String,
    pub feed_sort: String,
    pub feed_limit: usize,
    pub comment_on_feed: bool,
    pub post_promos: bool,
    pub ad_submolts: Vec<String>,
    pub top_submolts: Vec<String>,
    pub max_comment_batch: usize,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            persona_name: "AIGarth".to_string(),
            feed_sort: "new".to_string(),
            feed_limit: 15,
            comment_on_feed: true,
            post_promos: true,
            ad_submolts: vec!["general".to_string()],
            top_submolts: Vec::new(),
            max_comment_batch: COMMENT_BATCH_SIZE,
        }
    }
}

impl CycleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            persona_name: config.agent_name.clone(),
            feed_sort: config.feed_sort.clone(),
            feed_limit: config.feed_limit,
            comment_on_feed: config.comment_on_feed,
            post_promos: config.post_promos,
            ad_submolts: config.ad_submolts.clone(),
            top_submolts: config.top_submolts.clone(),
            max_comment_batch: COMMENT_BATCH_SIZE,
        }
    }
}

/// Where the orchestrator is within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    DirectMessages,
    CommentReplies,
    Feed,
    Promo,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DirectMessages => "dm",
            Self::CommentReplies => "comment_replies",
            Self::Feed => "feed",
            Self::Promo => "promo",
        }
    }

    /// Fixed phase order; Promo wraps back to Idle
    pub fn next(&self) -> Self {
        match self {
            Self::Idle => Self::DirectMessages,
            Self::DirectMessages => Self::CommentReplies,
            Self::CommentReplies => Self::Feed,
            Self::Feed => Self::Promo,
            Self::Promo => Self::Idle,
        }
    }
}

/// What one cycle did
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub dm_replies: usize,
    pub comment_replies: usize,
    pub feed: FeedOutcome,
    pub promo: Option<PromoOutcome>,
    pub failed_phases: Vec<CyclePhase>,
}

/// Runs engagement cycles on a fixed poll interval
pub struct CycleOrchestrator {
    services: Services,
    index: OwnPostIndex,
    settings: CycleSettings,
    state: EngagementState,
    phase: CyclePhase,
}

impl CycleOrchestrator {
    pub fn new(services: Services, index: OwnPostIndex, settings: CycleSettings) -> Self {
        Self {
            services,
            index,
            settings,
            state: EngagementState::new(),
            phase: CyclePhase::Idle,
        }
    }

    pub fn state(&self) -> &EngagementState {
        &self.state
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn index(&self) -> &OwnPostIndex {
        &self.index
    }

    fn transition_to(&mut self, next: CyclePhase) {
        if self.phase != next {
            debug!("Cycle: {} -> {}", self.phase.as_str(), next.as_str());
        }
        self.phase = next;
    }

    fn phase_failed(&self, report: &mut CycleReport, err: anyhow::Error) {
        warn!("{} phase failed: {:#}", self.phase.as_str(), err);
        report.failed_phases.push(self.phase);
    }

    /// Run one full cycle. Never fails: phase errors land in the report.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        self.services.log.record("--- CYCLE START ---");
        info!("Cycle start: DMs, replies on our posts, feed, promo");

        self.transition_to(CyclePhase::DirectMessages);
        let dm = DmResponder::new(&self.services, &self.settings.persona_name).run().await;
        match dm {
            Ok(n) => report.dm_replies = n,
            Err(e) => self.phase_failed(&mut report, e),
        }

        self.transition_to(CyclePhase::CommentReplies);
        match self.run_comment_phase().await {
            Ok(n) => report.comment_replies = n,
            Err(e) => self.phase_failed(&mut report, e),
        }

        self.transition_to(CyclePhase::Feed);
        if self.settings.comment_on_feed {
            let feed = FeedEngager::new(&self.services, &self.index, &mut self.state, &self.settings)
                .run()
                .await;
            match feed {
                Ok(outcome) => report.feed = outcome,
                Err(e) => self.phase_failed(&mut report, e),
            }
        }

        self.transition_to(CyclePhase::Promo);
        let promo = PromoPublisher::new(&self.services, &self.index, &mut self.state, &self.settings)
            .run()
            .await;
        match promo {
            Ok(outcome) => report.promo = Some(outcome),
            Err(e) => self.phase_failed(&mut report, e),
        }

        self.transition_to(CyclePhase::Idle);
        self.services.log.record(format!(
            "--- CYCLE END (replied to {} comment(s) on our posts) ---",
            report.comment_replies
        ));
        report
    }

    /// Comment-reply phase alone (also used by the one-shot CLI mode)
    pub async fn run_comment_phase(&mut self) -> anyhow::Result<usize> {
        CommentBatchReplier::new(&self.services, &self.index, &mut self.state, &self.settings.persona_name)
            .run(self.settings.max_comment_batch)
            .await
    }

    /// Poll until `shutdown` flips to true. Shutdown is honored between
    /// cycles and during the sleep, never mid-cycle.
    pub async fn run_loop(&mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let interval = interval.max(Duration::from_secs(MIN_POLL_INTERVAL_SECS));
        info!("Starting poll loop (interval {}s)", interval.as_secs());
        self.services.log.record("BOT STARTED (poll loop starting)");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.run_cycle().await;
            if !report.failed_phases.is_empty() {
                let failed: Vec<_> = report.failed_phases.iter().map(|p| p.as_str()).collect();
                warn!("Cycle finished with failed phases: {}", failed.join(", "));
            }

            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    // Sender gone or shutdown requested
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Poll loop stopped");
    }
}

/// Flip `shutdown` once `signal` fires. If the signal source fails, the
/// sender is held forever so the poll loop keeps running.
pub async fn forward_shutdown<F>(signal: F, shutdown: watch::Sender<bool>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Shutdown signal received, stopping after the current cycle");
            let _ = shutdown.send(true);
        }
        Err(e) => {
            warn!("Shutdown signal unavailable: {}", e);
            std::future::pending::<()>().await;
            drop(shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_wraps() {
        let mut phase = CyclePhase::Idle;
        let mut seen = Vec::new();
        for _ in 0..5 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                CyclePhase::DirectMessages,
                CyclePhase::CommentReplies,
                CyclePhase::Feed,
                CyclePhase::Promo,
                CyclePhase::Idle,
            ]
        );
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::from_vars(|k| match k {
            "MOLTBOOK_API_KEY" => Some("key".to_string()),
            "MOLTBOOK_AD_SUBMOLTS" => Some("ai,agents".to_string()),
            "MOLTBOOK_AGENT_NAME" => Some("Garth".to_string()),
            _ => None,
        })
        .unwrap();
        let settings = CycleSettings::from_config(&config);
        assert_eq!(settings.persona_name, "Garth");
        assert_eq!(settings.ad_submolts, vec!["ai", "agents"]);
        assert_eq!(settings.max_comment_batch, COMMENT_BATCH_SIZE);
    }
}
