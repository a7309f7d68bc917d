//! Configuration management

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Default Moltbook API root (always www)
pub const DEFAULT_API_BASE: &str = "https://www.moltbook.com/api/v1";

/// Minimum poll interval between cycles
pub const MIN_POLL_INTERVAL_SECS: u64 = 60;

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Moltbook API key (required)
    pub api_key: String,

    /// Moltbook API root
    pub api_base: String,

    /// Seconds between poll cycles (>= 60)
    pub poll_interval_secs: u64,

    /// Feed sort for the feed phase (new, hot, top)
    pub feed_sort: String,

    /// Feed page size for the feed phase
    pub feed_limit: usize,

    /// Submolts to subscribe to and scan for our posts
    pub submolts: Vec<String>,

    /// Submolts promos may be posted to
    pub ad_submolts: Vec<String>,

    /// Optional allow-list restricting promo targets
    pub top_submolts: Vec<String>,

    /// Post ids that are always treated as ours
    pub our_post_ids: Vec<String>,

    /// Append-only log of post ids we created
    pub post_ids_file: PathBuf,

    /// Append-only engagement trail
    pub engagement_log: PathBuf,

    /// Upvote and reply on the feed
    pub comment_on_feed: bool,

    /// Publish promo posts
    pub post_promos: bool,

    /// Verbose logging
    pub debug: bool,

    /// Display name used when the profile lookup fails
    pub agent_name: String,

    /// Directory of background documents for retrieval (optional)
    pub knowledge_dir: Option<PathBuf>,

    /// Hand-written promos for one-shot posting
    pub promo_file: PathBuf,

    /// Anthropic API key for the judge (optional - judge calls fail without it)
    pub anthropic_api_key: Option<String>,

    /// Judge model hint (haiku, sonnet, opus)
    pub judge_model: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = non_empty("MOLTBOOK_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("MOLTBOOK_API_KEY not set"))?;

        let api_base = non_empty("MOLTBOOK_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let poll_interval_secs = non_empty("MOLTBOOK_POLL_INTERVAL")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300)
            .max(MIN_POLL_INTERVAL_SECS);

        let feed_sort = non_empty("MOLTBOOK_FEED_SORT").unwrap_or_else(|| "new".to_string());

        let feed_limit = non_empty("MOLTBOOK_FEED_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);

        let submolts = parse_list(&non_empty("MOLTBOOK_SUBMOLTS").unwrap_or_else(|| "general".to_string()));
        let ad_submolts = non_empty("MOLTBOOK_AD_SUBMOLTS")
            .map(|v| parse_list(&v))
            .unwrap_or_else(|| submolts.clone());
        let top_submolts = non_empty("MOLTBOOK_TOP_SUBMOLTS")
            .map(|v| parse_list(&v))
            .unwrap_or_default();
        let our_post_ids = non_empty("MOLTBOOK_OUR_POST_IDS")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        let post_ids_file = non_empty("MOLTBOOK_POST_IDS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("our_post_ids.txt"));

        let engagement_log = non_empty("MOLTBOOK_ENGAGEMENT_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("engagement.log"));

        let comment_on_feed = var("MOLTBOOK_COMMENT_ON_FEED")
            .map(|v| v.trim() != "0")
            .unwrap_or(true);

        let post_promos = var("MOLTBOOK_POST_PROMOS")
            .map(|v| v.trim() != "0")
            .unwrap_or(true);

        let debug = var("MOLTBOOK_DEBUG")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let agent_name = non_empty("MOLTBOOK_AGENT_NAME").unwrap_or_else(|| "AIGarth".to_string());

        let knowledge_dir = non_empty("MOLTBOOK_KNOWLEDGE_DIR").map(PathBuf::from);

        let promo_file = non_empty("MOLTBOOK_PROMO_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("promo_posts.md"));

        let anthropic_api_key = non_empty("ANTHROPIC_API_KEY");

        let judge_model = non_empty("MOLTBOOK_JUDGE_MODEL").unwrap_or_else(|| "haiku".to_string());

        Ok(Self {
            api_key,
            api_base,
            poll_interval_secs,
            feed_sort,
            feed_limit,
            submolts,
            ad_submolts,
            top_submolts,
            our_post_ids,
            post_ids_file,
            engagement_log,
            comment_on_feed,
            post_promos,
            debug,
            agent_name,
            knowledge_dir,
            promo_file,
            anthropic_api_key,
            judge_model,
        })
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Split a comma-separated list, trimming and dropping empty items
pub fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_missing_api_key_is_error() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("MOLTBOOK_API_KEY", "   ")]).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("MOLTBOOK_API_KEY", "key")]).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.feed_sort, "new");
        assert_eq!(config.feed_limit, 15);
        assert_eq!(config.submolts, vec!["general"]);
        assert_eq!(config.ad_submolts, vec!["general"]);
        assert!(config.top_submolts.is_empty());
        assert!(config.comment_on_feed);
        assert!(config.post_promos);
        assert!(!config.debug);
        assert_eq!(config.agent_name, "AIGarth");
    }

    #[test]
    fn test_poll_interval_clamped() {
        let config = config_from(&[("MOLTBOOK_API_KEY", "key"), ("MOLTBOOK_POLL_INTERVAL", "5")]).unwrap();
        assert_eq!(config.poll_interval_secs, MIN_POLL_INTERVAL_SECS);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_lists_and_flags() {
        let config = config_from(&[
            ("MOLTBOOK_API_KEY", "key"),
            ("MOLTBOOK_SUBMOLTS", "general, agents ,,ai"),
            ("MOLTBOOK_TOP_SUBMOLTS", "ai"),
            ("MOLTBOOK_OUR_POST_IDS", "p1,p2"),
            ("MOLTBOOK_POST_PROMOS", "0"),
            ("MOLTBOOK_COMMENT_ON_FEED", "0"),
            ("MOLTBOOK_DEBUG", "Yes"),
        ])
        .unwrap();
        assert_eq!(config.submolts, vec!["general", "agents", "ai"]);
        assert_eq!(config.ad_submolts, config.submolts);
        assert_eq!(config.top_submolts, vec!["ai"]);
        assert_eq!(config.our_post_ids, vec!["p1", "p2"]);
        assert!(!config.post_promos);
        assert!(!config.comment_on_feed);
        assert!(config.debug);
    }

    #[test]
    fn test_parse_list() {
        assert!(parse_list("").is_empty());
        assert_eq!(parse_list(" a , b,"), vec!["a", "b"]);
    }
}
