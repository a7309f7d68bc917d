//! Moltbook Engager - Entry Point
//!
//! Modes:
//! - Default: poll loop (DMs, comment replies, feed, promo every cycle)
//! - --once / -1: one full cycle
//! - --comments-only / -c: one comment-reply pass
//! - --post-promo [N] / -p [N]: publish a promo from the promo file
//! - --recent-comments / -r: print recent comments on our posts

use anyhow::Context;
use moltbook_engager::commands;
use moltbook_engager::cycle::{forward_shutdown, CycleOrchestrator, CycleSettings, Services};
use moltbook_engager::{
    ClaudeJudge, Config, EngagementLog, KnowledgeBase, MoltbookClient, NoContext, OwnPostIndex, Platform, Retriever,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn print_help() {
    println!("Moltbook Engager v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: moltbook-engager [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --once, -1              Run one full cycle and exit");
    println!("  --comments-only, -c     Reply to comments on our posts once and exit");
    println!("  --post-promo, -p [N]    Post promo N (default: last) from the promo file");
    println!("  --recent-comments, -r   Show recent comments on our posts");
    println!("  --json                  Log as JSON to stderr");
    println!("  --help, -h              Show this help");
    println!();
    println!("Default: poll loop until Ctrl-C");
    println!();
    println!("Environment variables:");
    println!("  MOLTBOOK_API_KEY         Moltbook API key (required)");
    println!("  MOLTBOOK_POLL_INTERVAL   Seconds between cycles (default: 300, min 60)");
    println!("  MOLTBOOK_SUBMOLTS        Submolts to subscribe to (default: general)");
    println!("  MOLTBOOK_AD_SUBMOLTS     Promo target submolts");
    println!("  MOLTBOOK_OUR_POST_IDS    Post ids always treated as ours");
    println!("  MOLTBOOK_COMMENT_ON_FEED 0 disables feed upvotes/replies");
    println!("  MOLTBOOK_POST_PROMOS     0 disables promo posts");
    println!("  MOLTBOOK_KNOWLEDGE_DIR   Background docs for grounding replies");
    println!("  MOLTBOOK_DEBUG           Verbose logging");
    println!("  ANTHROPIC_API_KEY        Claude API key");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let has = |long: &str, short: &str| args.iter().any(|a| a == long || a == short);
    let help_mode = has("--help", "-h");
    let once_mode = has("--once", "-1");
    let comments_only = has("--comments-only", "-c");
    let recent_mode = has("--recent-comments", "-r");
    let json_logs = args.iter().any(|a| a == "--json");
    let promo_pos = args.iter().position(|a| a == "--post-promo" || a == "-p");
    let promo_choice = promo_pos
        .and_then(|i| args.get(i + 1))
        .and_then(|n| n.parse::<usize>().ok());

    if help_mode {
        print_help();
        return Ok(());
    }

    let config = Config::from_env()?;

    // Setup logging
    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(if config.debug { Level::DEBUG } else { Level::INFO });

    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Moltbook Engager v{}", env!("CARGO_PKG_VERSION"));

    let client = MoltbookClient::from_config(&config);
    let platform: Arc<dyn Platform> = Arc::new(client);

    let status = commands::check_claim(platform.as_ref()).await?;
    info!("Agent status: {:?}", status);

    let index = OwnPostIndex::from_config(&config);
    let log = EngagementLog::new(&config.engagement_log);

    if recent_mode {
        for entry in commands::recent_comments(platform.as_ref(), &index).await {
            println!("== {} ({})", entry.post.title, entry.post.id);
            if entry.comments.is_empty() {
                println!("   (no comments)");
            }
            for c in &entry.comments {
                println!("   [{}] {}: {}", c.id, c.author_name, c.body.replace('\n', " "));
            }
        }
        return Ok(());
    }

    if promo_pos.is_some() {
        let drafts = moltbook_engager::promo_file::load_promos(&config.promo_file)
            .with_context(|| format!("reading {}", config.promo_file.display()))?;
        let draft = commands::choose_promo(&drafts, promo_choice)?;
        let default_submolt = config.submolts.first().map(String::as_str).unwrap_or("general");
        commands::post_promo(platform.as_ref(), &index, &log, draft, default_submolt).await?;
        return Ok(());
    }

    commands::subscribe_all(platform.as_ref(), &config.submolts).await;

    let judge = ClaudeJudge::from_config(&config);
    if !judge.is_available() {
        warn!("ANTHROPIC_API_KEY not set; judge calls will fail and fallbacks will be used");
    }
    let retriever: Arc<dyn Retriever> = match &config.knowledge_dir {
        Some(dir) => match KnowledgeBase::load(dir) {
            Ok(kb) => Arc::new(kb),
            Err(e) => {
                warn!("Knowledge dir {} unusable: {}", dir.display(), e);
                Arc::new(NoContext)
            }
        },
        None => Arc::new(NoContext),
    };

    let services = Services {
        platform,
        judge: Arc::new(judge),
        retriever,
        log,
    };
    let mut orchestrator = CycleOrchestrator::new(services, index, CycleSettings::from_config(&config));

    if comments_only {
        let sent = orchestrator.run_comment_phase().await?;
        info!("Replied to {} comment(s)", sent);
        return Ok(());
    }

    if once_mode {
        let report = orchestrator.run_cycle().await;
        info!(
            "Cycle done: {} DM repl(ies), {} comment repl(ies), upvoted {:?}, replied {:?}",
            report.dm_replies, report.comment_replies, report.feed.upvoted, report.feed.replied
        );
        return Ok(());
    }

    // Ctrl-C flips the shutdown flag; the loop honors it between cycles
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(forward_shutdown(tokio::signal::ctrl_c(), shutdown_tx));

    orchestrator.run_loop(config.poll_interval(), shutdown_rx).await;
    Ok(())
}
