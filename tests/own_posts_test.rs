//! Own Post Resolution Integration Tests

mod common;

use common::*;
use moltbook_engager::platform::Profile;
use moltbook_engager::{OwnPostIndex, PostIdLog};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

fn ids(posts: &[moltbook_engager::platform::Post]) -> Vec<String> {
    posts.iter().map(|p| p.id.clone()).collect()
}

#[tokio::test]
async fn test_resolution_never_duplicates_across_sources() {
    let dir = TempDir::new().unwrap();
    let log = PostIdLog::new(dir.path().join("our_post_ids.txt"));
    log.append("p2").unwrap();
    log.append("p3").unwrap();
    log.append("p2").unwrap();

    let platform = Arc::new(FakePlatform::new());
    for id in ["p1", "p2", "p3", "p4", "p5"] {
        platform.add_post(post(id, AGENT));
    }
    *platform.profile.lock().unwrap() = Some(Profile {
        name: Some(AGENT.to_string()),
        recent_posts: vec![post("p1", AGENT), post("p4", AGENT)],
    });
    *platform.feed.lock().unwrap() = vec![post("p3", AGENT), post("p4", AGENT), post("x1", "other")];
    platform
        .submolt_posts
        .lock()
        .unwrap()
        .insert("general".to_string(), vec![post("p1", AGENT), post("p5", AGENT)]);

    let index = OwnPostIndex::new(log, vec!["p1".to_string(), "p2".to_string()], vec!["general".to_string()], AGENT);
    let own = index.resolve(platform.as_ref()).await;

    let resolved = ids(&own.posts);
    let unique: HashSet<_> = resolved.iter().collect();
    assert_eq!(unique.len(), resolved.len());
    assert_eq!(resolved, vec!["p1", "p2", "p3", "p4", "p5"]);
    assert_eq!(own.agent_name, AGENT);
}

#[tokio::test]
async fn test_resolution_stops_once_enough_posts_found() {
    let dir = TempDir::new().unwrap();
    let platform = Arc::new(FakePlatform::new());
    let configured: Vec<String> = (1..=5).map(|i| format!("p{}", i)).collect();
    for id in &configured {
        platform.add_post(post(id, AGENT));
    }

    let index = OwnPostIndex::new(
        PostIdLog::new(dir.path().join("ids.txt")),
        configured.clone(),
        vec!["general".to_string()],
        AGENT,
    );
    let own = index.resolve(platform.as_ref()).await;

    assert_eq!(ids(&own.posts), configured);
    assert_eq!(platform.count("list_feed"), 0);
    assert_eq!(platform.count("list_posts"), 0);
}

#[tokio::test]
async fn test_missing_ids_and_profile_are_not_fatal() {
    let dir = TempDir::new().unwrap();
    let platform = Arc::new(FakePlatform::new());
    *platform.profile.lock().unwrap() = None;
    platform.add_post(post("p1", "Fallback"));
    *platform.feed.lock().unwrap() = vec![post("f1", "Fallback"), post("f2", "someone")];

    let index = OwnPostIndex::new(
        PostIdLog::new(dir.path().join("ids.txt")),
        vec!["gone".to_string(), "p1".to_string()],
        vec!["general".to_string(), "ai".to_string(), "agents".to_string()],
        "Fallback",
    );
    let own = index.resolve(platform.as_ref()).await;

    assert_eq!(own.agent_name, "Fallback");
    assert_eq!(ids(&own.posts), vec!["p1", "f1"]);
    // Only the first two submolts are scanned
    assert_eq!(platform.count("list_posts"), 2);
}
