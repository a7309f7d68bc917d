//! In-memory Platform and Judge fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use moltbook_engager::cycle::{CycleSettings, Services};
use moltbook_engager::platform::{
    ClaimStatus, Comment, ConversationSummary, DmCheck, DmMessage, Platform, PlatformError, PlatformResult, Post,
    Profile,
};
use moltbook_engager::{EngagementLog, Judge, NoContext};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const AGENT: &str = "AIGarth";

pub fn post(id: &str, author: &str) -> Post {
    Post {
        id: id.to_string(),
        title: format!("Post {}", id),
        content: format!("Content of {}", id),
        submolt: Some("general".to_string()),
        author_name: Some(author.to_string()),
    }
}

pub fn comment(id: &str, author: &str, body: &str) -> Comment {
    Comment {
        id: id.to_string(),
        author_name: author.to_string(),
        body: body.to_string(),
        created_at: None,
    }
}

pub fn rate_limited() -> PlatformError {
    PlatformError::RateLimited {
        message: "too frequent".to_string(),
        retry_after_secs: Some(20),
    }
}

pub fn server_error() -> PlatformError {
    PlatformError::Api {
        status: 500,
        message: "internal error".to_string(),
        hint: None,
    }
}

pub fn not_found() -> PlatformError {
    PlatformError::Api {
        status: 404,
        message: "not found".to_string(),
        hint: None,
    }
}

/// Scripted platform that records every call
#[derive(Default)]
pub struct FakePlatform {
    pub profile: Mutex<Option<Profile>>,
    pub posts: Mutex<HashMap<String, Post>>,
    pub feed: Mutex<Vec<Post>>,
    pub submolt_posts: Mutex<HashMap<String, Vec<Post>>>,
    pub comments: Mutex<HashMap<String, Vec<Comment>>>,
    /// `add_comment` answers 429 on this (1-based) call
    pub comment_rate_limit_on: Mutex<Option<usize>>,
    /// `add_comment` answers 500 on this (1-based) call
    pub comment_fails_on: Mutex<Option<usize>>,
    pub upvote_rate_limited: Mutex<bool>,
    pub create_post_rate_limited: Mutex<bool>,
    pub dm_check_fails: Mutex<bool>,
    pub dm: Mutex<DmCheck>,
    pub conversations: Mutex<Vec<ConversationSummary>>,
    pub messages: Mutex<HashMap<String, Vec<DmMessage>>>,

    pub calls: Mutex<Vec<String>>,
    pub added_comments: Mutex<Vec<(String, String, Option<String>)>>,
    pub upvotes: Mutex<Vec<String>>,
    pub created_posts: Mutex<Vec<(String, String, String)>>,
    pub sent_dms: Mutex<Vec<(String, String)>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let fake = Self::default();
        *fake.profile.lock().unwrap() = Some(Profile {
            name: Some(AGENT.to_string()),
            recent_posts: Vec::new(),
        });
        fake
    }

    pub fn add_post(&self, post: Post) {
        self.posts.lock().unwrap().insert(post.id.clone(), post);
    }

    pub fn set_comments(&self, post_id: &str, comments: Vec<Comment>) {
        self.comments.lock().unwrap().insert(post_id.to_string(), comments);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn status(&self) -> PlatformResult<ClaimStatus> {
        self.record("status");
        Ok(ClaimStatus::Claimed)
    }

    async fn subscribe_submolt(&self, _name: &str) -> PlatformResult<()> {
        self.record("subscribe_submolt");
        Ok(())
    }

    async fn get_own_profile(&self) -> PlatformResult<Profile> {
        self.record("get_own_profile");
        self.profile.lock().unwrap().clone().ok_or_else(not_found)
    }

    async fn get_post(&self, id: &str) -> PlatformResult<Post> {
        self.record("get_post");
        self.posts.lock().unwrap().get(id).cloned().ok_or_else(not_found)
    }

    async fn list_feed(&self, _sort: &str, limit: usize) -> PlatformResult<Vec<Post>> {
        self.record("list_feed");
        Ok(self.feed.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn list_posts(&self, submolt: &str, _sort: &str, limit: usize) -> PlatformResult<Vec<Post>> {
        self.record("list_posts");
        let posts = self.submolt_posts.lock().unwrap();
        Ok(posts
            .get(submolt)
            .map(|p| p.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_comments(&self, post_id: &str, _sort: &str) -> PlatformResult<Vec<Comment>> {
        self.record("get_comments");
        Ok(self.comments.lock().unwrap().get(post_id).cloned().unwrap_or_default())
    }

    async fn add_comment(&self, post_id: &str, content: &str, parent_id: Option<&str>) -> PlatformResult<()> {
        self.record("add_comment");
        let attempt = self.count("add_comment");
        if *self.comment_rate_limit_on.lock().unwrap() == Some(attempt) {
            return Err(rate_limited());
        }
        if *self.comment_fails_on.lock().unwrap() == Some(attempt) {
            return Err(server_error());
        }
        self.added_comments.lock().unwrap().push((
            post_id.to_string(),
            content.to_string(),
            parent_id.map(String::from),
        ));
        Ok(())
    }

    async fn create_post(&self, submolt: &str, title: &str, content: &str) -> PlatformResult<Option<String>> {
        self.record("create_post");
        if *self.create_post_rate_limited.lock().unwrap() {
            return Err(rate_limited());
        }
        let mut created = self.created_posts.lock().unwrap();
        created.push((submolt.to_string(), title.to_string(), content.to_string()));
        Ok(Some(format!("new-{}", created.len())))
    }

    async fn upvote_post(&self, id: &str) -> PlatformResult<()> {
        self.record("upvote_post");
        if *self.upvote_rate_limited.lock().unwrap() {
            return Err(rate_limited());
        }
        self.upvotes.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn dm_check(&self) -> PlatformResult<DmCheck> {
        self.record("dm_check");
        if *self.dm_check_fails.lock().unwrap() {
            return Err(PlatformError::Decode("bad dm payload".to_string()));
        }
        Ok(self.dm.lock().unwrap().clone())
    }

    async fn dm_conversations(&self) -> PlatformResult<Vec<ConversationSummary>> {
        self.record("dm_conversations");
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn dm_get_conversation(&self, conversation_id: &str) -> PlatformResult<Vec<DmMessage>> {
        self.record("dm_get_conversation");
        self.messages
            .lock()
            .unwrap()
            .get(conversation_id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn dm_send(&self, conversation_id: &str, message: &str) -> PlatformResult<()> {
        self.record("dm_send");
        self.sent_dms
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), message.to_string()));
        Ok(())
    }
}

type Rule = Box<dyn Fn(&str) -> anyhow::Result<String> + Send + Sync>;

/// Judge answering from a closure over the prompt
pub struct ScriptedJudge {
    rule: Rule,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    pub fn new(rule: impl Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Same answer for every prompt
    pub fn always(answer: &str) -> Self {
        let answer = answer.to_string();
        Self::new(move |_| Ok(answer.clone()))
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(anyhow::anyhow!("judge offline")))
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn answer(&self, prompt: &str, _context: &[String]) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.rule)(prompt)
    }
}

pub fn services(platform: &Arc<FakePlatform>, judge: &Arc<ScriptedJudge>) -> Services {
    Services {
        platform: platform.clone(),
        judge: judge.clone(),
        retriever: Arc::new(NoContext),
        log: EngagementLog::disabled(),
    }
}

pub fn settings() -> CycleSettings {
    CycleSettings {
        persona_name: AGENT.to_string(),
        ..CycleSettings::default()
    }
}
