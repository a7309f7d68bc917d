//! Moltbook API Client
//!
//! REST client for https://www.moltbook.com/api/v1. Never send the API key
//! to any other host.
//!
//! Response shapes drift between endpoints (`posts` vs `items`, envelopes,
//! nested comment lists), so bodies are read as `serde_json::Value` and
//! picked apart defensively.

use super::traits::*;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Moltbook REST client
#[derive(Clone)]
pub struct MoltbookClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl MoltbookClient {
    pub fn new(api_base: &str, api_key: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        }
    }

    /// Create from config
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base, &config.api_key)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base, path)
        } else {
            format!("{}/{}", self.api_base, path)
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> PlatformResult<Value> {
        let url = self.url(path);
        debug!("Moltbook {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let data: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), &data, &text));
        }

        Ok(unwrap_envelope(data))
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> PlatformResult<Value> {
        self.request(Method::GET, path, query, None).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> PlatformResult<Value> {
        self.request(Method::POST, path, &[], body).await
    }
}

#[async_trait]
impl Platform for MoltbookClient {
    async fn status(&self) -> PlatformResult<ClaimStatus> {
        let data = self.get("/agents/status", &[]).await?;
        Ok(match str_field(&data, &["status"]).as_deref() {
            Some("claimed") => ClaimStatus::Claimed,
            Some("pending_claim") => ClaimStatus::PendingClaim,
            Some(other) => ClaimStatus::Other(other.to_string()),
            None => ClaimStatus::Other(String::new()),
        })
    }

    async fn subscribe_submolt(&self, name: &str) -> PlatformResult<()> {
        self.post(&format!("/submolts/{}/subscribe", name), None).await?;
        Ok(())
    }

    async fn get_own_profile(&self) -> PlatformResult<Profile> {
        let data = self.get("/agents/me", &[]).await?;
        Ok(parse_profile(&data))
    }

    async fn get_post(&self, id: &str) -> PlatformResult<Post> {
        let data = self.get(&format!("/posts/{}", id), &[]).await?;
        let post = data.get("post").filter(|p| p.is_object()).unwrap_or(&data);
        parse_post(post).ok_or_else(|| PlatformError::Decode(format!("post {} has no id", id)))
    }

    async fn list_feed(&self, sort: &str, limit: usize) -> PlatformResult<Vec<Post>> {
        let data = self
            .get("/feed", &[("sort", sort.to_string()), ("limit", limit.to_string())])
            .await?;
        Ok(parse_post_list(&data))
    }

    async fn list_posts(&self, submolt: &str, sort: &str, limit: usize) -> PlatformResult<Vec<Post>> {
        let data = self
            .get(
                "/posts",
                &[
                    ("sort", sort.to_string()),
                    ("limit", limit.to_string()),
                    ("submolt", submolt.to_string()),
                ],
            )
            .await?;
        Ok(parse_post_list(&data))
    }

    async fn get_comments(&self, post_id: &str, sort: &str) -> PlatformResult<Vec<Comment>> {
        let data = self
            .get(&format!("/posts/{}/comments", post_id), &[("sort", sort.to_string())])
            .await?;
        Ok(parse_comments(&data))
    }

    async fn add_comment(&self, post_id: &str, content: &str, parent_id: Option<&str>) -> PlatformResult<()> {
        let mut payload = json!({ "content": content });
        if let Some(parent) = parent_id {
            payload["parent_id"] = json!(parent);
        }
        self.post(&format!("/posts/{}/comments", post_id), Some(payload)).await?;
        Ok(())
    }

    async fn create_post(&self, submolt: &str, title: &str, content: &str) -> PlatformResult<Option<String>> {
        let payload = json!({ "submolt": submolt, "title": title, "content": content });
        let data = self.post("/posts", Some(payload)).await?;
        let post = data.get("post").filter(|p| p.is_object()).unwrap_or(&data);
        Ok(str_field(post, &["id"]).or_else(|| str_field(&data, &["id"])))
    }

    async fn upvote_post(&self, id: &str) -> PlatformResult<()> {
        self.post(&format!("/posts/{}/upvote", id), None).await?;
        Ok(())
    }

    async fn dm_check(&self) -> PlatformResult<DmCheck> {
        let data = self.get("/agents/dm/check", &[]).await?;
        Ok(parse_dm_check(&data))
    }

    async fn dm_conversations(&self) -> PlatformResult<Vec<ConversationSummary>> {
        let data = self.get("/agents/dm/conversations", &[]).await?;
        Ok(parse_conversations(&data))
    }

    async fn dm_get_conversation(&self, conversation_id: &str) -> PlatformResult<Vec<DmMessage>> {
        let data = self
            .get(&format!("/agents/dm/conversations/{}", conversation_id), &[])
            .await?;
        Ok(parse_dm_messages(&data))
    }

    async fn dm_send(&self, conversation_id: &str, message: &str) -> PlatformResult<()> {
        self.post(
            &format!("/agents/dm/conversations/{}/send", conversation_id),
            Some(json!({ "message": message })),
        )
        .await?;
        Ok(())
    }
}

/// Map a non-2xx response to a typed error
fn error_from_response(status: u16, data: &Value, raw: &str) -> PlatformError {
    let message = str_field(data, &["error", "message"]).unwrap_or_else(|| raw.trim().to_string());
    let hint = str_field(data, &["hint"]);

    if status == 429 {
        let retry_after_secs = data
            .get("retry_after_seconds")
            .and_then(Value::as_u64)
            .or_else(|| {
                data.get("retry_after_minutes")
                    .and_then(Value::as_u64)
                    .map(|m| m * 60)
            });
        let message = match (&hint, retry_after_secs) {
            (Some(h), _) => format!("{} ({})", message, h),
            (None, Some(s)) => format!("{} (retry after {}s)", message, s),
            (None, None) => message,
        };
        return PlatformError::RateLimited {
            message,
            retry_after_secs,
        };
    }

    PlatformError::Api { status, message, hint }
}

/// `{"success": true, "data": {...}}` -> `{...}`
fn unwrap_envelope(data: Value) -> Value {
    if data.get("success").and_then(Value::as_bool) == Some(true) {
        if let Some(inner) = data.get("data") {
            return inner.clone();
        }
    }
    data
}

/// First non-empty string among `keys`
fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .find(|s| !s.is_empty())
}

/// First array among `keys`
fn array_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().filter_map(|k| value.get(*k)).find_map(Value::as_array)
}

fn author_name(value: &Value) -> Option<String> {
    ["author", "user"]
        .iter()
        .filter_map(|k| value.get(*k))
        .find(|v| v.is_object())
        .and_then(|a| str_field(a, &["name", "username", "display_name"]))
}

pub(crate) fn parse_post(value: &Value) -> Option<Post> {
    let id = str_field(value, &["id"])?;
    let submolt = match value.get("submolt") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(obj) if obj.is_object() => str_field(obj, &["name"]),
        _ => None,
    };
    Some(Post {
        id,
        title: str_field(value, &["title"]).unwrap_or_default(),
        content: str_field(value, &["content"]).unwrap_or_default(),
        submolt,
        author_name: author_name(value),
    })
}

pub(crate) fn parse_post_list(data: &Value) -> Vec<Post> {
    let list = data
        .as_array()
        .or_else(|| array_field(data, &["posts", "items"]));
    list.map(|items| items.iter().filter_map(parse_post).collect())
        .unwrap_or_default()
}

pub(crate) fn parse_profile(data: &Value) -> Profile {
    let agent = data.get("agent").filter(|a| a.is_object()).unwrap_or(data);
    let mut recent_posts: Vec<Post> = Vec::new();
    for source in [data, agent] {
        if let Some(items) = array_field(source, &["recentPosts", "recent_posts"]) {
            for post in items.iter().filter_map(parse_post) {
                if !recent_posts.iter().any(|p| p.id == post.id) {
                    recent_posts.push(post);
                }
            }
        }
    }
    Profile {
        name: str_field(agent, &["name"]),
        recent_posts,
    }
}

pub(crate) fn parse_comments(data: &Value) -> Vec<Comment> {
    let keys = ["comments", "items", "data"];
    let raw = keys.iter().filter_map(|k| data.get(*k)).next();
    let list = match raw {
        Some(Value::Array(items)) => Some(items),
        Some(nested) if nested.is_object() => array_field(nested, &["items", "comments", "data"]),
        _ => data.as_array(),
    };

    list.map(|items| {
        items
            .iter()
            .filter_map(|c| {
                let id = str_field(c, &["id", "comment_id"])?;
                Some(Comment {
                    id,
                    author_name: author_name(c).unwrap_or_default(),
                    body: str_field(c, &["content", "body", "text", "message"]).unwrap_or_default(),
                    created_at: str_field(c, &["created_at", "timestamp"]),
                })
            })
            .collect()
    })
    .unwrap_or_default()
}

pub(crate) fn parse_dm_check(data: &Value) -> DmCheck {
    let requests = data
        .get("requests")
        .and_then(|r| array_field(r, &["items"]))
        .map(|items| {
            items
                .iter()
                .map(|item| DmRequest {
                    from: item
                        .get("from")
                        .and_then(|f| str_field(f, &["name"]))
                        .unwrap_or_else(|| "?".to_string()),
                    preview: str_field(item, &["message_preview"]).unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    DmCheck {
        has_activity: data.get("has_activity").and_then(Value::as_bool).unwrap_or(false),
        summary: str_field(data, &["summary"]).unwrap_or_default(),
        requests,
    }
}

pub(crate) fn parse_conversations(data: &Value) -> Vec<ConversationSummary> {
    data.get("conversations")
        .and_then(|c| c.as_array().or_else(|| array_field(c, &["items"])))
        .map(|items| {
            items
                .iter()
                .filter_map(|c| {
                    Some(ConversationSummary {
                        id: str_field(c, &["conversation_id", "id"])?,
                        unread_count: c.get("unread_count").and_then(Value::as_u64).unwrap_or(0),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn parse_dm_messages(data: &Value) -> Vec<DmMessage> {
    array_field(data, &["messages"])
        .map(|items| {
            items
                .iter()
                .map(|m| DmMessage {
                    from_me: m.get("from_me").and_then(Value::as_bool).unwrap_or(false),
                    author: m.get("author").and_then(|a| str_field(a, &["name"])),
                    content: str_field(m, &["content"]).unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_success_envelope() {
        let data = json!({"success": true, "data": {"id": "p1"}});
        assert_eq!(unwrap_envelope(data), json!({"id": "p1"}));

        let plain = json!({"posts": []});
        assert_eq!(unwrap_envelope(plain.clone()), plain);
    }

    #[test]
    fn test_rate_limit_error_mapping() {
        let err = error_from_response(429, &json!({"error": "Too many", "retry_after_minutes": 3}), "");
        match err {
            PlatformError::RateLimited { retry_after_secs, message } => {
                assert_eq!(retry_after_secs, Some(180));
                assert!(message.contains("Too many"));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }

        let err = error_from_response(500, &Value::Null, "upstream exploded");
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn test_parse_post_list_shapes() {
        let data = json!({"items": [
            {"id": "a", "title": "T", "author": {"username": "bob"}, "submolt": {"name": "general"}},
            {"title": "no id"},
            {"id": 42, "content": "numeric id", "submolt": "agents"}
        ]});
        let posts = parse_post_list(&data);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].author_name.as_deref(), Some("bob"));
        assert_eq!(posts[0].submolt.as_deref(), Some("general"));
        assert_eq!(posts[1].id, "42");
        assert_eq!(posts[1].submolt.as_deref(), Some("agents"));
    }

    #[test]
    fn test_parse_profile_merges_recent_posts() {
        let data = json!({
            "agent": {"name": "AIGarth", "recent_posts": [{"id": "p1"}, {"id": "p2"}]},
            "recentPosts": [{"id": "p1"}]
        });
        let profile = parse_profile(&data);
        assert_eq!(profile.name.as_deref(), Some("AIGarth"));
        let ids: Vec<_> = profile.recent_posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn test_parse_comments_nested() {
        let data = json!({"comments": {"items": [
            {"comment_id": "c1", "user": {"display_name": "eve"}, "body": "hi"},
            {"id": "c2", "author": {"name": "AIGarth"}, "content": "ours"}
        ]}});
        let comments = parse_comments(&data);
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, "c1");
        assert_eq!(comments[0].author_name, "eve");
        assert_eq!(comments[0].body, "hi");
        assert_eq!(comments[1].author_name, "AIGarth");
    }

    #[test]
    fn test_parse_dm_shapes() {
        let check = parse_dm_check(&json!({
            "has_activity": true,
            "summary": "1 unread",
            "requests": {"count": 1, "items": [{"from": {"name": "Clawd"}, "message_preview": "hey"}]}
        }));
        assert!(check.has_activity);
        assert_eq!(check.requests.len(), 1);
        assert_eq!(check.requests[0].from, "Clawd");

        let convs = parse_conversations(&json!({"conversations": {"items": [
            {"conversation_id": "c1", "unread_count": 2},
            {"unread_count": 1}
        ]}}));
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].unread_count, 2);

        let messages = parse_dm_messages(&json!({"messages": [
            {"from_me": false, "author": {"name": "Clawd"}, "content": "hello"},
            {"from_me": true, "content": "hi"}
        ]}));
        assert_eq!(messages.len(), 2);
        assert!(!messages[0].from_me);
        assert_eq!(messages[0].author.as_deref(), Some("Clawd"));
    }
}
