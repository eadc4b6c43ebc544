use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::config::YouTubeConfig;
use super::types::Comment;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("video not found or has no comments")]
    NotFound,
    /// Carries the transport error with its URL stripped.
    #[error("comment request failed")]
    Request(#[source] reqwest::Error),
    #[error("comment source returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Anything that can hand back one page of top-level comments for a video.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn fetch(&self, video_id: &str, max_results: u32) -> Result<Vec<Comment>, FetchError>;
}

const API_KEY_HEADER: &str = "x-goog-api-key";

fn request_error(e: reqwest::Error) -> FetchError {
    FetchError::Request(e.without_url())
}

// Constant patterns; compiling them cannot fail at runtime once the
// extraction tests pass.
static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id pattern"));

static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/|/live/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)")
        .expect("video url pattern")
});

/// Derives the 11-character video id from a bare id or a watch/short/embed URL.
pub fn extract_video_id(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if VIDEO_ID.is_match(reference) {
        return Some(reference.to_string());
    }
    VIDEO_URL
        .captures(reference)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ThreadListResponse {
    #[serde(default)]
    items: Vec<Thread>,
}

#[derive(Deserialize)]
struct Thread {
    id: String,
    snippet: ThreadSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_original: Option<String>,
    #[serde(default)]
    text_display: String,
    #[serde(default)]
    author_display_name: String,
    published_at: DateTime<Utc>,
}

impl YouTubeClient {
    pub fn new(config: &YouTubeConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

#[async_trait]
impl CommentSource for YouTubeClient {
    async fn fetch(&self, video_id: &str, max_results: u32) -> Result<Vec<Comment>, FetchError> {
        let url = format!("{}/commentThreads", self.base_url);
        let max_results = max_results.to_string();

        debug!("Fetching up to {} comments for {}", max_results, video_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id),
                ("maxResults", max_results.as_str()),
                ("order", "relevance"),
                ("textFormat", "plainText"),
            ])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let page: ThreadListResponse = response.json().await.map_err(request_error)?;
        let comments: Vec<Comment> = page
            .items
            .into_iter()
            .map(|thread| {
                let snippet = thread.snippet.top_level_comment.snippet;
                Comment {
                    id: thread.id,
                    video_id: video_id.to_string(),
                    author: snippet.author_display_name,
                    text: snippet.text_original.unwrap_or(snippet.text_display),
                    published_at: snippet.published_at,
                }
            })
            .collect();

        info!("Fetched {} comments for {}", comments.len(), video_id);
        Ok(comments)
    }
}
