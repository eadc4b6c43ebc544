use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::youtube::{mask_username, Comment};
use super::sentiment::{Sentiment, Source};

/// A comment together with its one-time sentiment decision. This is also the
/// record shape kept in the dedup store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedComment {
    pub comment_id: String,
    pub video_id: String,
    /// Masked before it ever reaches storage.
    pub author: String,
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub sentiment: Sentiment,
    pub source: Source,
    pub analyzed_at: DateTime<Utc>,
}

impl ClassifiedComment {
    pub fn new(comment: &Comment, sentiment: Sentiment, source: Source) -> Self {
        Self {
            comment_id: comment.id.clone(),
            video_id: comment.video_id.clone(),
            author: mask_username(&comment.author),
            text: comment.text.clone(),
            published_at: comment.published_at,
            sentiment,
            source,
            analyzed_at: Utc::now(),
        }
    }
}
