use chrono::{DateTime, Utc};

/// A top-level comment as fetched from the platform. Never mutated after fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub video_id: String,
    pub author: String,
    pub text: String,
    pub published_at: DateTime<Utc>,
}

/// Hides most of a display name before it is persisted.
pub fn mask_username(name: &str) -> String {
    let len = name.chars().count();
    let keep = if len <= 2 { 1 } else { 2 };
    name.chars()
        .enumerate()
        .map(|(i, c)| if i < keep { c } else { '*' })
        .collect()
}
