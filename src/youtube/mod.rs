pub mod client;
pub mod types;

pub use client::{extract_video_id, CommentSource, FetchError, YouTubeClient};
pub use types::{mask_username, Comment};
