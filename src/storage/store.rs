use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::analysis::ClassifiedComment;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store I/O failed")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record")]
    Encode(#[from] serde_json::Error),
}

/// Record of comments that already have a sentiment, keyed by comment id.
///
/// `lookup` and `save` are independent calls. Two runs that both miss the same
/// id will both save it; with the same classifier that yields the same label,
/// so no locking across the pair is attempted.
#[async_trait]
pub trait DedupStore: Send + Sync {
    async fn lookup(&self, comment_id: &str) -> Result<Option<ClassifiedComment>, StoreError>;
    async fn save(&self, comment: &ClassifiedComment) -> Result<(), StoreError>;
}

/// Keeps records for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ClassifiedComment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn lookup(&self, comment_id: &str) -> Result<Option<ClassifiedComment>, StoreError> {
        Ok(self.records.read().await.get(comment_id).cloned())
    }

    async fn save(&self, comment: &ClassifiedComment) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(comment.comment_id.clone(), comment.clone());
        Ok(())
    }
}
