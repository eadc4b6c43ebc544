use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::analysis::ClassifiedComment;
use super::store::{DedupStore, StoreError};

const FILE_NAME: &str = "classified.jsonl";

/// Append-only JSON Lines file, indexed in memory. When an id appears on more
/// than one line the last one wins. A line torn by a failed append is skipped
/// on the next open; the record after it starts on a fresh line.
pub struct JsonlStore {
    path: PathBuf,
    state: Mutex<State>,
}

struct State {
    records: HashMap<String, ClassifiedComment>,
    /// False while the file may end without a newline.
    clean_tail: bool,
}

impl JsonlStore {
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .context("Failed to create data directory")?;

        let path = data_dir.join(FILE_NAME);
        let mut records = HashMap::new();
        let mut clean_tail = true;

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                clean_tail = text.is_empty() || text.ends_with('\n');
                for (n, line) in text.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ClassifiedComment>(line) {
                        Ok(record) => {
                            records.insert(record.comment_id.clone(), record);
                        }
                        Err(e) => warn!("Skipping unreadable line {} of {}: {}", n + 1, path.display(), e),
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("Failed to read dedup store"),
        }

        info!("Dedup store opened at {} ({} records)", path.display(), records.len());

        Ok(Self {
            path,
            state: Mutex::new(State { records, clean_tail }),
        })
    }
}

#[async_trait]
impl DedupStore for JsonlStore {
    async fn lookup(&self, comment_id: &str) -> Result<Option<ClassifiedComment>, StoreError> {
        Ok(self.state.lock().await.records.get(comment_id).cloned())
    }

    async fn save(&self, comment: &ClassifiedComment) -> Result<(), StoreError> {
        let json = serde_json::to_string(comment)?;

        // Held across the append so concurrent saves never interleave lines.
        let mut state = self.state.lock().await;

        let line = if state.clean_tail {
            format!("{}\n", json)
        } else {
            format!("\n{}\n", json)
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        state.clean_tail = false;
        file.write_all(line.as_bytes()).await?;
        state.clean_tail = true;

        state.records.insert(comment.comment_id.clone(), comment.clone());
        Ok(())
    }
}
