use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::storage::DedupStore;
use crate::youtube::{extract_video_id, Comment, CommentSource, FetchError};
use super::aggregate::{aggregate, AnalysisResult};
use super::scheduler::BatchScheduler;
use super::sentiment::Source;
use super::types::ClassifiedComment;

/// Failures a caller of [`Analyzer::analyze`] can see. Classifier trouble is
/// never one of them: it degrades to the keyword fallback instead.
#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    #[error("cannot derive a video id from {0:?}")]
    InvalidInput(String),
    #[error("no comments found for video {0}")]
    NotFound(String),
    #[error("comment source failed")]
    Upstream(#[source] FetchError),
    /// Would need both the remote classifier and the fallback to fail. The
    /// fallback cannot fail, so nothing produces this today.
    #[allow(dead_code)]
    #[error("sentiment classification unavailable")]
    ClassificationUnavailable,
}

/// Process-wide pipeline: built once at startup and shared by every request.
pub struct Analyzer {
    source: Arc<dyn CommentSource>,
    store: Arc<dyn DedupStore>,
    scheduler: BatchScheduler,
    max_results: u32,
}

impl Analyzer {
    pub fn new(
        source: Arc<dyn CommentSource>,
        store: Arc<dyn DedupStore>,
        scheduler: BatchScheduler,
        max_results: u32,
    ) -> Self {
        Self {
            source,
            store,
            scheduler,
            max_results,
        }
    }

    pub async fn analyze(&self, reference: &str) -> Result<AnalysisResult, AnalyzeError> {
        let video_id = extract_video_id(reference)
            .ok_or_else(|| AnalyzeError::InvalidInput(reference.to_string()))?;

        let comments = match self.source.fetch(&video_id, self.max_results).await {
            Ok(comments) => comments,
            Err(FetchError::NotFound) => return Err(AnalyzeError::NotFound(video_id)),
            Err(e) => return Err(AnalyzeError::Upstream(e)),
        };
        if comments.is_empty() {
            return Err(AnalyzeError::NotFound(video_id));
        }

        let classified = self.classify_comments(&comments).await;
        let result = aggregate(classified.iter().map(|c| (c.sentiment, c.published_at)));

        info!(
            "Analyzed {}: {} comments, agree {}%, disagree {}%, neutral {}%",
            video_id,
            result.total_comments,
            result.sentiment_analysis.agree,
            result.sentiment_analysis.disagree,
            result.sentiment_analysis.neutral,
        );

        Ok(result)
    }

    /// Resolves a sentiment for every comment, in input order. Known ids come
    /// from the store; the rest go through the scheduler once per id and are
    /// saved back. A failed save only costs a re-classification next time.
    pub async fn classify_comments(&self, comments: &[Comment]) -> Vec<ClassifiedComment> {
        let mut known: HashMap<&str, ClassifiedComment> = HashMap::new();
        let mut queued: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&Comment> = Vec::new();

        for comment in comments {
            let id = comment.id.as_str();
            if known.contains_key(id) || queued.contains(id) {
                continue;
            }
            match self.store.lookup(id).await {
                Ok(Some(record)) => {
                    let cached = ClassifiedComment {
                        analyzed_at: record.analyzed_at,
                        ..ClassifiedComment::new(comment, record.sentiment, Source::Cached)
                    };
                    known.insert(id, cached);
                }
                Ok(None) => {
                    queued.insert(id);
                    pending.push(comment);
                }
                Err(e) => {
                    warn!("Dedup lookup failed for {}, classifying again: {:#}", id, e);
                    queued.insert(id);
                    pending.push(comment);
                }
            }
        }

        let cache_hits = known.len();
        let texts: Vec<&str> = pending.iter().map(|c| c.text.as_str()).collect();
        let (decisions, report) = self.scheduler.run(&texts).await;

        for (comment, (sentiment, source)) in pending.into_iter().zip(decisions) {
            let record = ClassifiedComment::new(comment, sentiment, source);
            if let Err(e) = self.store.save(&record).await {
                error!("Failed to store sentiment for comment {}: {:#}", comment.id, e);
            }
            known.insert(comment.id.as_str(), record);
        }

        info!(
            "Resolved {} unique comments: {} cached, {} remote, {} fallback",
            known.len(),
            cache_hits,
            report.remote,
            report.fallback
        );

        comments
            .iter()
            .filter_map(|c| known.get(c.id.as_str()).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::scheduler::tests::ScriptedClassifier;
    use crate::analysis::Sentiment;
    use crate::config::SchedulerConfig;
    use crate::storage::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use reqwest::StatusCode;

    const VIDEO: &str = "dQw4w9WgXcQ";

    enum Page {
        Comments(Vec<Comment>),
        Missing,
        Broken,
    }

    struct StaticSource(Page);

    #[async_trait]
    impl CommentSource for StaticSource {
        async fn fetch(&self, _video_id: &str, _max_results: u32) -> Result<Vec<Comment>, FetchError> {
            match &self.0 {
                Page::Comments(comments) => Ok(comments.clone()),
                Page::Missing => Err(FetchError::NotFound),
                Page::Broken => Err(FetchError::Status {
                    status: StatusCode::FORBIDDEN,
                    body: "commentsDisabled".into(),
                }),
            }
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl DedupStore for BrokenStore {
        async fn lookup(&self, _comment_id: &str) -> Result<Option<ClassifiedComment>, StoreError> {
            Ok(None)
        }

        async fn save(&self, _comment: &ClassifiedComment) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    fn comment(id: &str, text: &str, month: u32) -> Comment {
        Comment {
            id: id.to_string(),
            video_id: VIDEO.to_string(),
            author: format!("@author-{}", id),
            text: text.to_string(),
            published_at: Utc.with_ymd_and_hms(2024, month, 3, 9, 30, 0).unwrap(),
        }
    }

    fn sample() -> Vec<Comment> {
        vec![
            comment("a", "first", 1),
            comment("b", "second", 1),
            comment("c", "third", 4),
            comment("d", "fourth", 12),
        ]
    }

    fn analyzer(
        page: Page,
        store: Arc<dyn DedupStore>,
        remote: Arc<ScriptedClassifier>,
    ) -> Analyzer {
        let scheduler = BatchScheduler::new(remote, SchedulerConfig::default());
        Analyzer::new(Arc::new(StaticSource(page)), store, scheduler, 100)
    }

    #[tokio::test]
    async fn second_run_is_served_from_the_store() {
        let store: Arc<dyn DedupStore> = Arc::new(MemoryStore::new());
        let remote = Arc::new(ScriptedClassifier::answering(Sentiment::Agree));
        let analyzer = analyzer(Page::Comments(sample()), store, remote.clone());

        let first = analyzer.analyze(VIDEO).await.unwrap();
        assert_eq!(remote.call_count(), 4);

        let second = analyzer
            .analyze("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(remote.call_count(), 4);

        assert_eq!(second.total_comments, 4);
        assert_eq!(second.sentiment_analysis.agree, 100.0);
        assert_eq!(second.distribution.get("Jan"), Some(2));
        assert_eq!(second.distribution.get("Apr"), Some(1));
        assert_eq!(second.distribution.get("Dec"), Some(1));
        assert_eq!(second.distribution.total(), 4);
    }

    #[tokio::test]
    async fn keeps_input_order_across_cached_and_fresh() {
        let store = Arc::new(MemoryStore::new());
        let comments = sample();
        store
            .save(&ClassifiedComment::new(&comments[2], Sentiment::Disagree, Source::Remote))
            .await
            .unwrap();

        let remote = Arc::new(ScriptedClassifier::answering(Sentiment::Neutral));
        let analyzer = analyzer(Page::Comments(vec![]), store, remote.clone());
        let classified = analyzer.classify_comments(&comments).await;

        let ids: Vec<&str> = classified.iter().map(|c| c.comment_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(classified[2].source, Source::Cached);
        assert_eq!(classified[2].sentiment, Sentiment::Disagree);
        assert_eq!(classified[0].source, Source::Remote);
        assert_eq!(remote.call_count(), 3);
    }

    #[tokio::test]
    async fn repeated_ids_are_classified_once() {
        let store: Arc<dyn DedupStore> = Arc::new(MemoryStore::new());
        let remote = Arc::new(ScriptedClassifier::answering(Sentiment::Agree));
        let comments = vec![comment("a", "x", 1), comment("a", "x", 1), comment("b", "y", 2)];
        let analyzer = analyzer(Page::Comments(comments.clone()), store, remote.clone());

        let classified = analyzer.classify_comments(&comments).await;
        assert_eq!(classified.len(), 3);
        assert_eq!(remote.call_count(), 2);
    }

    #[tokio::test]
    async fn store_failures_do_not_fail_the_analysis() {
        let remote = Arc::new(ScriptedClassifier::answering(Sentiment::Disagree));
        let analyzer = analyzer(Page::Comments(sample()), Arc::new(BrokenStore), remote.clone());

        let result = analyzer.analyze(VIDEO).await.unwrap();
        assert_eq!(result.sentiment_analysis.disagree, 100.0);

        // nothing was persisted, so the next run classifies again
        analyzer.analyze(VIDEO).await.unwrap();
        assert_eq!(remote.call_count(), 8);
    }

    #[tokio::test]
    async fn persisted_authors_are_masked() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(ScriptedClassifier::answering(Sentiment::Agree));
        let analyzer = analyzer(Page::Comments(sample()), store.clone(), remote);

        analyzer.analyze(VIDEO).await.unwrap();
        let saved = store.lookup("a").await.unwrap().unwrap();
        assert_eq!(saved.author, "@a*******");
        assert_eq!(saved.source, Source::Remote);
    }

    #[tokio::test]
    async fn rejects_bad_references() {
        let remote = Arc::new(ScriptedClassifier::answering(Sentiment::Agree));
        let analyzer = analyzer(Page::Comments(sample()), Arc::new(MemoryStore::new()), remote);

        let err = analyzer.analyze("https://example.com/nope").await.unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn empty_or_missing_videos_are_not_found() {
        for page in [Page::Comments(vec![]), Page::Missing] {
            let remote = Arc::new(ScriptedClassifier::answering(Sentiment::Agree));
            let analyzer = analyzer(page, Arc::new(MemoryStore::new()), remote.clone());
            let err = analyzer.analyze(VIDEO).await.unwrap_err();
            assert!(matches!(err, AnalyzeError::NotFound(ref id) if id == VIDEO));
            assert_eq!(remote.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn other_source_failures_are_upstream_errors() {
        let remote = Arc::new(ScriptedClassifier::answering(Sentiment::Agree));
        let analyzer = analyzer(Page::Broken, Arc::new(MemoryStore::new()), remote);
        let err = analyzer.analyze(VIDEO).await.unwrap_err();
        assert!(matches!(err, AnalyzeError::Upstream(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn classifier_outage_still_yields_a_result() {
        let mut remote = ScriptedClassifier::answering(Sentiment::Neutral);
        remote.hard_failure = true;
        let comments = vec![
            comment("a", "I love this, it's great", 2),
            comment("b", "this is terrible and awful", 2),
            comment("c", "the video is 10 minutes long", 3),
            comment("d", "great great", 3),
        ];
        let analyzer = analyzer(Page::Comments(comments), Arc::new(MemoryStore::new()), Arc::new(remote));

        let result = analyzer.analyze(VIDEO).await.unwrap();
        assert_eq!(result.sentiment_analysis.agree, 50.0);
        assert_eq!(result.sentiment_analysis.disagree, 25.0);
        assert_eq!(result.sentiment_analysis.neutral, 25.0);
    }
}
