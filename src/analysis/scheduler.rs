use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{SchedulerConfig, Strategy};
use super::fallback;
use super::gemini::{ClassifyError, RemoteClassifier};
use super::sentiment::{Sentiment, Source};

/// What happened during one scheduler run, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub batch_sizes: Vec<usize>,
    pub inter_batch_delays: usize,
    pub remote: usize,
    pub fallback: usize,
}

/// Drives the remote classifier over a list of texts in fixed-size batches,
/// sequentially, with a pause between batches and exponential backoff on rate
/// limits. Every text always ends up with a sentiment: anything the remote
/// side can't answer is handed to the keyword fallback.
pub struct BatchScheduler {
    classifier: Arc<dyn RemoteClassifier>,
    config: SchedulerConfig,
}

impl BatchScheduler {
    pub fn new(classifier: Arc<dyn RemoteClassifier>, config: SchedulerConfig) -> Self {
        Self { classifier, config }
    }

    /// Returns one decision per input text, in input order.
    pub async fn run(&self, texts: &[&str]) -> (Vec<(Sentiment, Source)>, RunReport) {
        let mut report = RunReport::default();
        let mut decisions = Vec::with_capacity(texts.len());
        let batch_size = self.config.batch_size.max(1);
        let batch_count = texts.len().div_ceil(batch_size);

        for (n, batch) in texts.chunks(batch_size).enumerate() {
            if n > 0 {
                debug!("Waiting {}ms before batch {}/{}", self.config.batch_delay_ms, n + 1, batch_count);
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
                report.inter_batch_delays += 1;
            }

            info!("Classifying batch {}/{} ({} comments)", n + 1, batch_count, batch.len());
            report.batch_sizes.push(batch.len());

            let results = match self.config.strategy {
                Strategy::PerComment => self.run_per_comment(batch).await,
                Strategy::Batched => self.run_batched(batch).await,
            };

            for (sentiment, source) in results {
                match source {
                    Source::Fallback => report.fallback += 1,
                    _ => report.remote += 1,
                }
                decisions.push((sentiment, source));
            }
        }

        debug!(
            "Scheduler finished: {} batches, {} pauses, {} fallbacks",
            report.batch_sizes.len(),
            report.inter_batch_delays,
            report.fallback
        );
        (decisions, report)
    }

    async fn run_per_comment(&self, batch: &[&str]) -> Vec<(Sentiment, Source)> {
        // join_all keeps input order regardless of completion order
        join_all(batch.iter().map(|text| async move {
            match self.with_retry(|| self.classifier.classify(text)).await {
                Ok(sentiment) => (sentiment, Source::Remote),
                Err(e) => {
                    let sentiment = fallback::classify(text);
                    warn!("Falling back to {} for one comment: {:#}", sentiment, e);
                    (sentiment, Source::Fallback)
                }
            }
        }))
        .await
    }

    async fn run_batched(&self, batch: &[&str]) -> Vec<(Sentiment, Source)> {
        match self.with_retry(|| self.classifier.classify_batch(batch)).await {
            Ok(labels) => batch
                .iter()
                .enumerate()
                .map(|(i, text)| match labels.get(&(i + 1)) {
                    Some(sentiment) => (*sentiment, Source::Remote),
                    None => (fallback::classify(text), Source::Fallback),
                })
                .collect(),
            Err(e) => {
                warn!("Falling back for a batch of {} comments: {:#}", batch.len(), e);
                batch
                    .iter()
                    .map(|text| (fallback::classify(text), Source::Fallback))
                    .collect()
            }
        }
    }

    async fn with_retry<T, F, Fut>(&self, mut call: F) -> Result<T, ClassifyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClassifyError>>,
    {
        let mut delay = Duration::from_millis(self.config.initial_backoff_ms);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    warn!(
                        "Classifier rate limited (attempt {}/{}), retrying in {:?}",
                        attempt, self.config.max_attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
