use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::GeminiConfig;
use super::sentiment::Sentiment;

/// Failure of a single remote classification call. Only `RateLimited` is
/// worth retrying; everything else goes straight to the fallback.
#[derive(thiserror::Error, Debug)]
pub enum ClassifyError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("classifier request failed: {0}")]
    Failed(String),
    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

impl ClassifyError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClassifyError::RateLimited(_))
    }
}

/// External text classifier. Implementations never retry on their own.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    /// Classifies one comment.
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError>;

    /// Classifies several comments with one prompt. The returned map is keyed
    /// by the 1-based position of each text in `texts`.
    async fn classify_batch(&self, texts: &[&str]) -> Result<HashMap<usize, Sentiment>, ClassifyError>;
}

pub struct GeminiClassifier {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

const API_KEY_HEADER: &str = "x-goog-api-key";

const SINGLE_PROMPT: &str = r#"You judge how a viewer's comment relates to the video it was posted under.

Answer with exactly one word:
- AGREE if the commenter supports, praises or agrees with the video's content
- DISAGREE if the commenter disputes, criticizes or rejects the video's content
- NEUTRAL if the comment is off-topic, a question, a joke, or shows no stance"#;

const BATCH_PROMPT: &str = r#"You judge how viewers' comments relate to the video they were posted under.

For each numbered comment decide:
- AGREE if the commenter supports, praises or agrees with the video's content
- DISAGREE if the commenter disputes, criticizes or rejects the video's content
- NEUTRAL if the comment is off-topic, a question, a joke, or shows no stance

Respond ONLY with a JSON object mapping every comment number to its label, for example:
{"1": "AGREE", "2": "NEUTRAL", "3": "DISAGREE"}"#;

pub fn single_prompt(text: &str) -> String {
    format!("{}\n\nComment:\n\"{}\"", SINGLE_PROMPT, text)
}

pub fn batch_prompt(texts: &[&str]) -> String {
    let mut prompt = format!("{}\n\nComments:\n", BATCH_PROMPT);
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&format!("{}. \"{}\"\n", i + 1, text));
    }
    prompt
}

/// Finds a label anywhere in a free-text answer, case-insensitively.
///
/// Labels are checked in the order AGREE, DISAGREE, NEUTRAL. Since "DISAGREE"
/// contains "AGREE", any answer mentioning either resolves to `Agree`.
pub fn parse_label(answer: &str) -> Result<Sentiment, ClassifyError> {
    let answer_upper = answer.to_uppercase();
    [Sentiment::Agree, Sentiment::Disagree, Sentiment::Neutral]
        .into_iter()
        .find(|s| answer_upper.contains(s.label()))
        .ok_or_else(|| ClassifyError::Malformed(format!("no label in {:?}", answer)))
}

/// Parses the `{"1": "AGREE", ...}` answer of a batched prompt. Any
/// unparseable key, unknown label, or missing index fails the whole batch.
pub fn parse_batch_labels(answer: &str, expected: usize) -> Result<HashMap<usize, Sentiment>, ClassifyError> {
    let body = strip_code_fence(answer);
    let raw: HashMap<String, String> = serde_json::from_str(body)
        .map_err(|e| ClassifyError::Malformed(format!("batch answer is not a label map: {}", e)))?;

    let mut labels = HashMap::with_capacity(raw.len());
    for (key, label) in raw {
        let index: usize = key
            .trim()
            .parse()
            .map_err(|_| ClassifyError::Malformed(format!("bad comment index {:?}", key)))?;
        let sentiment = Sentiment::from_label(&label)
            .ok_or_else(|| ClassifyError::Malformed(format!("unknown label {:?} for #{}", label, index)))?;
        labels.insert(index, sentiment);
    }

    if let Some(missing) = (1..=expected).find(|i| !labels.contains_key(i)) {
        return Err(ClassifyError::Malformed(format!("no label for comment #{}", missing)));
    }

    Ok(labels)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn status_error(status: StatusCode, body: String) -> ClassifyError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        ClassifyError::RateLimited(body)
    } else {
        ClassifyError::Failed(format!("Gemini API returned {}: {}", status, body))
    }
}

impl GeminiClassifier {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }

    async fn generate(&self, prompt: String, json_output: bool) -> Result<String, ClassifyError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: json_output.then(|| "application/json".to_string()),
            },
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifyError::Failed(format!("Gemini API request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let gemini_resp: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::Malformed(format!("Failed to parse Gemini response: {}", e.without_url())))?;

        gemini_resp
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.as_ref())
            .and_then(|p| p.first())
            .and_then(|p| p.text.clone())
            .ok_or_else(|| ClassifyError::Malformed("Empty Gemini response".to_string()))
    }
}

#[async_trait]
impl RemoteClassifier for GeminiClassifier {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        let answer = self.generate(single_prompt(text), false).await?;
        debug!("Gemini answered {:?}", answer);
        parse_label(&answer)
    }

    async fn classify_batch(&self, texts: &[&str]) -> Result<HashMap<usize, Sentiment>, ClassifyError> {
        let answer = self.generate(batch_prompt(texts), true).await?;
        parse_batch_labels(&answer, texts.len())
    }
}
