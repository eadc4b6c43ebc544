use serde::{Deserialize, Serialize};
use std::fmt;

/// Stance of a comment toward the video it was posted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Agree,
    Disagree,
    Neutral,
}

impl Sentiment {
    /// The upper-case label the remote classifier is asked to answer with.
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Agree => "AGREE",
            Sentiment::Disagree => "DISAGREE",
            Sentiment::Neutral => "NEUTRAL",
        }
    }

    /// Exact label match, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "AGREE" => Some(Sentiment::Agree),
            "DISAGREE" => Some(Sentiment::Disagree),
            "NEUTRAL" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a comment's sentiment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Remote,
    Fallback,
    /// Read back from the dedup store instead of being classified this run.
    Cached,
}
