//! Keyword-count classifier used whenever the remote classifier can't answer.
//!
//! Deliberately coarse: the word lists are short and matching is plain
//! substring containment ("nice" matches inside "niceties", "true" inside
//! "untrue"), so expect a fair number of wrong calls. It only has to keep
//! results available while the remote classifier is down or rate-limited.

use super::sentiment::Sentiment;

const POSITIVE: &[&str] = &[
    "good", "great", "love", "awesome", "excellent", "amazing", "best", "helpful", "agree",
    "thank", "nice", "true", "correct",
];

const NEGATIVE: &[&str] = &[
    "bad", "terrible", "hate", "awful", "worst", "wrong", "disagree", "false", "stupid", "fake",
    "misleading", "nonsense", "dislike",
];

pub fn classify(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    let positive = count_hits(&text, POSITIVE);
    let negative = count_hits(&text, NEGATIVE);

    if positive > negative {
        Sentiment::Agree
    } else if negative > positive {
        Sentiment::Disagree
    } else {
        Sentiment::Neutral
    }
}

fn count_hits(text: &str, terms: &[&str]) -> usize {
    terms.iter().map(|term| text.matches(term).count()).sum()
}
