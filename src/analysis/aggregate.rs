use chrono::{DateTime, Datelike, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::sentiment::Sentiment;

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentTotals {
    pub agree: usize,
    pub disagree: usize,
    pub neutral: usize,
}

impl SentimentTotals {
    pub fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Agree => self.agree += 1,
            Sentiment::Disagree => self.disagree += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.agree + self.disagree + self.neutral
    }

    /// `None` when there is nothing to divide by.
    pub fn percentages(&self) -> Option<SentimentPercentages> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let pct = |count: usize| (count as f64 / total as f64 * 1000.0).round() / 10.0;
        Some(SentimentPercentages {
            agree: pct(self.agree),
            disagree: pct(self.disagree),
            neutral: pct(self.neutral),
        })
    }
}

/// Shares of each sentiment, in percent, rounded to one decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SentimentPercentages {
    pub agree: f64,
    pub disagree: f64,
    pub neutral: f64,
}

/// Comment counts per calendar month. The year is ignored on purpose, so a
/// video with comments spanning several years folds them into the same twelve
/// buckets. Always serializes all twelve months, Jan through Dec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyDistribution([usize; 12]);

impl MonthlyDistribution {
    pub fn add(&mut self, at: DateTime<Utc>) {
        self.0[at.month0() as usize] += 1;
    }

    pub fn get(&self, month: &str) -> Option<usize> {
        MONTHS.iter().position(|m| *m == month).map(|i| self.0[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        MONTHS.iter().copied().zip(self.0.iter().copied())
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

impl Serialize for MonthlyDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(MONTHS.len()))?;
        for (month, count) in self.iter() {
            map.serialize_entry(month, &count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment_analysis: SentimentPercentages,
    pub total_comments: usize,
    pub distribution: MonthlyDistribution,
}

impl AnalysisResult {
    /// The defined result for an empty comment set: zero everywhere.
    pub fn no_comments() -> Self {
        Self {
            sentiment_analysis: SentimentPercentages::default(),
            total_comments: 0,
            distribution: MonthlyDistribution::default(),
        }
    }
}

/// Folds resolved sentiments and their publish times into the summary.
pub fn aggregate<I>(items: I) -> AnalysisResult
where
    I: IntoIterator<Item = (Sentiment, DateTime<Utc>)>,
{
    let mut totals = SentimentTotals::default();
    let mut distribution = MonthlyDistribution::default();

    for (sentiment, published_at) in items {
        totals.add(sentiment);
        distribution.add(published_at);
    }
    debug_assert_eq!(distribution.total(), totals.total());

    match totals.percentages() {
        Some(sentiment_analysis) => AnalysisResult {
            sentiment_analysis,
            total_comments: totals.total(),
            distribution,
        },
        None => AnalysisResult::no_comments(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn thirds_round_to_one_decimal() {
        let result = aggregate(vec![
            (Sentiment::Agree, at(2024, 1)),
            (Sentiment::Disagree, at(2024, 1)),
            (Sentiment::Neutral, at(2024, 2)),
        ]);
        let p = result.sentiment_analysis;
        assert_eq!((p.agree, p.disagree, p.neutral), (33.3, 33.3, 33.3));
        assert!((p.agree + p.disagree + p.neutral - 100.0).abs() <= 0.1 + 1e-9);
        assert_eq!(result.total_comments, 3);
    }

    #[test]
    fn percentages_stay_near_hundred() {
        for n in 1..60usize {
            let items = (0..n).map(|i| {
                let s = match i % 7 {
                    0 | 3 => Sentiment::Agree,
                    1 => Sentiment::Disagree,
                    _ => Sentiment::Neutral,
                };
                (s, at(2024, 1 + (i % 12) as u32))
            });
            let p = aggregate(items).sentiment_analysis;
            let sum = p.agree + p.disagree + p.neutral;
            assert!((sum - 100.0).abs() <= 0.1 + 1e-9, "n={} sum={}", n, sum);
        }
    }

    #[test]
    fn months_merge_across_years() {
        let result = aggregate(vec![
            (Sentiment::Agree, at(2022, 3)),
            (Sentiment::Agree, at(2024, 3)),
            (Sentiment::Neutral, at(2024, 12)),
        ]);
        assert_eq!(result.distribution.get("Mar"), Some(2));
        assert_eq!(result.distribution.get("Dec"), Some(1));
        assert_eq!(result.distribution.get("Jan"), Some(0));
        assert_eq!(result.distribution.total(), result.total_comments);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let result = aggregate(Vec::<(Sentiment, DateTime<Utc>)>::new());
        assert_eq!(result, AnalysisResult::no_comments());
        assert_eq!(result.distribution.iter().count(), 12);
    }

    #[test]
    fn serializes_response_shape() {
        let result = aggregate(vec![(Sentiment::Agree, at(2024, 5))]);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["totalComments"], 1);
        assert_eq!(json["sentimentAnalysis"]["agree"], 100.0);
        assert_eq!(json["sentimentAnalysis"]["neutral"], 0.0);
        assert_eq!(json["distribution"]["May"], 1);

        let text = serde_json::to_string(&result.distribution).unwrap();
        assert!(text.starts_with(r#"{"Jan":0,"Feb":0,"Mar":0"#));
        assert!(text.ends_with(r#""Dec":0}"#));
    }
}
