//! Market Sentiment
//!
//! Labels derived from social metrics. A source answers `None` when it has no
//! data for a coin; callers treat any failure as "no sentiment".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl SentimentLabel {
    /// Classify an average positive-sentiment score
    pub fn classify(average: f64) -> Self {
        if average > 0.75 {
            Self::VeryPositive
        } else if average > 0.5 {
            Self::Positive
        } else if average > 0.25 {
            Self::Neutral
        } else if average > 0.0 {
            Self::Negative
        } else {
            Self::VeryNegative
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::VeryPositive => "Very Positive 🟢",
            Self::Positive => "Positive ✅",
            Self::Neutral => "Neutral 🟡",
            Self::Negative => "Negative 🔴",
            Self::VeryNegative => "Very Negative ⚠️",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GreedFear {
    ExtremeGreed,
    Greed,
    Neutral,
    Fear,
    ExtremeFear,
}

/// Averaged social metrics over a window
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SocialMetrics {
    pub positive: f64,
    pub negative: f64,
    pub volume: f64,
}

impl GreedFear {
    /// Social volume amplifies whichever side dominates; one side at 1.5x the other is extreme
    pub fn classify(metrics: SocialMetrics) -> Self {
        let greed = metrics.positive + metrics.volume / 10.0;
        let fear = metrics.negative - metrics.volume / 10.0;

        if greed > fear * 1.5 {
            Self::ExtremeGreed
        } else if greed > fear {
            Self::Greed
        } else if fear > greed * 1.5 {
            Self::ExtremeFear
        } else if fear > greed {
            Self::Fear
        } else {
            Self::Neutral
        }
    }
}

impl std::fmt::Display for GreedFear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ExtremeGreed => "Extreme Greed 🤑",
            Self::Greed => "Greed 😀",
            Self::Neutral => "Neutral 😐",
            Self::Fear => "Fear 😨",
            Self::ExtremeFear => "Extreme Fear 😱",
        };
        f.write_str(label)
    }
}

/// Source of social sentiment, keyed by provider slug
#[async_trait]
pub trait SentimentSource: Send + Sync {
    /// Positive-sentiment label over the last 24 hours
    async fn sentiment(&self, slug: &str) -> Result<Option<SentimentLabel>>;

    /// Greed/fear reading over the last 24 hours
    async fn greed_fear(&self, slug: &str) -> Result<Option<GreedFear>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_thresholds() {
        assert_eq!(SentimentLabel::classify(0.8), SentimentLabel::VeryPositive);
        assert_eq!(SentimentLabel::classify(0.75), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::classify(0.3), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::classify(0.1), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::classify(0.0), SentimentLabel::VeryNegative);
        assert_eq!(SentimentLabel::Positive.to_string(), "Positive ✅");
    }

    #[test]
    fn test_greed_fear() {
        let calm = SocialMetrics { positive: 1.0, negative: 1.0, volume: 0.0 };
        assert_eq!(GreedFear::classify(calm), GreedFear::Neutral);

        let euphoric = SocialMetrics { positive: 3.0, negative: 1.0, volume: 10.0 };
        assert_eq!(GreedFear::classify(euphoric), GreedFear::ExtremeGreed);

        let nervous = SocialMetrics { positive: 1.0, negative: 1.4, volume: 0.0 };
        assert_eq!(GreedFear::classify(nervous), GreedFear::Fear);

        let panic = SocialMetrics { positive: 1.0, negative: 4.0, volume: 5.0 };
        assert_eq!(GreedFear::classify(panic), GreedFear::ExtremeFear);
    }
}
