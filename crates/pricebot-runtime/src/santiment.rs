//! Santiment Sentiment Source
//!
//! Social sentiment over the last 24 hours from the Santiment GraphQL API.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use pricebot_core::sentiment::{GreedFear, SentimentLabel, SentimentSource, SocialMetrics};
use pricebot_core::{BotError, Result};
use serde::Deserialize;
use serde_json::json;

use crate::http;

const PROVIDER_NAME: &str = "Santiment";

#[derive(Clone, Debug)]
pub struct SantimentConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for SantimentConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.santiment.net/graphql".into(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl SantimentConfig {
    /// `None` when no API key is configured
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("SANTIMENT_API_KEY").ok().filter(|k| !k.is_empty())?;
        let defaults = Self::default();
        Some(Self {
            endpoint: std::env::var("SANTIMENT_ENDPOINT").unwrap_or(defaults.endpoint),
            api_key,
            ..defaults
        })
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<HashMap<String, Option<Metric>>>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metric {
    #[serde(default)]
    timeseries_data: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct Point {
    value: f64,
}

pub struct SantimentClient {
    client: reqwest::Client,
    config: SantimentConfig,
}

impl SantimentClient {
    pub fn from_config(config: SantimentConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            config,
        })
    }

    /// Averages of each requested metric, keyed by alias
    async fn averages(&self, slug: &str, metrics: &[(&str, &str)]) -> Result<HashMap<String, f64>> {
        let query = build_query(slug, metrics);
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Apikey {}", self.config.api_key))
            .json(&json!({ "query": query }))
            .send()
            .await?;

        let body = http::check_status(response, PROVIDER_NAME)?.text().await?;
        parse_averages(&body)
    }
}

fn build_query(slug: &str, metrics: &[(&str, &str)]) -> String {
    let to = Utc::now();
    let from = to - Duration::hours(24);
    let from = from.to_rfc3339_opts(SecondsFormat::Secs, true);
    let to = to.to_rfc3339_opts(SecondsFormat::Secs, true);

    let fields: Vec<String> = metrics
        .iter()
        .map(|(alias, metric)| {
            format!(
                r#"{alias}: getMetric(metric: "{metric}") {{ timeseriesData(slug: "{slug}", from: "{from}", to: "{to}", interval: "1d") {{ datetime value }} }}"#
            )
        })
        .collect();
    format!("query {{ {} }}", fields.join(" "))
}

fn parse_averages(body: &str) -> Result<HashMap<String, f64>> {
    let response: GraphQlResponse = serde_json::from_str(body)?;
    if let Some(error) = response.errors.first() {
        return Err(BotError::Provider(format!("{PROVIDER_NAME}: {}", error.message)));
    }

    Ok(response
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(alias, metric)| {
            let points = metric?.timeseries_data;
            if points.is_empty() {
                return None;
            }
            #[allow(clippy::cast_precision_loss)]
            let average = points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64;
            Some((alias, average))
        })
        .collect())
}

#[async_trait]
impl SentimentSource for SantimentClient {
    async fn sentiment(&self, slug: &str) -> Result<Option<SentimentLabel>> {
        let averages = self.averages(slug, &[("positive", "sentiment_positive")]).await?;
        Ok(averages.get("positive").copied().map(SentimentLabel::classify))
    }

    async fn greed_fear(&self, slug: &str) -> Result<Option<GreedFear>> {
        let averages = self
            .averages(
                slug,
                &[
                    ("positive", "sentiment_positive"),
                    ("negative", "sentiment_negative"),
                    ("volume", "social_volume_total"),
                ],
            )
            .await?;

        let (Some(positive), Some(negative), Some(volume)) = (
            averages.get("positive"),
            averages.get("negative"),
            averages.get("volume"),
        ) else {
            return Ok(None);
        };

        Ok(Some(GreedFear::classify(SocialMetrics {
            positive: *positive,
            negative: *negative,
            volume: *volume,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_uses_aliases() {
        let query = build_query("bitcoin", &[("positive", "sentiment_positive"), ("volume", "social_volume_total")]);
        assert!(query.starts_with("query {"));
        assert!(query.contains(r#"positive: getMetric(metric: "sentiment_positive")"#));
        assert!(query.contains(r#"volume: getMetric(metric: "social_volume_total")"#));
        assert!(query.contains(r#"slug: "bitcoin""#));
    }

    #[test]
    fn test_parse_averages() {
        let body = r#"{"data": {
            "positive": {"timeseriesData": [{"datetime": "2024-01-01T00:00:00Z", "value": 0.6}, {"datetime": "2024-01-02T00:00:00Z", "value": 1.0}]},
            "negative": {"timeseriesData": []}
        }}"#;
        let averages = parse_averages(body).unwrap();

        assert!((averages["positive"] - 0.8).abs() < 1e-9);
        assert!(!averages.contains_key("negative"));
        assert_eq!(SentimentLabel::classify(averages["positive"]), SentimentLabel::VeryPositive);
    }

    #[test]
    fn test_graphql_errors_surface() {
        let body = r#"{"data": null, "errors": [{"message": "Unauthorized"}]}"#;
        assert!(matches!(parse_averages(body), Err(BotError::Provider(_))));
    }
}
