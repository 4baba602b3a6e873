// src/ingest/providers/aggregator.rs
//! News aggregator provider (Apify dataset endpoint or any API returning a
//! JSON array of article records).

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::ingest::types::{Article, ArticleSource};
use crate::ingest::{normalize_text, source_domain};

pub struct AggregatorProvider {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl AggregatorProvider {
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cryptonews-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("building news http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        })
    }

    /// Parse a response body into articles. Accepts a bare array or an object
    /// wrapping it under `items`, `data` or `articles`.
    pub fn parse_records(body: &str) -> Result<Vec<Article>> {
        let root: Value = serde_json::from_str(body).context("parsing news json")?;
        let records = match root {
            Value::Array(v) => v,
            Value::Object(mut obj) => ["items", "data", "articles"]
                .iter()
                .find_map(|k| match obj.remove(*k) {
                    Some(Value::Array(v)) => Some(v),
                    _ => None,
                })
                .ok_or_else(|| anyhow!("news json object has no article list"))?,
            _ => return Err(anyhow!("news json is neither a list nor an object")),
        };

        let mut out = Vec::with_capacity(records.len());
        for rec in records {
            let Value::Object(obj) = rec else {
                continue;
            };
            if let Some(article) = record_to_article(&obj) {
                out.push(article);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ArticleSource for AggregatorProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let resp = self
            .http
            .get(&self.endpoint)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("news http get()")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %truncate(&body, 200), "news api non-success");
            return Err(anyhow!("news api returned HTTP {}", status.as_u16()));
        }

        let body = resp.text().await.context("news http .text()")?;
        let articles = Self::parse_records(&body)?;
        tracing::info!(count = articles.len(), "fetched news records");
        Ok(articles)
    }

    fn name(&self) -> &'static str {
        "aggregator"
    }
}

fn record_to_article(obj: &Map<String, Value>) -> Option<Article> {
    let url = str_field(obj, &["link", "url"])?.trim().to_string();
    if url.is_empty() {
        return None;
    }

    let title = normalize_text(&str_field(obj, &["title"]).unwrap_or_default());
    let summary = normalize_text(&str_field(obj, &["summary", "description"]).unwrap_or_default());
    let content = normalize_text(&str_field(obj, &["content", "text", "body"]).unwrap_or_default());

    Some(Article {
        source: source_domain(&url),
        title,
        summary,
        content,
        image: image_field(obj).unwrap_or_default(),
        published_at: ["published", "time", "date"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(parse_timestamp)),
        sentiment: sentiment_field(obj),
        url,
    })
}

/// First present string among `keys`; non-string values are ignored.
fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str).map(str::to_string))
}

fn url_like(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(o) => o.get("url").and_then(url_like),
        _ => None,
    }
}

fn image_field(obj: &Map<String, Value>) -> Option<String> {
    if let Some(img) = obj.get("image").and_then(url_like) {
        return Some(img);
    }
    match obj.get("media") {
        Some(Value::Array(items)) => items.first().and_then(url_like),
        Some(other) => url_like(other),
        None => None,
    }
}

fn sentiment_field(obj: &Map<String, Value>) -> Option<String> {
    let label = match obj.get("sentiment")? {
        Value::String(s) => s.clone(),
        Value::Object(o) => o.get("label")?.as_str()?.to_string(),
        _ => return None,
    };
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_string())
}

/// RFC 3339, RFC 2822 or unix seconds/milliseconds.
fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .or_else(|_| DateTime::parse_from_rfc2822(s))
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| s.parse::<i64>().ok().and_then(from_unix))
        }
        Value::Number(n) => n.as_i64().and_then(from_unix),
        _ => None,
    }
}

fn from_unix(n: i64) -> Option<DateTime<Utc>> {
    // values past year 33658 in seconds are milliseconds
    if n > 1_000_000_000_000 {
        Utc.timestamp_millis_opt(n).single()
    } else {
        Utc.timestamp_opt(n, 0).single()
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
