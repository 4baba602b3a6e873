// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One news item as delivered by the aggregator, after normalization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: String,         // canonical link, ledger key
    pub image: String,       // empty when the record carried no image
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,      // domain, lower-cased, without "www."
    pub sentiment: Option<String>,
}

#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &'static str;
}
