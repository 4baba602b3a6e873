// src/publish/facebook.rs
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{record_outcome, Sink, SinkStatus};
use crate::config::FacebookConfig;

/// Graph API page publisher. Page token is resolved per publish from the
/// long-lived user token.
pub struct FacebookClient {
    http: Client,
    graph_url: String,
    page_id: Option<String>,
    user_token: Option<String>,
}

#[derive(Deserialize)]
struct Accounts {
    #[serde(default)]
    data: Vec<PageAccount>,
}

#[derive(Deserialize)]
struct PageAccount {
    id: String,
    access_token: Option<String>,
}

impl FacebookClient {
    pub fn new(cfg: &FacebookConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("cryptonews-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building graph http client")?;
        Ok(Self {
            http,
            graph_url: cfg.graph_url.trim_end_matches('/').to_string(),
            page_id: cfg.page_id.clone().filter(|s| !s.is_empty()),
            user_token: cfg.user_token.clone().filter(|s| !s.is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.page_id.is_some() && self.user_token.is_some()
    }

    /// Exchange the user token for the configured page's token.
    pub async fn page_token(&self) -> Option<String> {
        let (page_id, user_token) = (self.page_id.as_deref()?, self.user_token.as_deref()?);

        let resp = match self
            .http
            .get(format!("{}/me/accounts", self.graph_url))
            .query(&[("fields", "id,name,access_token"), ("access_token", user_token)])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "page token request failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!(status = resp.status().as_u16(), "page token request rejected");
            return None;
        }

        let accounts: Accounts = match resp.json().await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "page token response unreadable");
                return None;
            }
        };
        let token = accounts
            .data
            .into_iter()
            .find(|p| p.id == page_id)
            .and_then(|p| p.access_token)
            .filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::warn!(page_id, "user token grants no access to the configured page");
        }
        token
    }

    /// Post a photo with caption when `image_url` is given, else a text update.
    pub async fn publish(&self, caption: &str, image_url: Option<&str>) -> SinkStatus {
        let status = self.publish_inner(caption, image_url).await;
        record_outcome(Sink::Social, status);
        status
    }

    async fn publish_inner(&self, caption: &str, image_url: Option<&str>) -> SinkStatus {
        let Some(page_id) = self.page_id.as_deref().filter(|_| self.user_token.is_some()) else {
            tracing::debug!("facebook not configured, skipping");
            return SinkStatus::Skipped;
        };
        let Some(token) = self.page_token().await else {
            return SinkStatus::Skipped;
        };

        let image_url = image_url.map(str::trim).filter(|s| !s.is_empty());
        let req = match image_url {
            Some(img) => self
                .http
                .post(format!("{}/{}/photos", self.graph_url, page_id))
                .form(&[("url", img), ("message", caption), ("access_token", token.as_str())]),
            None => self
                .http
                .post(format!("{}/{}/feed", self.graph_url, page_id))
                .form(&[("message", caption), ("access_token", token.as_str())]),
        };

        match req.send().await {
            Ok(resp) if resp.status() == StatusCode::OK => SinkStatus::Posted,
            Ok(resp) => {
                let code = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(status = code, body = %body.chars().take(200).collect::<String>(), "facebook post rejected");
                SinkStatus::Failed
            }
            Err(e) => {
                tracing::warn!(error = %e, "facebook post request failed");
                SinkStatus::Failed
            }
        }
    }
}
