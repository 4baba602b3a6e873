// src/publish/wordpress.rs
use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{record_outcome, Sink, SinkStatus};
use crate::config::WordPressConfig;
use crate::media::RehostedMedia;

pub const READ_ORIGINAL_LABEL: &str = "Read the original article";

/// WordPress REST client (`/wp-json/wp/v2`) using an application password.
pub struct WordPressClient {
    http: Client,
    api_base: String,
    auth_header: String,
    category_id: u64,
    featured_media_delay: Duration,
}

/// A post ready to be sent.
#[derive(Debug, Clone)]
pub struct CmsPost {
    pub title: String,
    pub html: String,
    pub featured_media: Option<u64>,
}

#[derive(Serialize)]
struct PostReq<'a> {
    title: &'a str,
    content: &'a str,
    status: &'a str,
    categories: [u64; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    featured_media: Option<u64>,
}

#[derive(Deserialize)]
struct MediaResp {
    id: u64,
    source_url: Option<String>,
    guid: Option<Rendered>,
}

#[derive(Deserialize)]
struct Rendered {
    rendered: String,
}

impl WordPressClient {
    pub fn new(cfg: &WordPressConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("cryptonews-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building wordpress http client")?;
        let token = BASE64.encode(format!("{}:{}", cfg.username, cfg.app_password));
        Ok(Self {
            http,
            api_base: format!("{}/wp-json/wp/v2", cfg.base_url.trim_end_matches('/')),
            auth_header: format!("Basic {token}"),
            category_id: cfg.category_id,
            featured_media_delay: cfg.featured_media_delay,
        })
    }

    /// Upload raw image bytes to the media library.
    pub async fn upload_media(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Option<RehostedMedia> {
        let resp = self
            .http
            .post(format!("{}/media", self.api_base))
            .header(header::AUTHORIZATION, &self.auth_header)
            .header(header::CONTENT_TYPE, content_type)
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            )
            .body(bytes)
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, filename, "media upload request failed");
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body.chars().take(200).collect::<String>(), "media upload rejected");
            return None;
        }

        match resp.json::<MediaResp>().await {
            Ok(m) => {
                let url = m.source_url.or(m.guid.map(|g| g.rendered)).unwrap_or_default();
                tracing::info!(media_id = m.id, url = %url, "media uploaded");
                Some(RehostedMedia { id: m.id, url })
            }
            Err(e) => {
                tracing::warn!(error = %e, "media upload response unreadable");
                None
            }
        }
    }

    /// Create a published post. `Posted` only on HTTP 201.
    pub async fn publish(&self, post: &CmsPost) -> SinkStatus {
        if post.featured_media.is_some() && !self.featured_media_delay.is_zero() {
            // let the CMS finish processing the upload
            tokio::time::sleep(self.featured_media_delay).await;
        }

        let req = PostReq {
            title: &post.title,
            content: &post.html,
            status: "publish",
            categories: [self.category_id],
            featured_media: post.featured_media,
        };

        let status = match self
            .http
            .post(format!("{}/posts", self.api_base))
            .header(header::AUTHORIZATION, &self.auth_header)
            .json(&req)
            .send()
            .await
        {
            Ok(resp) if resp.status() == StatusCode::CREATED => SinkStatus::Posted,
            Ok(resp) => {
                let code = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(status = code, body = %body.chars().take(200).collect::<String>(), "cms post rejected");
                SinkStatus::Failed
            }
            Err(e) => {
                tracing::warn!(error = %e, "cms post request failed");
                SinkStatus::Failed
            }
        };
        record_outcome(Sink::Cms, status);
        status
    }
}

/// Post body: heading, optional image, paragraphs, sentiment note, link back.
pub fn render_post_html(
    title: &str,
    image_url: Option<&str>,
    body: &str,
    sentiment: Option<&str>,
    source_url: &str,
) -> String {
    use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

    let mut html = String::with_capacity(body.len() + 512);
    html.push_str(&format!("<h2>{}</h2>\n", text(title)));
    if let Some(img) = image_url.filter(|s| !s.trim().is_empty()) {
        html.push_str(&format!(
            "<figure><img src=\"{}\" alt=\"{}\" /></figure>\n",
            attr(img),
            attr(title)
        ));
    }
    for para in body.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        html.push_str(&format!("<p>{}</p>\n", text(para).replace('\n', "<br />")));
    }
    if let Some(label) = sentiment.filter(|s| !s.trim().is_empty()) {
        html.push_str(&format!(
            "<p class=\"news-sentiment\"><em>Sentiment: {}</em></p>\n",
            text(label.trim())
        ));
    }
    html.push_str(&format!(
        "<p class=\"news-source\"><a href=\"{}\" target=\"_blank\" rel=\"nofollow noopener\">{}</a></p>",
        attr(source_url),
        READ_ORIGINAL_LABEL
    ));
    html
}
