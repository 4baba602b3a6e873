// src/media.rs
//! Media relay: download a remote image and re-upload it to the CMS media store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, StatusCode};
use sha2::{Digest, Sha256};

use crate::publish::wordpress::WordPressClient;
use crate::retry::{Attempt, RetryPolicy};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Media id in the CMS plus its public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RehostedMedia {
    pub id: u64,
    pub url: String,
}

pub struct MediaRelay {
    http: Client,
    store: Arc<WordPressClient>,
    retry: RetryPolicy,
}

impl MediaRelay {
    pub fn new(store: Arc<WordPressClient>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building media http client")?;
        Ok(Self {
            http,
            store,
            // one extra try on transport errors only
            retry: RetryPolicy::fixed(2, Duration::from_secs(1)),
        })
    }

    /// Rehost `image_url`. `None` means "post without image", never an error.
    pub async fn rehost(&self, image_url: &str) -> Option<RehostedMedia> {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            return None;
        }

        let (bytes, header_type) = self.download(image_url).await?;
        let (content_type, ext) = sniff_image_type(&bytes, header_type.as_deref());
        let filename = upload_filename(image_url, ext);
        tracing::debug!(url = image_url, %filename, content_type, size = bytes.len(), "image downloaded");

        self.store.upload_media(bytes, &filename, content_type).await
    }

    async fn download(&self, image_url: &str) -> Option<(Vec<u8>, Option<String>)> {
        let referer = referer_for(image_url);
        self.retry
            .run(|attempt| {
                let referer = referer.as_str();
                async move {
                    let resp = match self
                        .http
                        .get(image_url)
                        .header(header::REFERER, referer)
                        .header(header::ACCEPT, "image/avif,image/webp,image/*,*/*;q=0.8")
                        .send()
                        .await
                    {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(url = image_url, attempt, error = %e, "image download failed");
                            return Attempt::Retry;
                        }
                    };
                    if resp.status() != StatusCode::OK {
                        tracing::warn!(url = image_url, status = resp.status().as_u16(), "image download rejected");
                        return Attempt::Abort;
                    }
                    let header_type = resp
                        .headers()
                        .get(header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    match resp.bytes().await {
                        Ok(b) if !b.is_empty() => Attempt::Done((b.to_vec(), header_type)),
                        Ok(_) => Attempt::Abort,
                        Err(e) => {
                            tracing::warn!(url = image_url, attempt, error = %e, "image body read failed");
                            Attempt::Retry
                        }
                    }
                }
            })
            .await
    }
}

/// `scheme://host/` of the image, so hotlink checks see a same-site referer.
fn referer_for(image_url: &str) -> String {
    match url::Url::parse(image_url) {
        Ok(u) => format!("{}/", u.origin().ascii_serialization()),
        Err(_) => String::new(),
    }
}

/// Content type from magic bytes, then the response header, then JPEG.
pub fn sniff_image_type(bytes: &[u8], header_type: Option<&str>) -> (&'static str, &'static str) {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return ("image/jpeg", "jpg");
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return ("image/png", "png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return ("image/gif", "gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return ("image/webp", "webp");
    }
    let header_type = header_type
        .and_then(|h| h.split(';').next())
        .map(|h| h.trim().to_ascii_lowercase());
    match header_type.as_deref() {
        Some("image/png") => ("image/png", "png"),
        Some("image/gif") => ("image/gif", "gif"),
        Some("image/webp") => ("image/webp", "webp"),
        _ => ("image/jpeg", "jpg"),
    }
}

/// URL basename when it has an image extension, else a digest-based name.
pub fn upload_filename(image_url: &str, ext: &str) -> String {
    let basename = url::Url::parse(image_url)
        .ok()
        .and_then(|u| u.path_segments()?.last().map(str::to_string))
        .filter(|name| {
            let lower = name.to_ascii_lowercase();
            [".jpg", ".jpeg", ".png", ".gif", ".webp"]
                .iter()
                .any(|e| lower.ends_with(e))
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        });
    if let Some(name) = basename {
        return name;
    }

    let digest = Sha256::digest(image_url.as_bytes());
    let mut name = String::with_capacity(16 + ext.len() + 7);
    name.push_str("news-");
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut name, "{:02x}", b);
    }
    name.push('.');
    name.push_str(ext);
    name
}
