// src/translate/gemini.rs
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{ModelReply, TextModel};

/// Gemini `generateContent` client. Requires an API key.
pub struct GeminiModel {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiModel {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cryptonews-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building gemini http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct Req<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: Option<RespContent>,
}
#[derive(Deserialize)]
struct RespContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}
#[derive(Deserialize)]
struct RespPart {
    text: Option<String>,
}

/// `candidates[0].content.parts[0].text`, if present.
fn first_text(resp: Resp) -> Option<String> {
    resp.candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}

#[async_trait::async_trait]
impl TextModel for GeminiModel {
    async fn complete(&self, prompt: &str) -> ModelReply {
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = match self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return ModelReply::Failed(format!("transport: {e}")),
        };

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return ModelReply::RateLimited,
            other => return ModelReply::Failed(format!("HTTP {}", other.as_u16())),
        }

        match resp.json::<Resp>().await {
            Ok(body) => match first_text(body) {
                Some(text) => ModelReply::Text(text),
                None => ModelReply::Failed("response has no candidate text".into()),
            },
            Err(e) => ModelReply::Failed(format!("decode: {e}")),
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
