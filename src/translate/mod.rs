//! Translation through a generative text model.
//!
//! A single `TextModel::complete` call backs three prompt kinds (headline,
//! article body, social caption). Rate-limited replies are retried with
//! exponential backoff; every other failure yields `Translation::Failed`
//! immediately.

pub mod gemini;
pub mod language;

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use crate::retry::{Attempt, RetryPolicy};

/// Attempts made while the provider keeps answering 429.
pub const RATE_LIMIT_ATTEMPTS: u32 = 5;

/// Outcome of one translation. Callers branch on the variant, never on text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Succeeded(String),
    Failed,
}

impl Translation {
    pub fn is_success(&self) -> bool {
        matches!(self, Translation::Succeeded(_))
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            Translation::Succeeded(s) => Some(s),
            Translation::Failed => None,
        }
    }

    /// Translated text, or `original` when the translation failed.
    pub fn or_original(self, original: &str) -> String {
        self.into_option().unwrap_or_else(|| original.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Headline,
    Article,
    SocialCaption,
}

/// Raw reply of a model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    Text(String),
    /// HTTP 429; worth retrying after a pause.
    RateLimited,
    /// Anything else: other status, transport or decode error.
    Failed(String),
}

#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> ModelReply;
    fn name(&self) -> &'static str;
}

pub type DynTextModel = Arc<dyn TextModel>;

pub fn build_prompt(kind: PromptKind, language: &str, text: &str) -> String {
    match kind {
        PromptKind::Headline => format!(
            "Translate the following cryptocurrency news headline into {language}. \
             Keep coin names, tickers, companies and people recognizable. \
             Return only the translated headline, without quotes or commentary.\n\n{text}"
        ),
        PromptKind::Article => format!(
            "Translate the following cryptocurrency news article into fluent {language}. \
             Preserve paragraph breaks, numbers, tickers and proper names. \
             Return only the translation, without headings, notes or commentary.\n\n{text}"
        ),
        PromptKind::SocialCaption => format!(
            "Write a short social media caption in {language} (at most two sentences, \
             up to three relevant hashtags) for the following cryptocurrency news. \
             Return only the caption.\n\n{text}"
        ),
    }
}

pub struct Translator {
    model: DynTextModel,
    target: whatlang::Lang,
    retry: RetryPolicy,
}

impl Translator {
    pub fn new(model: DynTextModel, target: whatlang::Lang, backoff_base: Duration) -> Self {
        Self {
            model,
            target,
            retry: RetryPolicy::exponential(RATE_LIMIT_ATTEMPTS, backoff_base),
        }
    }

    /// Translate `text` with the prompt for `kind`. Blank input fails without a call.
    pub async fn translate(&self, text: &str, kind: PromptKind) -> Translation {
        if text.trim().is_empty() {
            return Translation::Failed;
        }
        let prompt = build_prompt(kind, self.target.eng_name(), text);

        let out = self
            .retry
            .run(|attempt| {
                let prompt = prompt.as_str();
                async move {
                    counter!("relay_translate_calls_total").increment(1);
                    match self.model.complete(prompt).await {
                        ModelReply::Text(t) => {
                            let t = t.trim();
                            if t.is_empty() {
                                tracing::warn!(provider = self.model.name(), ?kind, "empty translation");
                                Attempt::Abort
                            } else {
                                Attempt::Done(t.to_string())
                            }
                        }
                        ModelReply::RateLimited => {
                            counter!("relay_translate_rate_limited_total").increment(1);
                            tracing::warn!(provider = self.model.name(), attempt, "rate limited");
                            Attempt::Retry
                        }
                        ModelReply::Failed(reason) => {
                            tracing::warn!(provider = self.model.name(), ?kind, %reason, "translation failed");
                            Attempt::Abort
                        }
                    }
                }
            })
            .await;

        match out {
            Some(t) => Translation::Succeeded(t),
            None => Translation::Failed,
        }
    }
}
