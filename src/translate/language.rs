// src/translate/language.rs
use std::sync::Arc;
use std::time::Duration;

use whatlang::Lang;

use super::{PromptKind, Translator};
use crate::retry::{Attempt, RetryPolicy};

/// Shortest text the detector is trusted on.
pub const MIN_DETECT_CHARS: usize = 20;
/// Full translate-and-check rounds before an article is dropped.
pub const VALIDATION_ATTEMPTS: u32 = 3;

pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<Lang>;
}

/// Trigram-based detection from `whatlang`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<Lang> {
        whatlang::detect(text).map(|info| info.lang())
    }
}

pub struct LanguageGate {
    detector: Arc<dyn LanguageDetector>,
    target: Lang,
    retry: RetryPolicy,
}

impl LanguageGate {
    pub fn new(detector: Arc<dyn LanguageDetector>, target: Lang) -> Self {
        Self {
            detector,
            target,
            retry: RetryPolicy::fixed(VALIDATION_ATTEMPTS, Duration::ZERO),
        }
    }

    /// Long enough and detected as the target language.
    pub fn accepts(&self, text: &str) -> bool {
        let text = text.trim();
        if text.chars().count() < MIN_DETECT_CHARS {
            return false;
        }
        self.detector.detect(text) == Some(self.target)
    }

    /// Translate title and body together until both succeed and the body passes
    /// the language check. `None` once attempts are exhausted.
    pub async fn translate_pair(
        &self,
        translator: &Translator,
        title: &str,
        body: &str,
    ) -> Option<(String, String)> {
        self.retry
            .run(|attempt| async move {
                let t_title = translator.translate(title, PromptKind::Headline).await;
                let t_body = translator.translate(body, PromptKind::Article).await;
                match (t_title.into_option(), t_body.into_option()) {
                    (Some(tt), Some(tb)) if self.accepts(&tb) => Attempt::Done((tt, tb)),
                    (Some(_), Some(_)) => {
                        tracing::warn!(attempt, target = self.target.code(), "translation not in target language");
                        Attempt::Retry
                    }
                    _ => {
                        tracing::warn!(attempt, "title or body translation failed");
                        Attempt::Retry
                    }
                }
            })
            .await
    }
}
