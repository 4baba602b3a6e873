// src/pipeline.rs
//! One relay run: fetch, filter, dedup, translate, rehost, publish, ledger.
//!
//! Articles are handled strictly one after another. A failing article only
//! affects its own sink statuses; the only errors that escape `run` are
//! ledger write errors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use metrics::counter;
use tracing::{info, warn};

use crate::config::allowlist::AllowLists;
use crate::config::Config;
use crate::ingest::providers::aggregator::AggregatorProvider;
use crate::ingest::types::{Article, ArticleSource};
use crate::ingest::{fetch_once, filter_eligible, Eligibility};
use crate::ledger::{Ledger, LedgerEntry};
use crate::media::{MediaRelay, RehostedMedia};
use crate::publish::facebook::FacebookClient;
use crate::publish::wordpress::{render_post_html, CmsPost, WordPressClient};
use crate::publish::SinkStatus;
use crate::translate::gemini::GeminiModel;
use crate::translate::language::{LanguageDetector, LanguageGate, WhatlangDetector};
use crate::translate::{DynTextModel, PromptKind, Translator};

/// Counters for one run, logged by the binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub filtered: usize,
    pub already_seen: usize,
    pub translation_failed: usize,
    pub published: usize,
    pub recorded: usize,
}

/// Translated fields of one article.
#[derive(Debug, Clone)]
struct Translated {
    title: String,
    summary: String,
    content: String,
}

pub struct Pipeline {
    source: Box<dyn ArticleSource>,
    allowlists: AllowLists,
    translator: Translator,
    /// `None` when language validation is switched off.
    gate: Option<LanguageGate>,
    cms: Arc<WordPressClient>,
    media: MediaRelay,
    social: FacebookClient,
    ledger: Ledger,
    max_articles: usize,
    pacing: Duration,
    dry_run: bool,
}

impl Pipeline {
    /// Production wiring: aggregator source, Gemini model, whatlang detector.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let source = AggregatorProvider::new(&cfg.news.endpoint, &cfg.news.token, cfg.news.timeout)?;
        let model = GeminiModel::new(
            &cfg.translate.base_url,
            &cfg.translate.api_key,
            &cfg.translate.model,
        )?;
        Self::new(cfg, Box::new(source), Arc::new(model), Arc::new(WhatlangDetector))
    }

    /// Wiring with injected source, model and detector. Sinks come from `cfg`.
    pub fn new(
        cfg: &Config,
        source: Box<dyn ArticleSource>,
        model: DynTextModel,
        detector: Arc<dyn LanguageDetector>,
    ) -> Result<Self> {
        let target = cfg.translate.target;
        let translator = Translator::new(model, target, cfg.translate.backoff_base);
        let gate = cfg
            .translate
            .validate_language
            .then(|| LanguageGate::new(detector, target));

        let cms = Arc::new(WordPressClient::new(&cfg.wordpress)?);
        let media = MediaRelay::new(cms.clone())?;
        let social = FacebookClient::new(&cfg.facebook)?;

        Ok(Self {
            source,
            allowlists: cfg.allowlists.clone(),
            translator,
            gate,
            cms,
            media,
            social,
            ledger: Ledger::new(cfg.ledger_path.clone()),
            max_articles: cfg.news.max_articles,
            pacing: cfg.pacing,
            dry_run: false,
        })
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_max_articles(mut self, n: usize) -> Self {
        self.max_articles = n;
        self
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = ledger;
        self
    }

    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        let fetched = fetch_once(self.source.as_ref(), self.max_articles).await;
        report.fetched = fetched.len();

        let (eligible, filtered) =
            filter_eligible(fetched, &self.allowlists.cms, &self.allowlists.social);
        report.filtered = filtered;
        counter!("relay_articles_filtered_total").increment(filtered as u64);

        let mut seen = self.ledger.load();
        let mut entries = Vec::new();
        let mut first = true;

        for (article, elig) in eligible {
            if !seen.insert(article.url.clone()) {
                tracing::debug!(url = %article.url, "already published");
                report.already_seen += 1;
                counter!("relay_articles_seen_total").increment(1);
                continue;
            }

            if !first && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            first = false;

            match self.process(&article, elig).await {
                Some(entry) => {
                    if entry.any_posted() {
                        report.published += 1;
                    }
                    entries.push(entry);
                }
                None => report.translation_failed += 1,
            }
        }

        report.recorded = self.ledger.record(&entries)?;
        crate::metrics::mark_run_finished();
        info!(?report, dry_run = self.dry_run, "run finished");
        Ok(report)
    }

    async fn process(&self, article: &Article, elig: Eligibility) -> Option<LedgerEntry> {
        info!(url = %article.url, source = %article.source, cms = elig.cms, social = elig.social, "processing article");

        let Some(tr) = self.translate_article(article).await else {
            warn!(url = %article.url, "translation failed, article dropped for this run");
            return None;
        };

        let caption = if elig.social {
            self.caption(article, &tr).await
        } else {
            String::new()
        };

        let rehosted: Option<RehostedMedia> = if elig.cms && !self.dry_run {
            self.media.rehost(&article.image).await
        } else {
            None
        };
        let image = rehosted
            .as_ref()
            .map(|m| m.url.clone())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| article.image.trim().to_string());

        let wp_status = if elig.cms && !self.dry_run {
            let post = CmsPost {
                title: tr.title.clone(),
                html: render_post_html(
                    &tr.title,
                    rehosted.as_ref().map(|m| m.url.as_str()),
                    &tr.content,
                    article.sentiment.as_deref(),
                    &article.url,
                ),
                featured_media: rehosted.as_ref().map(|m| m.id),
            };
            self.cms.publish(&post).await
        } else {
            SinkStatus::Skipped
        };

        let fb_status = if elig.social && !self.dry_run {
            let img = Some(image.as_str()).filter(|s| !s.is_empty());
            self.social.publish(&caption, img).await
        } else {
            SinkStatus::Skipped
        };

        info!(url = %article.url, wp = wp_status.as_str(), fb = fb_status.as_str(), "article done");

        Some(
            LedgerEntry {
                url: article.url.clone(),
                title: tr.title,
                summary: tr.summary,
                content: tr.content,
                caption,
                image,
                source: article.source.clone(),
                wp_status,
                fb_status,
                status: SinkStatus::Skipped,
                sentiment: article.sentiment.clone(),
                published_at: article.published_at,
                timestamp: Utc::now(),
            }
            .with_overall_status(),
        )
    }

    async fn translate_article(&self, article: &Article) -> Option<Translated> {
        let t = &self.translator;
        match &self.gate {
            Some(gate) => {
                let has_content = !article.content.trim().is_empty();
                let body = if has_content { &article.content } else { &article.summary };
                let (title, body_t) = gate.translate_pair(t, &article.title, body).await?;
                let summary = if has_content {
                    t.translate(&article.summary, PromptKind::Article)
                        .await
                        .or_original(&article.summary)
                } else {
                    body_t.clone()
                };
                Some(Translated {
                    title,
                    summary,
                    content: body_t,
                })
            }
            None => {
                let title = t.translate(&article.title, PromptKind::Headline).await;
                let summary = t.translate(&article.summary, PromptKind::Article).await;
                let content = t.translate(&article.content, PromptKind::Article).await;
                if !(title.is_success() || summary.is_success() || content.is_success()) {
                    return None;
                }
                Some(Translated {
                    title: title.or_original(&article.title),
                    summary: summary.or_original(&article.summary),
                    content: content.or_original(&article.content),
                })
            }
        }
    }

    async fn caption(&self, article: &Article, tr: &Translated) -> String {
        let text = if article.summary.trim().is_empty() {
            article.title.clone()
        } else {
            format!("{}\n\n{}", article.title, article.summary)
        };
        self.translator
            .translate(&text, PromptKind::SocialCaption)
            .await
            .or_original(&tr.title)
    }
}
