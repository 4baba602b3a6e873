// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::config::allowlist::DomainAllowList;
use crate::ingest::types::{Article, ArticleSource};
use metrics::counter;
use once_cell::sync::OnceCell;

const MAX_TEXT_CHARS: usize = 6000;

/// Normalize fetched text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Block-level tags become line breaks so paragraphs survive
    static RE_BLOCK: OnceCell<regex::Regex> = OnceCell::new();
    let re_block = RE_BLOCK.get_or_init(|| {
        regex::Regex::new(r"(?i)<\s*(br|/p|/div|/li|/h[1-6])\s*/?>").expect("valid block regex")
    });
    out = re_block.replace_all(&out, "\n").to_string();

    // 3) Strip remaining tags and comments; a bare `<` or `>` is text
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| {
        regex::Regex::new(r"(?is)<!--.*?-->|</?[a-z][^>]*>").expect("valid tag regex")
    });
    out = re_tags.replace_all(&out, "").to_string();

    // 4) Collapse horizontal whitespace, keep at most one blank line
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[ \t\r\u{00A0}]+").expect("valid ws regex"));
    out = re_ws.replace_all(&out, " ").to_string();

    static RE_NL: OnceCell<regex::Regex> = OnceCell::new();
    let re_nl = RE_NL.get_or_init(|| regex::Regex::new(r"\s*\n\s*").expect("valid nl regex"));
    out = re_nl
        .replace_all(&out, |caps: &regex::Captures| {
            if caps[0].matches('\n').count() > 1 {
                "\n\n"
            } else {
                "\n"
            }
        })
        .to_string();
    out = out.trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

/// Network location of `url`: lower-cased, `www.` stripped. Empty if unparseable.
pub fn source_domain(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url.trim()) else {
        return String::new();
    };
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

/// Which sinks an article may go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Eligibility {
    pub cms: bool,
    pub social: bool,
}

impl Eligibility {
    pub fn any(&self) -> bool {
        self.cms || self.social
    }
}

pub fn eligibility(article: &Article, cms: &DomainAllowList, social: &DomainAllowList) -> Eligibility {
    Eligibility {
        cms: cms.allows(&article.source),
        social: social.allows(&article.source),
    }
}

/// Keep articles eligible for at least one sink. Returns (kept, filtered_count).
pub fn filter_eligible(
    articles: Vec<Article>,
    cms: &DomainAllowList,
    social: &DomainAllowList,
) -> (Vec<(Article, Eligibility)>, usize) {
    let mut filtered_out = 0usize;
    let mut kept = Vec::with_capacity(articles.len());
    for art in articles {
        let elig = eligibility(&art, cms, social);
        if !elig.any() {
            tracing::debug!(url = %art.url, source = %art.source, "source not on any allow-list");
            filtered_out += 1;
            continue;
        }
        kept.push((art, elig));
    }
    (kept, filtered_out)
}

/// Fetch once from `source`, capped to `limit` articles. Provider errors yield no work.
pub async fn fetch_once(source: &dyn ArticleSource, limit: usize) -> Vec<Article> {
    crate::metrics::ensure_described();

    let mut raw = match source.fetch_latest().await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = ?e, provider = source.name(), "provider error");
            counter!("relay_provider_errors_total").increment(1);
            Vec::new()
        }
    };
    raw.truncate(limit);
    counter!("relay_articles_fetched_total").increment(raw.len() as u64);
    raw
}
