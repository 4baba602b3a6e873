//! Run configuration, built once at startup from environment variables and
//! handed to every component.

pub mod allowlist;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use self::allowlist::{load_allowlists, AllowLists, ENV_ALLOWLIST_PATH};

pub const DEFAULT_NEWS_API_URL: &str =
    "https://api.apify.com/v2/acts/easyapi~cryptonews-scraper/run-sync-get-dataset-items";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v19.0";
pub const DEFAULT_LEDGER_PATH: &str = "data/published_news.json";
pub const DEFAULT_TARGET_LANGUAGE: &str = "pes";

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub endpoint: String,
    pub token: String,
    pub timeout: Duration,
    pub max_articles: usize,
}

#[derive(Debug, Clone)]
pub struct TranslateConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub target: whatlang::Lang,
    pub validate_language: bool,
    /// First backoff delay after a 429; doubles per attempt.
    pub backoff_base: Duration,
}

#[derive(Debug, Clone)]
pub struct WordPressConfig {
    pub base_url: String,
    pub username: String,
    pub app_password: String,
    pub category_id: u64,
    pub featured_media_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct FacebookConfig {
    pub graph_url: String,
    pub page_id: Option<String>,
    pub user_token: Option<String>,
}

impl FacebookConfig {
    pub fn is_configured(&self) -> bool {
        self.page_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.user_token.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub news: NewsConfig,
    pub translate: TranslateConfig,
    pub wordpress: WordPressConfig,
    pub facebook: FacebookConfig,
    pub allowlists: AllowLists,
    pub ledger_path: PathBuf,
    pub pacing: Duration,
}

impl Config {
    /// Read the process environment. Call `dotenvy::dotenv()` first if wanted.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Missing required keys fail before any I/O
    /// other than reading the allow-list file.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| anyhow!("{key} environment variable not set"))
        };

        let token = match get("NEWS_API_TOKEN").or_else(|| get("APIFY_API_TOKEN")) {
            Some(t) => t,
            None => bail!("NEWS_API_TOKEN (or APIFY_API_TOKEN) environment variable not set"),
        };

        let news = NewsConfig {
            endpoint: get("NEWS_API_URL").unwrap_or_else(|| DEFAULT_NEWS_API_URL.to_string()),
            token,
            timeout: Duration::from_secs(parse_or(&get, "NEWS_FETCH_TIMEOUT_SECS", 30)?),
            max_articles: parse_or(&get, "MAX_ARTICLES", 10)?,
        };

        let target_code = get("TARGET_LANGUAGE").unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.into());
        let target = whatlang::Lang::from_code(target_code.to_ascii_lowercase())
            .ok_or_else(|| anyhow!("TARGET_LANGUAGE {target_code:?} is not an ISO 639-3 code"))?;

        let translate = TranslateConfig {
            base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into()),
            api_key: require("GEMINI_API_KEY")?,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            target,
            validate_language: parse_bool_or(&get, "VALIDATE_LANGUAGE", true)?,
            backoff_base: Duration::from_millis(parse_or(&get, "TRANSLATE_BACKOFF_MS", 1000)?),
        };

        let wordpress = WordPressConfig {
            base_url: require("WP_BASE_URL")?.trim_end_matches('/').to_string(),
            username: require("WP_USERNAME")?,
            app_password: require("WP_APP_PASSWORD")?,
            category_id: parse_or(&get, "WP_CATEGORY_ID", 1)?,
            featured_media_delay: Duration::from_millis(parse_or(
                &get,
                "FEATURED_MEDIA_DELAY_MS",
                2000,
            )?),
        };

        let facebook = FacebookConfig {
            graph_url: get("FB_GRAPH_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_URL.into())
                .trim_end_matches('/')
                .to_string(),
            page_id: get("FB_PAGE_ID"),
            user_token: get("FB_USER_TOKEN"),
        };

        let allow_path = get(ENV_ALLOWLIST_PATH).map(PathBuf::from);
        let allowlists = load_allowlists(allow_path.as_deref())?;

        let cfg = Config {
            news,
            translate,
            wordpress,
            facebook,
            allowlists,
            ledger_path: get("LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH)),
            pacing: Duration::from_millis(parse_or(&get, "ARTICLE_PACING_MS", 1000)?),
        };
        cfg.trace_loaded();
        Ok(cfg)
    }

    pub fn trace_loaded(&self) {
        // Secrets: only lengths.
        info!(
            news_endpoint = %self.news.endpoint,
            max_articles = self.news.max_articles,
            model = %self.translate.model,
            target = self.translate.target.code(),
            validate_language = self.translate.validate_language,
            wp = %self.wordpress.base_url,
            wp_password_len = self.wordpress.app_password.len(),
            facebook = self.facebook.is_configured(),
            cms_domains = self.allowlists.cms.len(),
            social_domains = self.allowlists.social.len(),
            ledger = %self.ledger_path.display(),
            "config loaded"
        );
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => v
            .parse::<T>()
            .with_context(|| format!("{key} has invalid value {v:?}")),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("{key} must be a boolean, got {v:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("NEWS_API_TOKEN", "tok"),
            ("GEMINI_API_KEY", "gem"),
            ("WP_BASE_URL", "https://cms.example/"),
            ("WP_USERNAME", "editor"),
            ("WP_APP_PASSWORD", "abcd efgh"),
        ])
    }

    fn build(env: &HashMap<&str, &str>) -> Result<Config> {
        Config::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_fill_optional_values() {
        let cfg = build(&base_env()).unwrap();
        assert_eq!(cfg.news.max_articles, 10);
        assert_eq!(cfg.news.endpoint, DEFAULT_NEWS_API_URL);
        assert_eq!(cfg.wordpress.base_url, "https://cms.example");
        assert_eq!(cfg.wordpress.category_id, 1);
        assert_eq!(cfg.translate.target, whatlang::Lang::Pes);
        assert!(cfg.translate.validate_language);
        assert!(!cfg.facebook.is_configured());
        assert_eq!(cfg.ledger_path, PathBuf::from(DEFAULT_LEDGER_PATH));
    }

    #[test]
    fn apify_token_alias_is_accepted() {
        let mut env = base_env();
        env.remove("NEWS_API_TOKEN");
        env.insert("APIFY_API_TOKEN", "apify");
        assert_eq!(build(&env).unwrap().news.token, "apify");
    }

    #[test]
    fn missing_required_values_abort() {
        for key in ["NEWS_API_TOKEN", "GEMINI_API_KEY", "WP_BASE_URL", "WP_USERNAME", "WP_APP_PASSWORD"] {
            let mut env = base_env();
            env.remove(key);
            let err = build(&env).unwrap_err().to_string();
            assert!(err.contains(key), "expected {key} in error, got {err}");
        }

        let mut env = base_env();
        env.insert("GEMINI_API_KEY", "   ");
        assert!(build(&env).is_err(), "blank values count as missing");
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut env = base_env();
        env.insert("MAX_ARTICLES", "ten");
        assert!(build(&env).unwrap_err().to_string().contains("MAX_ARTICLES"));

        let mut env = base_env();
        env.insert("TARGET_LANGUAGE", "xx");
        assert!(build(&env).is_err());

        let mut env = base_env();
        env.insert("VALIDATE_LANGUAGE", "maybe");
        assert!(build(&env).is_err());
    }

    #[test]
    fn facebook_needs_page_and_token() {
        let mut env = base_env();
        env.insert("FB_PAGE_ID", "123");
        assert!(!build(&env).unwrap().facebook.is_configured());
        env.insert("FB_USER_TOKEN", "long-lived");
        assert!(build(&env).unwrap().facebook.is_configured());
    }
}
