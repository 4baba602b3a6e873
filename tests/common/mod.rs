// tests/common/mod.rs
// Shared helpers: in-process stub servers standing in for the upstream APIs.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Router;
use cryptonews_relay::Config;
use tokio::net::TcpListener;

/// Bind `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{addr}")
}

/// Shared call counter for stub handlers.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    /// Count one call and return the 1-based call number.
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Minimal valid environment; every upstream points at `unused` unless overridden.
pub fn env_with(overrides: &[(&str, &str)]) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = [
        ("NEWS_API_TOKEN", "news-token"),
        ("NEWS_API_URL", "http://127.0.0.1:9/news"),
        ("GEMINI_API_KEY", "gemini-key"),
        ("GEMINI_BASE_URL", "http://127.0.0.1:9"),
        ("WP_BASE_URL", "http://127.0.0.1:9"),
        ("WP_USERNAME", "editor"),
        ("WP_APP_PASSWORD", "app pass"),
        ("FB_GRAPH_URL", "http://127.0.0.1:9"),
        ("TRANSLATE_BACKOFF_MS", "0"),
        ("FEATURED_MEDIA_DELAY_MS", "0"),
        ("ARTICLE_PACING_MS", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        env.insert(k.to_string(), v.to_string());
    }
    env
}

pub fn config(overrides: &[(&str, &str)]) -> Config {
    let env = env_with(overrides);
    Config::from_lookup(|k| env.get(k).cloned()).expect("test config")
}
