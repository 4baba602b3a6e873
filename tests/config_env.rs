// tests/config_env.rs
// Config::from_env reads the real process environment, so these run serially.
use std::env;

use cryptonews_relay::Config;
use serial_test::serial;

const REQUIRED: [(&str, &str); 5] = [
    ("NEWS_API_TOKEN", "tok"),
    ("GEMINI_API_KEY", "gem"),
    ("WP_BASE_URL", "https://cms.example"),
    ("WP_USERNAME", "editor"),
    ("WP_APP_PASSWORD", "pass"),
];

const OPTIONAL: [&str; 6] = [
    "APIFY_API_TOKEN",
    "MAX_ARTICLES",
    "TARGET_LANGUAGE",
    "VALIDATE_LANGUAGE",
    "LEDGER_PATH",
    "ALLOWLIST_PATH",
];

fn reset() {
    for (k, _) in REQUIRED {
        env::remove_var(k);
    }
    for k in OPTIONAL {
        env::remove_var(k);
    }
}

fn set_required() {
    for (k, v) in REQUIRED {
        env::set_var(k, v);
    }
}

#[test]
#[serial]
fn reads_process_environment() {
    reset();
    set_required();
    env::set_var("MAX_ARTICLES", "4");
    env::set_var("TARGET_LANGUAGE", "spa");
    env::set_var("VALIDATE_LANGUAGE", "false");
    env::set_var("LEDGER_PATH", "/tmp/relay-ledger.json");

    let cfg = Config::from_env().unwrap();
    assert_eq!(cfg.news.max_articles, 4);
    assert_eq!(cfg.translate.target, whatlang::Lang::Spa);
    assert!(!cfg.translate.validate_language);
    assert_eq!(cfg.ledger_path.to_str(), Some("/tmp/relay-ledger.json"));
    reset();
}

#[test]
#[serial]
fn missing_credential_aborts() {
    reset();
    set_required();
    env::remove_var("WP_APP_PASSWORD");
    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("WP_APP_PASSWORD"));
    reset();
}

#[test]
#[serial]
fn allowlist_path_from_environment() {
    reset();
    set_required();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("lists.toml");
    std::fs::write(&p, "cms = [\"example.org\"]\n").unwrap();
    env::set_var("ALLOWLIST_PATH", &p);

    let cfg = Config::from_env().unwrap();
    assert!(cfg.allowlists.cms.allows("example.org"));
    assert_eq!(cfg.allowlists.cms.len(), 1);
    reset();
}
