// tests/allowlist_config.rs
// Allow-list files reached through the run configuration.
mod common;

use std::fs;

use common::env_with;
use cryptonews_relay::config::allowlist::{load_allowlists, AllowLists};
use cryptonews_relay::Config;

fn config_with_allowlist(path: &str) -> anyhow::Result<Config> {
    let env = env_with(&[("ALLOWLIST_PATH", path)]);
    Config::from_lookup(|k| env.get(k).cloned())
}

#[test]
fn toml_file_replaces_both_lists() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("allowlist.toml");
    fs::write(
        &p,
        "cms = [\"CoinDesk.com\", \"www.decrypt.co\"]\nsocial = [\"theblock.co\"]\n",
    )
    .unwrap();

    let cfg = config_with_allowlist(p.to_str().unwrap()).unwrap();
    let cms: Vec<&str> = cfg.allowlists.cms.iter().collect();
    assert_eq!(cms, vec!["coindesk.com", "decrypt.co"]);
    assert!(cfg.allowlists.social.allows("theblock.co"));
    assert!(!cfg.allowlists.social.allows("coindesk.com"));
}

#[test]
fn json_file_with_one_list_keeps_other_default() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("allowlist.json");
    fs::write(&p, r#"{ "social": [] }"#).unwrap();

    let cfg = config_with_allowlist(p.to_str().unwrap()).unwrap();
    assert!(cfg.allowlists.social.is_empty());
    assert_eq!(cfg.allowlists.cms, AllowLists::default().cms);
}

#[test]
fn missing_override_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("absent.toml");
    let err = config_with_allowlist(p.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("ALLOWLIST_PATH"));
}

#[test]
fn malformed_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("allowlist.toml");
    fs::write(&p, "cms = [unterminated").unwrap();
    assert!(config_with_allowlist(p.to_str().unwrap()).is_err());
}

#[test]
fn defaults_when_no_file_present() {
    // the crate ships no config/allowlist.{toml,json}
    let lists = load_allowlists(None).unwrap();
    assert!(lists.cms.allows("coindesk.com"));
    assert!(lists.social.allows("coindesk.com"));
    assert!(lists.cms.len() >= lists.social.len());
}
