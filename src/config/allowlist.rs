// src/config/allowlist.rs
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_ALLOWLIST_PATH: &str = "ALLOWLIST_PATH";

const DEFAULT_CMS_DOMAINS: &[&str] = &[
    "coindesk.com",
    "cointelegraph.com",
    "decrypt.co",
    "theblock.co",
    "bitcoinmagazine.com",
    "cryptoslate.com",
    "beincrypto.com",
    "newsbtc.com",
];

const DEFAULT_SOCIAL_DOMAINS: &[&str] = &[
    "coindesk.com",
    "cointelegraph.com",
    "decrypt.co",
    "theblock.co",
];

/// Set of source domains permitted for one sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainAllowList {
    domains: BTreeSet<String>,
}

impl DomainAllowList {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = items
            .into_iter()
            .filter_map(|s| {
                let d = clean_domain(s.as_ref());
                (!d.is_empty()).then_some(d)
            })
            .collect();
        Self { domains }
    }

    /// Exact match on the cleaned domain. The empty domain never matches.
    pub fn allows(&self, domain: &str) -> bool {
        let d = clean_domain(domain);
        !d.is_empty() && self.domains.contains(&d)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }
}

/// The two independent allow-lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowLists {
    pub cms: DomainAllowList,
    pub social: DomainAllowList,
}

impl Default for AllowLists {
    fn default() -> Self {
        Self {
            cms: DomainAllowList::new(DEFAULT_CMS_DOMAINS),
            social: DomainAllowList::new(DEFAULT_SOCIAL_DOMAINS),
        }
    }
}

#[derive(serde::Deserialize)]
struct AllowListFile {
    #[serde(default)]
    cms: Option<Vec<String>>,
    #[serde(default)]
    social: Option<Vec<String>>,
}

/// Load allow-lists from an explicit path. Supports TOML or JSON formats.
/// A list missing from the file keeps its built-in default.
pub fn load_allowlists_from(path: &Path) -> Result<AllowLists> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading allow-lists from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_allowlists(&content, ext.as_str())
}

/// Load allow-lists using an explicit override path + fallbacks:
/// 1) `override_path` (from $ALLOWLIST_PATH)
/// 2) config/allowlist.toml
/// 3) config/allowlist.json
/// 4) built-in defaults
pub fn load_allowlists(override_path: Option<&Path>) -> Result<AllowLists> {
    if let Some(p) = override_path {
        if p.exists() {
            return load_allowlists_from(p);
        }
        return Err(anyhow!(
            "{ENV_ALLOWLIST_PATH} points to non-existent path {}",
            p.display()
        ));
    }
    let toml_p = PathBuf::from("config/allowlist.toml");
    if toml_p.exists() {
        return load_allowlists_from(&toml_p);
    }
    let json_p = PathBuf::from("config/allowlist.json");
    if json_p.exists() {
        return load_allowlists_from(&json_p);
    }
    Ok(AllowLists::default())
}

fn parse_allowlists(s: &str, hint_ext: &str) -> Result<AllowLists> {
    let file: AllowListFile = if hint_ext == "json" {
        serde_json::from_str(s).context("parsing allow-list json")?
    } else {
        match toml::from_str(s) {
            Ok(v) => v,
            Err(toml_err) => serde_json::from_str(s).map_err(|_| {
                anyhow!("unsupported allow-list format (toml error: {toml_err})")
            })?,
        }
    };

    let defaults = AllowLists::default();
    Ok(AllowLists {
        cms: file.cms.map(DomainAllowList::new).unwrap_or(defaults.cms),
        social: file
            .social
            .map(DomainAllowList::new)
            .unwrap_or(defaults.social),
    })
}

fn clean_domain(s: &str) -> String {
    let t = s.trim().to_ascii_lowercase();
    t.strip_prefix("www.").unwrap_or(&t).to_string()
}
