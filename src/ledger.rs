//! Ledger of published articles, keyed by original URL.
//!
//! Read in full at start (absent/unreadable file => empty), rewritten in full
//! at the end of a run via temp file + rename. Single writer assumed; no lock.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::publish::SinkStatus;

/// Field the entry list is stored under.
pub const LIST_KEY: &str = "all_news";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(alias = "link")]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub caption: String,
    /// Rehosted image URL (or the original one when rehosting failed).
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub wp_status: SinkStatus,
    #[serde(default)]
    pub fb_status: SinkStatus,
    /// `Posted` when any sink posted.
    #[serde(default)]
    pub status: SinkStatus,
    #[serde(default)]
    pub sentiment: Option<String>,
    /// Publish time reported by the source, if any.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// When the relay processed the article.
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn any_posted(&self) -> bool {
        self.wp_status.is_posted() || self.fb_status.is_posted()
    }

    /// Recompute `status` from the per-sink statuses.
    pub fn with_overall_status(mut self) -> Self {
        self.status = if self.any_posted() {
            SinkStatus::Posted
        } else if self.wp_status == SinkStatus::Failed || self.fb_status == SinkStatus::Failed {
            SinkStatus::Failed
        } else {
            SinkStatus::Skipped
        };
        self
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URLs already published. Never fails: unreadable or invalid => empty.
    pub fn load(&self) -> HashSet<String> {
        let entries = read_entries(&self.path).unwrap_or_else(|reason| {
            tracing::warn!(%reason, path = %self.path.display(), "ledger unreadable, starting empty");
            Vec::new()
        });
        let urls: HashSet<String> = entries
            .iter()
            .filter_map(entry_url)
            .map(str::to_string)
            .collect();
        tracing::info!(path = %self.path.display(), count = urls.len(), "ledger loaded");
        urls
    }

    /// Merge `entries` into the file. Skips URLs already present and entries
    /// with no `Posted` sink. Returns how many were added. An unreadable file
    /// is moved aside before the new one is written.
    pub fn record(&self, entries: &[LedgerEntry]) -> Result<usize> {
        let (mut existing, unreadable) = match read_entries(&self.path) {
            Ok(v) => (v, false),
            Err(reason) => {
                tracing::warn!(%reason, path = %self.path.display(), "ledger unreadable");
                (Vec::new(), true)
            }
        };
        let mut seen: HashSet<String> = existing
            .iter()
            .filter_map(entry_url)
            .map(str::to_string)
            .collect();

        let mut added = 0usize;
        for entry in entries {
            if !entry.any_posted() {
                tracing::debug!(url = %entry.url, "not ledgered: nothing posted");
                continue;
            }
            if !seen.insert(entry.url.clone()) {
                tracing::debug!(url = %entry.url, "not ledgered: already present");
                continue;
            }
            let value = serde_json::to_value(entry.clone().with_overall_status())
                .context("serializing ledger entry")?;
            existing.push(value);
            added += 1;
        }

        if added == 0 {
            tracing::info!(path = %self.path.display(), "ledger unchanged");
            return Ok(0);
        }

        if unreadable {
            let aside = self.quarantine()?;
            tracing::warn!(path = %self.path.display(), moved_to = %aside.display(), "unreadable ledger moved aside");
        }

        let mut doc = Map::new();
        doc.insert(LIST_KEY.to_string(), Value::Array(existing));
        write_atomic(&self.path, &Value::Object(doc))
            .with_context(|| format!("writing ledger {}", self.path.display()))?;

        counter!("relay_ledger_written_total").increment(added as u64);
        tracing::info!(path = %self.path.display(), added, "ledger updated");
        Ok(added)
    }

    /// Rename the current file to `<name>.corrupt-<unix ts>`.
    fn quarantine(&self) -> Result<PathBuf> {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".corrupt-{}", Utc::now().timestamp()));
        let aside = self.path.with_file_name(name);
        fs::rename(&self.path, &aside)
            .with_context(|| format!("moving unreadable ledger {} aside", self.path.display()))?;
        Ok(aside)
    }
}

/// Raw entries from either a bare list or an object holding one. A missing
/// file is empty; `Err` carries why an existing file could not be used.
fn read_entries(path: &Path) -> std::result::Result<Vec<Value>, String> {
    let s = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.to_string()),
    };
    match serde_json::from_str::<Value>(&s) {
        Ok(Value::Array(v)) => Ok(v),
        Ok(Value::Object(mut obj)) => {
            if let Some(Value::Array(v)) = obj.remove(LIST_KEY) {
                return Ok(v);
            }
            Ok(obj
                .into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(a) => Some(a),
                    _ => None,
                })
                .unwrap_or_default())
        }
        Ok(other) => Err(format!("expected a list or object, found {other}")),
        Err(e) => Err(e.to_string()),
    }
}

fn entry_url(v: &Value) -> Option<&str> {
    let obj = v.as_object()?;
    obj.get("url")
        .or_else(|| obj.get("link"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn write_atomic(path: &Path, value: &Value) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    f.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}
