// src/publish/mod.rs
pub mod facebook;
pub mod wordpress;

use metrics::counter;
use serde::{Deserialize, Serialize};

/// Per-sink outcome recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SinkStatus {
    /// Not attempted (not eligible, not configured, dry run, or token unavailable).
    #[default]
    Skipped,
    Posted,
    Failed,
}

impl SinkStatus {
    pub fn is_posted(self) -> bool {
        self == SinkStatus::Posted
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SinkStatus::Skipped => "Skipped",
            SinkStatus::Posted => "Posted",
            SinkStatus::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Cms,
    Social,
}

impl Sink {
    pub fn as_str(self) -> &'static str {
        match self {
            Sink::Cms => "cms",
            Sink::Social => "social",
        }
    }
}

pub(crate) fn record_outcome(sink: Sink, status: SinkStatus) {
    counter!("relay_publish_total", "sink" => sink.as_str(), "status" => status.as_str()).increment(1);
}
