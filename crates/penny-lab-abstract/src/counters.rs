use serde::{Deserialize, Serialize};
use std::fmt;

/// Evidence gathered at one drop decision point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub droppable_pkts: u64,
    pub dropped_pkts: u64,
    pub duplicate_pkts: u64,
    pub not_seen_dropped_pkts: u64,
    pub retransmitted_dropped_pkts: u64,
}

/// Verdict on a single drop event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    /// Drops were answered the way a real congestion-controlled host would.
    #[serde(rename = "closed-loop")]
    ClosedLoop,
    /// Drops were ignored the way injected traffic would ignore them.
    #[serde(rename = "spoofed")]
    Spoofed,
    /// Too many duplicates to trust the drop evidence.
    #[serde(rename = "duplicateExceeded")]
    DuplicateExceeded,
    #[serde(rename = "no-decision")]
    NoDecision,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Classification::ClosedLoop,
        Classification::Spoofed,
        Classification::DuplicateExceeded,
        Classification::NoDecision,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Classification::ClosedLoop => "closed-loop",
            Classification::Spoofed => "spoofed",
            Classification::DuplicateExceeded => "duplicateExceeded",
            Classification::NoDecision => "no-decision",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
