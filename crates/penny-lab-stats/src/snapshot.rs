use crate::error::Result;
use crate::verdict::Evaluator;
use penny_lab_abstract::{Classification, CounterSnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Deserialize, Debug)]
struct SnapshotDocument {
    #[serde(default)]
    snapshots: Vec<SnapshotEntry>,
}

#[derive(Deserialize, Debug)]
struct SnapshotEntry {
    counters: CounterSnapshot,
}

/// Pull every counter snapshot out of a JSON snapshot document.
/// Documents without a `snapshots` array yield nothing.
pub fn parse_snapshots(text: &str) -> Result<Vec<CounterSnapshot>> {
    let doc: SnapshotDocument = serde_json::from_str(text)?;
    Ok(doc.snapshots.into_iter().map(|entry| entry.counters).collect())
}

/// One evaluated drop event, positioned by its packet counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccuracyPoint {
    pub droppable: u64,
    pub dropped: u64,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tallies {
    #[serde(rename = "closed-loop")]
    pub closed_loop: usize,
    pub spoofed: usize,
    #[serde(rename = "duplicateExceeded")]
    pub duplicate_exceeded: usize,
    #[serde(rename = "no-decision")]
    pub no_decision: usize,
}

impl Tallies {
    pub fn count(&self, class: Classification) -> usize {
        match class {
            Classification::ClosedLoop => self.closed_loop,
            Classification::Spoofed => self.spoofed,
            Classification::DuplicateExceeded => self.duplicate_exceeded,
            Classification::NoDecision => self.no_decision,
        }
    }

    fn bump(&mut self, class: Classification) {
        let slot = match class {
            Classification::ClosedLoop => &mut self.closed_loop,
            Classification::Spoofed => &mut self.spoofed,
            Classification::DuplicateExceeded => &mut self.duplicate_exceeded,
            Classification::NoDecision => &mut self.no_decision,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        Classification::ALL.iter().map(|c| self.count(*c)).sum()
    }
}

/// Every evaluated drop event plus how often each verdict came up.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub points: Vec<AccuracyPoint>,
    pub tallies: Tallies,
}

impl AccuracyReport {
    pub fn record(&mut self, snapshot: &CounterSnapshot, classification: Classification) {
        self.points.push(AccuracyPoint {
            droppable: snapshot.droppable_pkts,
            dropped: snapshot.dropped_pkts,
            classification,
        });
        self.tallies.bump(classification);
    }

    pub fn extend(&mut self, other: AccuracyReport) {
        for point in other.points {
            self.tallies.bump(point.classification);
            self.points.push(point);
        }
    }
}

pub fn assess_snapshots<'a, I>(evaluator: &Evaluator, snapshots: I) -> AccuracyReport
where
    I: IntoIterator<Item = &'a CounterSnapshot>,
{
    let mut report = AccuracyReport::default();
    for snapshot in snapshots {
        let class = evaluator.classify(snapshot);
        debug!("Evaluated drop event {:?} -> {}", snapshot, class);
        report.record(snapshot, class);
    }
    report
}
