use crate::decoder::{LineKind, decode_line};
use crate::error::{Result, TraceError};
use crate::table::FlowTable;
use penny_lab_abstract::{FlowKey, TraceConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What a single ingested line did to the flow table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// No TCP header, or a TCP event outside the flow vocabulary.
    Ignored,
    /// Touches the reserved control-port range.
    ControlTraffic,
    FlowOpened(FlowKey),
    /// SYN for a flow that is already open.
    RepeatedSyn(FlowKey),
    AckRecorded { key: FlowKey, ack: u32 },
    /// Ack number already on the timeline; first timestamp kept.
    RepeatedAck { key: FlowKey, ack: u32 },
}

/// An ack that arrived for a flow whose SYN was never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnmatchedAck {
    pub line: usize,
    pub key: FlowKey,
    pub ack: u32,
}

/// Per-trace counters gathered while ingesting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub lines: usize,
    pub ignored: usize,
    pub control: usize,
    pub malformed: usize,
    pub flows_opened: usize,
    pub acks_recorded: usize,
    pub repeated_acks: usize,
    pub unmatched: Vec<UnmatchedAck>,
}

/// Builds ACK timelines for every flow in one trace.
///
/// One instance per trace; tables from independent traces are combined with
/// [`FlowTable::merge`].
pub struct FlowReconstructor {
    config: TraceConfig,
    table: FlowTable,
    summary: IngestSummary,
}

impl FlowReconstructor {
    pub fn new(config: TraceConfig) -> Self {
        Self {
            config,
            table: FlowTable::new(),
            summary: IngestSummary::default(),
        }
    }

    pub fn table(&self) -> &FlowTable {
        &self.table
    }

    pub fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    /// Apply one trace line.
    ///
    /// Malformed lines and unmatched acks are returned as errors carrying
    /// the line number; the reconstructor stays usable afterwards.
    pub fn ingest(&mut self, line: &str) -> Result<LineOutcome> {
        self.summary.lines += 1;
        let line_no = self.summary.lines;

        let decoded = match decode_line(line) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => {
                self.summary.ignored += 1;
                return Ok(LineOutcome::Ignored);
            }
            Err(source) => {
                self.summary.malformed += 1;
                return Err(TraceError::MalformedLine {
                    line: line_no,
                    source,
                });
            }
        };

        let ports = self.config.control_ports;
        if ports.contains(decoded.src_port) || ports.contains(decoded.dst_port) {
            self.summary.control += 1;
            return Ok(LineOutcome::ControlTraffic);
        }

        match (decoded.kind, decoded.ack) {
            (LineKind::Send, _) if decoded.is_syn() => {
                let key = decoded.send_key();
                if self.table.open(key, decoded.timestamp) {
                    self.summary.flows_opened += 1;
                    debug!("Opened flow {} at {}", key, decoded.timestamp);
                    Ok(LineOutcome::FlowOpened(key))
                } else {
                    Ok(LineOutcome::RepeatedSyn(key))
                }
            }
            (LineKind::Receive, Some(ack)) => {
                let key = decoded.receive_key();
                let Some(record) = self.table.get_mut(&key) else {
                    self.summary.unmatched.push(UnmatchedAck {
                        line: line_no,
                        key,
                        ack,
                    });
                    return Err(TraceError::UnmatchedAck {
                        line: line_no,
                        key,
                        ack,
                    });
                };
                if record.record_ack(ack, decoded.timestamp) {
                    self.summary.acks_recorded += 1;
                    Ok(LineOutcome::AckRecorded { key, ack })
                } else {
                    self.summary.repeated_acks += 1;
                    Ok(LineOutcome::RepeatedAck { key, ack })
                }
            }
            _ => {
                self.summary.ignored += 1;
                Ok(LineOutcome::Ignored)
            }
        }
    }

    /// Ingest every line, recovering from per-line errors.
    ///
    /// Malformed lines are skipped; unmatched acks are kept in the summary.
    pub fn ingest_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            match self.ingest(line.as_ref()) {
                Ok(_) => {}
                Err(err @ TraceError::MalformedLine { .. }) => debug!("Skipping {}", err),
                Err(err) => warn!("{}", err),
            }
        }
    }

    /// Consume the reconstructor, handing back the finished table.
    pub fn finish(self) -> (FlowTable, IngestSummary) {
        info!(
            "Trace done: {} lines | {} flows | {} acks | {} malformed | {} unmatched acks",
            self.summary.lines,
            self.table.len(),
            self.summary.acks_recorded,
            self.summary.malformed,
            self.summary.unmatched.len()
        );
        (self.table, self.summary)
    }
}

/// Reject trace settings that would silently let control traffic through.
pub fn check_config(config: &TraceConfig) -> Result<()> {
    let ports = config.control_ports;
    if ports.is_empty() {
        return Err(TraceError::EmptyControlRange {
            start: ports.start,
            end: ports.end,
        });
    }
    Ok(())
}

/// Reconstruct all flows of an in-memory trace.
pub fn reconstruct(text: &str, config: TraceConfig) -> (FlowTable, IngestSummary) {
    let mut reconstructor = FlowReconstructor::new(config);
    reconstructor.ingest_lines(text.lines());
    reconstructor.finish()
}
