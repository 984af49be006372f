//! Flow completion times from reconstructed ACK timelines.

use crate::error::{Result, TraceError};
use crate::table::FlowTable;
use penny_lab_abstract::{CompletionConfig, FlowKey, FlowRecord};
use tracing::warn;

/// Seconds between the flow's SYN and the first ack covering `ack`.
pub fn completion_time(key: FlowKey, record: &FlowRecord, ack: u32) -> Result<f64> {
    let done = record
        .ack_time(ack)
        .ok_or(TraceError::MissingCompletionAck { key, ack })?;
    Ok(seconds(key, done)? - seconds(key, &record.start)?)
}

fn seconds(key: FlowKey, text: &str) -> Result<f64> {
    text.parse().map_err(|_| TraceError::BadTimestamp {
        key,
        value: text.to_string(),
    })
}

/// Completion times for every flow in a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionSamples {
    pub samples: Vec<f64>,
    /// Flows that never saw the completion ack, or carried unusable timestamps.
    pub incomplete: Vec<FlowKey>,
}

/// Time for each flow to have `packets` full segments acknowledged.
pub fn completion_times(
    table: &FlowTable,
    config: &CompletionConfig,
    packets: u32,
) -> Result<CompletionSamples> {
    let ack = config
        .completion_ack(packets)
        .ok_or(TraceError::CompletionOverflow { packets })?;

    let mut out = CompletionSamples::default();
    for (key, record) in table.iter() {
        match completion_time(*key, record, ack) {
            Ok(time) => out.samples.push(time),
            Err(err) => {
                warn!("{}", err);
                out.incomplete.push(*key);
            }
        }
    }
    Ok(out)
}
