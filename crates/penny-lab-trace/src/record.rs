//! Tab-separated interchange format for reconstructed flows:
//! `<flowKey>\t{"s": <start>, "acks": {<ack>: <timestamp>, ...}}`.

use crate::error::{RecordError, Result, TraceError};
use crate::table::FlowTable;
use penny_lab_abstract::{FlowKey, FlowRecord};

pub fn format_flow_record(key: FlowKey, record: &FlowRecord) -> Result<String> {
    let json =
        serde_json::to_string(record).map_err(|source| TraceError::Serialize { key, source })?;
    Ok(format!("{key}\t{json}"))
}

pub fn parse_flow_record(line: &str) -> std::result::Result<(FlowKey, FlowRecord), RecordError> {
    let (key_text, json) = line
        .trim_end_matches(['\r', '\n'])
        .split_once('\t')
        .ok_or(RecordError::MissingTab)?;
    let key = FlowKey::parse(key_text).ok_or_else(|| RecordError::BadKey(key_text.to_string()))?;
    let record = serde_json::from_str(json)?;
    Ok((key, record))
}

/// Read every record in `text`. Blank lines are skipped; repeated keys are
/// folded together first-write-wins.
pub fn read_flow_records(text: &str) -> Result<FlowTable> {
    let mut table = FlowTable::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (key, record) =
            parse_flow_record(line).map_err(|source| TraceError::Record { line: idx + 1, source })?;
        table.absorb(key, record);
    }
    Ok(table)
}

impl FlowTable {
    /// The whole table in interchange form, one line per flow.
    pub fn to_records_string(&self) -> Result<String> {
        let mut out = String::new();
        for (key, record) in self.iter() {
            out.push_str(&format_flow_record(*key, record)?);
            out.push('\n');
        }
        Ok(out)
    }
}
