//! Flow reconstruction from ns-3 ASCII packet traces.

pub mod completion;
pub mod decoder;
pub mod error;
pub mod reconstructor;
pub mod record;
pub mod table;

pub use completion::{CompletionSamples, completion_time, completion_times};
pub use decoder::{LineKind, TraceLine, decode_line};
pub use error::{DecodeError, RecordError, Result, TraceError};
pub use reconstructor::{
    FlowReconstructor, IngestSummary, LineOutcome, UnmatchedAck, check_config, reconstruct,
};
pub use record::{format_flow_record, parse_flow_record, read_flow_records};
pub use table::FlowTable;
