use penny_lab_abstract::FlowKey;
use thiserror::Error;

/// Why a trace line that carries a TCP header could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing timestamp token")]
    MissingTimestamp,
    #[error("timestamp '{0}' is not a decimal number")]
    BadTimestamp(String),
    #[error("TCP header is not followed by '('")]
    MissingHeaderOpen,
    #[error("TCP header has no ' > ' between ports")]
    MissingPortSeparator,
    #[error("port '{0}' is not a valid port number")]
    BadPort(String),
    #[error("TCP header has no bracketed flags segment")]
    MissingFlags,
    #[error("ack value '{0}' is not a valid sequence number")]
    BadAck(String),
    #[error("'Ack=' is not followed by ' Win='")]
    MissingWindow,
}

/// Why a serialized flow record line could not be read back.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("missing tab between flow key and record")]
    MissingTab,
    #[error("flow key '{0}' is not of the form <port>-<port>")]
    BadKey(String),
    #[error("invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: malformed trace line: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: DecodeError,
    },

    #[error("line {line}: ack {ack} for flow {key} has no recorded SYN")]
    UnmatchedAck { line: usize, key: FlowKey, ack: u32 },

    #[error("line {line}: bad flow record: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error("failed to serialize flow {key}: {source}")]
    Serialize {
        key: FlowKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("flow {key} never saw ack {ack}")]
    MissingCompletionAck { key: FlowKey, ack: u32 },

    #[error("flow {key} has non-numeric timestamp '{value}'")]
    BadTimestamp { key: FlowKey, value: String },

    #[error("packet count {packets} overflows the ack number space")]
    CompletionOverflow { packets: u32 },

    #[error("control port range {start}-{end} is empty (start > end)")]
    EmptyControlRange { start: u16, end: u16 },
}

pub type Result<T> = std::result::Result<T, TraceError>;
