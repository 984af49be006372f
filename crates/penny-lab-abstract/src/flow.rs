use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

/// Direction-normalized identifier of one TCP connection.
///
/// `first` is the port that sent the opening SYN, `second` the port it was
/// addressed to. ACKs travelling back are keyed with their ports swapped so
/// they land on the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub first: u16,
    pub second: u16,
}

impl FlowKey {
    pub fn new(first: u16, second: u16) -> Self {
        Self { first, second }
    }

    /// Key for a packet travelling in the direction that opened the flow.
    pub fn from_send(src_port: u16, dst_port: u16) -> Self {
        Self::new(src_port, dst_port)
    }

    /// Key for a packet travelling back towards the flow's initiator.
    pub fn from_receive(src_port: u16, dst_port: u16) -> Self {
        Self::new(dst_port, src_port)
    }

    /// Parse the textual `<first>-<second>` form.
    pub fn parse(text: &str) -> Option<Self> {
        let (first, second) = text.split_once('-')?;
        Some(Self::new(first.parse().ok()?, second.parse().ok()?))
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

impl Serialize for FlowKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlowKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        FlowKey::parse(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid flow key '{text}'")))
    }
}

/// Start time and first-seen ACK timeline of one flow.
///
/// Timestamps are kept as the exact text found in the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    #[serde(rename = "s")]
    pub start: String,
    pub acks: BTreeMap<u32, String>,
}

impl FlowRecord {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            acks: BTreeMap::new(),
        }
    }

    /// Record `ack` unless it was already seen. Returns whether it was new.
    pub fn record_ack(&mut self, ack: u32, timestamp: impl Into<String>) -> bool {
        match self.acks.entry(ack) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(timestamp.into());
                true
            }
        }
    }

    pub fn ack_time(&self, ack: u32) -> Option<&str> {
        self.acks.get(&ack).map(String::as_str)
    }

    /// Fold another observation of the same flow into this one.
    /// Existing timestamps win; only unseen acks are copied over.
    pub fn absorb(&mut self, other: &FlowRecord) {
        for (ack, ts) in &other.acks {
            self.record_ack(*ack, ts.clone());
        }
    }
}
