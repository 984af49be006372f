use serde::{Deserialize, Serialize};

/// Inclusive band of ports reserved for coordination traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    /// `start > end` matches no port at all.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Lines touching a port in this range are never part of a measured flow.
    pub control_ports: PortRange,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            control_ports: PortRange::new(20000, 21000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictConfig {
    /// Duplicate rate above which the drop evidence is not trusted.
    pub duplicate_threshold: f64,
    /// Posterior above which a drop event is closed-loop.
    pub closed_loop_threshold: f64,
    /// Posterior below which a drop event is spoofed.
    pub spoofed_threshold: f64,
    /// Chance that a dropped packet goes unseen by noise alone.
    pub closed_loop_base_rate: f64,
    /// Fewer droppable packets than this is no decision. Zero turns it off.
    #[serde(default)]
    pub min_droppable_pkts: u64,
    /// Fewer dropped packets than this is no decision. Zero turns it off.
    #[serde(default)]
    pub min_packet_drops: u64,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.15,
            closed_loop_threshold: 0.99,
            spoofed_threshold: 0.01,
            closed_loop_base_rate: 0.05,
            min_droppable_pkts: 0,
            min_packet_drops: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Payload bytes per data packet.
    pub segment_size: u32,
    /// Sequence space consumed outside of payload (SYN and FIN).
    pub ack_offset: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            segment_size: 1024,
            ack_offset: 2,
        }
    }
}

impl CompletionConfig {
    /// Ack number that acknowledges the last byte of the `packets`-th packet.
    pub fn completion_ack(&self, packets: u32) -> Option<u32> {
        packets
            .checked_mul(self.segment_size)?
            .checked_add(self.ack_offset)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub trace: TraceConfig,
    pub verdict: VerdictConfig,
    pub completion: CompletionConfig,
}
