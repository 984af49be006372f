use crate::config::AnalysisConfig;
use serde::Deserialize;

/// An analysis profile loaded from TOML: tuning overrides plus the rules
/// that sort result files into comparison groups.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AnalysisProfile {
    #[serde(default)]
    pub config: ConfigOverride,
    /// Only files whose name contains this text are considered for grouping.
    pub file_prefix: Option<String>,
    #[serde(default)]
    pub groups: Vec<GroupRule>,
}

impl AnalysisProfile {
    /// Defaults with this profile's overrides applied.
    pub fn resolve(&self) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        self.config.apply_to(&mut config);
        config
    }

    /// Label of the first rule whose pattern occurs in `file_name`.
    pub fn group_for(&self, file_name: &str) -> Option<&str> {
        let prefix = self.file_prefix.as_deref().unwrap_or("perf_");
        if !file_name.contains(prefix) {
            return None;
        }
        self.groups
            .iter()
            .find(|rule| file_name.contains(&rule.pattern))
            .map(|rule| rule.label.as_str())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct GroupRule {
    pub label: String,
    pub pattern: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConfigOverride {
    pub control_port_start: Option<u16>,
    pub control_port_end: Option<u16>,
    pub duplicate_threshold: Option<f64>,
    pub closed_loop_threshold: Option<f64>,
    pub spoofed_threshold: Option<f64>,
    pub closed_loop_base_rate: Option<f64>,
    pub min_droppable_pkts: Option<u64>,
    pub min_packet_drops: Option<u64>,
    pub segment_size: Option<u32>,
    pub ack_offset: Option<u32>,
}

impl ConfigOverride {
    pub fn apply_to(&self, config: &mut AnalysisConfig) {
        if let Some(v) = self.control_port_start {
            config.trace.control_ports.start = v;
        }
        if let Some(v) = self.control_port_end {
            config.trace.control_ports.end = v;
        }
        if let Some(v) = self.duplicate_threshold {
            config.verdict.duplicate_threshold = v;
        }
        if let Some(v) = self.closed_loop_threshold {
            config.verdict.closed_loop_threshold = v;
        }
        if let Some(v) = self.spoofed_threshold {
            config.verdict.spoofed_threshold = v;
        }
        if let Some(v) = self.closed_loop_base_rate {
            config.verdict.closed_loop_base_rate = v;
        }
        if let Some(v) = self.min_droppable_pkts {
            config.verdict.min_droppable_pkts = v;
        }
        if let Some(v) = self.min_packet_drops {
            config.verdict.min_packet_drops = v;
        }
        if let Some(v) = self.segment_size {
            config.completion.segment_size = v;
        }
        if let Some(v) = self.ack_offset {
            config.completion.ack_offset = v;
        }
    }
}
