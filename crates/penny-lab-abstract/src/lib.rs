pub mod config;
pub mod counters;
pub mod flow;
pub mod profile;

pub use config::{AnalysisConfig, CompletionConfig, PortRange, TraceConfig, VerdictConfig};
pub use counters::{Classification, CounterSnapshot};
pub use flow::{FlowKey, FlowRecord};
pub use profile::{AnalysisProfile, ConfigOverride, GroupRule};
