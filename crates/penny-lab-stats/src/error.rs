use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("{field} must lie strictly between 0 and 1, got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("duplicate threshold must be positive, got {0}")]
    BadDuplicateThreshold(f64),

    #[error("spoofed threshold {spoofed} must be below closed-loop threshold {closed_loop}")]
    InvertedThresholds { spoofed: f64, closed_loop: f64 },

    #[error("cannot build a distribution from an empty sample set")]
    EmptySampleSet,

    #[error("group '{0}' has no samples")]
    EmptyGroup(String),

    #[error("sample {index} is NaN")]
    NanSample { index: usize },

    #[error("invalid snapshot document: {0}")]
    Document(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StatsError>;
