//! Drop-event classification and distribution summaries.

pub mod ecdf;
pub mod error;
pub mod snapshot;
pub mod verdict;

pub use ecdf::{Ecdf, GroupEcdf, SampleGroup, aggregate, ecdf};
pub use error::{Result, StatsError};
pub use snapshot::{AccuracyPoint, AccuracyReport, Tallies, assess_snapshots, parse_snapshots};
pub use verdict::{Assessment, Evaluator, classify, duplicate_factor};
