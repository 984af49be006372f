use crate::error::{Result, StatsError};
use serde::Serialize;

/// Empirical CDF as aligned step points, starting at probability zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ecdf {
    pub values: Vec<f64>,
    pub probabilities: Vec<f64>,
}

impl Ecdf {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values.iter().copied().zip(self.probabilities.iter().copied())
    }

    /// Fraction of samples at or below `x`.
    pub fn at(&self, x: f64) -> f64 {
        // Skip the synthetic leading point so ties at the minimum count.
        self.points()
            .skip(1)
            .take_while(|(v, _)| *v <= x)
            .last()
            .map_or(0.0, |(_, p)| p)
    }
}

/// Build the empirical CDF of `samples`. The caller's slice is not reordered.
pub fn ecdf(samples: &[f64]) -> Result<Ecdf> {
    if samples.is_empty() {
        return Err(StatsError::EmptySampleSet);
    }
    if let Some(index) = samples.iter().position(|s| s.is_nan()) {
        return Err(StatsError::NanSample { index });
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let total = sorted.len() as f64;
    let mut values = vec![sorted[0]];
    let mut probabilities = vec![0.0];
    let mut seen = 0usize;
    for (i, &value) in sorted.iter().enumerate() {
        seen += 1;
        let last_of_run = sorted.get(i + 1).is_none_or(|next| *next != value);
        if last_of_run {
            values.push(value);
            probabilities.push(seen as f64 / total);
        }
    }

    Ok(Ecdf {
        values,
        probabilities,
    })
}

/// Samples collected under one experiment condition.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGroup {
    pub label: String,
    pub samples: Vec<f64>,
}

impl SampleGroup {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            samples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEcdf {
    pub label: String,
    pub sample_count: usize,
    #[serde(flatten)]
    pub ecdf: Ecdf,
}

/// One ECDF per group, in group order. Any empty group fails the call.
pub fn aggregate(groups: &[SampleGroup]) -> Result<Vec<GroupEcdf>> {
    groups
        .iter()
        .map(|group| {
            let ecdf = ecdf(&group.samples).map_err(|err| match err {
                StatsError::EmptySampleSet => StatsError::EmptyGroup(group.label.clone()),
                other => other,
            })?;
            Ok(GroupEcdf {
                label: group.label.clone(),
                sample_count: group.samples.len(),
                ecdf,
            })
        })
        .collect()
}
