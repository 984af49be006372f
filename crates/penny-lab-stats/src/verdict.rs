//! Closed-loop versus spoofed hypothesis test for a single drop event.
//!
//! Under the closed-loop hypothesis every dropped packet that was never seen
//! again is noise with probability `closed_loop_base_rate`. Under the
//! spoofed hypothesis every dropped packet that was retransmitted anyway
//! shows up with the duplicate rate `f_dup`. The posterior of the closed-loop
//! hypothesis is compared strictly against both thresholds. When both raw
//! likelihoods underflow, the ratio is taken after rescaling in log space.

use crate::error::{Result, StatsError};
use penny_lab_abstract::{Classification, CounterSnapshot, VerdictConfig};
use serde::Serialize;

/// Classification plus the numbers it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assessment {
    pub classification: Classification,
    /// `None` when there were no undropped droppable packets to rate.
    pub duplicate_factor: Option<f64>,
    /// Posterior of the closed-loop hypothesis, when the test was run.
    pub posterior: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    config: VerdictConfig,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::from_valid(VerdictConfig::default())
    }
}

impl Evaluator {
    pub fn new(config: VerdictConfig) -> Result<Self> {
        validate(&config)?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: VerdictConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerdictConfig {
        &self.config
    }

    pub fn classify(&self, snapshot: &CounterSnapshot) -> Classification {
        self.assess(snapshot).classification
    }

    pub fn assess(&self, snapshot: &CounterSnapshot) -> Assessment {
        let undecided = Assessment {
            classification: Classification::NoDecision,
            duplicate_factor: None,
            posterior: None,
        };
        // Zero disables either minimum.
        if snapshot.droppable_pkts < self.config.min_droppable_pkts
            || snapshot.dropped_pkts < self.config.min_packet_drops
        {
            return undecided;
        }
        let Some(f_dup) = duplicate_factor(snapshot) else {
            return undecided;
        };

        if f_dup > self.config.duplicate_threshold {
            return Assessment {
                classification: Classification::DuplicateExceeded,
                duplicate_factor: Some(f_dup),
                posterior: None,
            };
        }

        let posterior = closed_loop_posterior(
            self.config.closed_loop_base_rate,
            snapshot.not_seen_dropped_pkts,
            f_dup,
            snapshot.retransmitted_dropped_pkts,
        );
        let classification = if posterior > self.config.closed_loop_threshold {
            Classification::ClosedLoop
        } else if posterior < self.config.spoofed_threshold {
            Classification::Spoofed
        } else {
            Classification::NoDecision
        };

        Assessment {
            classification,
            duplicate_factor: Some(f_dup),
            posterior: Some(posterior),
        }
    }
}

/// Classify with the stock thresholds.
pub fn classify(snapshot: &CounterSnapshot) -> Classification {
    Evaluator::default().classify(snapshot)
}

/// Fraction of undropped droppable packets that came back as duplicates.
///
/// With no duplicates at all this is `1 / denom` rather than zero. That
/// substitute is a heuristic, not a derived estimate; it keeps `ln(f_dup)`
/// finite and matches the established results.
pub fn duplicate_factor(snapshot: &CounterSnapshot) -> Option<f64> {
    let denom = snapshot
        .droppable_pkts
        .checked_sub(snapshot.dropped_pkts)
        .filter(|d| *d > 0)? as f64;
    let duplicates = match snapshot.duplicate_pkts {
        0 => 1.0,
        n => n as f64,
    };
    Some(duplicates / denom)
}

fn validate(config: &VerdictConfig) -> Result<()> {
    let unit = [
        ("closed_loop_base_rate", config.closed_loop_base_rate),
        ("closed_loop_threshold", config.closed_loop_threshold),
        ("spoofed_threshold", config.spoofed_threshold),
    ];
    for (field, value) in unit {
        if !(value > 0.0 && value < 1.0) {
            return Err(StatsError::OutOfUnitRange { field, value });
        }
    }
    if !(config.duplicate_threshold > 0.0 && config.duplicate_threshold.is_finite()) {
        return Err(StatsError::BadDuplicateThreshold(config.duplicate_threshold));
    }
    if config.spoofed_threshold >= config.closed_loop_threshold {
        return Err(StatsError::InvertedThresholds {
            spoofed: config.spoofed_threshold,
            closed_loop: config.closed_loop_threshold,
        });
    }
    Ok(())
}

/// `H_c / (H_c + H_s)` with `H_c = base^not_seen` and `H_s = f_dup^retransmitted`.
///
/// Computed directly while the sum is a normal float, so threshold ties are
/// decided on the same value the plain formula gives. Otherwise both
/// log-likelihoods are shifted by their maximum first, which keeps one term
/// at exactly 1 and rules out 0/0.
fn closed_loop_posterior(base: f64, not_seen: u64, f_dup: f64, retransmitted: u64) -> f64 {
    let closed = base.powf(not_seen as f64);
    let spoofed = f_dup.powf(retransmitted as f64);
    let sum = closed + spoofed;
    if sum.is_normal() {
        return closed / sum;
    }
    // A zero exponent contributes exactly 0.
    let ln_closed = base.ln() * not_seen as f64;
    let ln_spoofed = f_dup.ln() * retransmitted as f64;
    let top = ln_closed.max(ln_spoofed);
    let closed = (ln_closed - top).exp();
    let spoofed = (ln_spoofed - top).exp();
    closed / (closed + spoofed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(
        droppable: u64,
        dropped: u64,
        duplicate: u64,
        not_seen: u64,
        retransmitted: u64,
    ) -> CounterSnapshot {
        CounterSnapshot {
            droppable_pkts: droppable,
            dropped_pkts: dropped,
            duplicate_pkts: duplicate,
            not_seen_dropped_pkts: not_seen,
            retransmitted_dropped_pkts: retransmitted,
        }
    }

    #[test]
    fn no_undropped_packets_means_no_decision() {
        assert_eq!(classify(&snapshot(10, 10, 0, 3, 3)), Classification::NoDecision);
        assert_eq!(classify(&snapshot(0, 0, 0, 0, 0)), Classification::NoDecision);
        assert_eq!(classify(&snapshot(5, 9, 0, 0, 4)), Classification::NoDecision);
    }

    #[test]
    fn duplicate_rate_check_comes_first() {
        let s = snapshot(100, 0, 20, 0, 5);
        assert_eq!(duplicate_factor(&s), Some(0.2));
        assert_eq!(classify(&s), Classification::DuplicateExceeded);
    }

    #[test]
    fn unseen_drops_point_to_spoofing() {
        let s = snapshot(100, 50, 1, 10, 0);
        assert_eq!(duplicate_factor(&s), Some(0.02));
        let a = Evaluator::default().assess(&s);
        assert_eq!(a.classification, Classification::Spoofed);
        assert!(a.posterior.unwrap() < 1e-10);
    }

    #[test]
    fn retransmitted_drops_point_to_closed_loop() {
        let a = Evaluator::default().assess(&snapshot(100, 50, 1, 0, 10));
        assert_eq!(a.classification, Classification::ClosedLoop);
        assert!(a.posterior.unwrap() > 1.0 - 1e-10);
    }

    #[test]
    fn no_drop_evidence_is_a_coin_flip() {
        let a = Evaluator::default().assess(&snapshot(100, 50, 1, 0, 0));
        assert_eq!(a.classification, Classification::NoDecision);
        assert_eq!(a.posterior, Some(0.5));
    }

    #[test]
    fn zero_duplicates_use_the_reciprocal_substitute() {
        assert_eq!(duplicate_factor(&snapshot(20, 10, 0, 0, 0)), Some(0.1));
        // Few undropped packets push the substitute over the threshold.
        assert_eq!(classify(&snapshot(15, 10, 0, 0, 3)), Classification::DuplicateExceeded);
    }

    #[test]
    fn huge_counts_do_not_underflow() {
        let s = snapshot(10_000, 5_000, 100, 1_000, 1_000);
        // Both raw likelihoods are 0.0 in f64, the ratio is not.
        assert_eq!(0.05f64.powi(1_000), 0.0);
        assert_eq!(0.02f64.powi(1_000), 0.0);
        assert_eq!(classify(&s), Classification::ClosedLoop);

        let s = snapshot(10_000, 5_000, 400, 2_000, 1_000);
        assert_eq!(classify(&s), Classification::Spoofed);
    }

    #[test]
    fn agrees_with_the_direct_formula_on_small_counts() {
        let eval = Evaluator::default();
        for not_seen in 0..8 {
            for retransmitted in 0..8 {
                let s = snapshot(60, 10, 3, not_seen, retransmitted);
                let f_dup: f64 = 3.0 / 50.0;
                let h1 = 0.05f64.powf(not_seen as f64);
                let h2 = f_dup.powf(retransmitted as f64);
                let direct = h1 / (h1 + h2);
                let a = eval.assess(&s);
                assert!((a.posterior.unwrap() - direct).abs() < 1e-12);
                let expected = if direct > 0.99 {
                    Classification::ClosedLoop
                } else if direct < 0.01 {
                    Classification::Spoofed
                } else {
                    Classification::NoDecision
                };
                assert_eq!(a.classification, expected, "{not_seen}/{retransmitted}");
            }
        }
    }

    #[test]
    fn posterior_equal_to_a_threshold_is_no_decision() {
        // f_dup = 1/99, so H_c / (H_c + H_s) = 1 / (1 + 1/99) = 0.99.
        let s = snapshot(149, 50, 1, 0, 1);
        let a = Evaluator::default().assess(&s);
        assert_eq!(a.posterior, Some(0.99));
        assert_eq!(a.classification, Classification::NoDecision);

        let coin_flip = snapshot(100, 50, 1, 0, 0);
        let spoofed_at_half = Evaluator::new(VerdictConfig {
            spoofed_threshold: 0.5,
            ..VerdictConfig::default()
        })
        .unwrap();
        assert_eq!(spoofed_at_half.classify(&coin_flip), Classification::NoDecision);

        let closed_at_half = Evaluator::new(VerdictConfig {
            closed_loop_threshold: 0.5,
            ..VerdictConfig::default()
        })
        .unwrap();
        assert_eq!(closed_at_half.classify(&coin_flip), Classification::NoDecision);
    }

    #[test]
    fn minimum_counts_gate_the_test() {
        let s = snapshot(100, 50, 1, 0, 10);
        assert_eq!(classify(&s), Classification::ClosedLoop);

        let few_droppable = Evaluator::new(VerdictConfig {
            min_droppable_pkts: 101,
            ..VerdictConfig::default()
        })
        .unwrap();
        let a = few_droppable.assess(&s);
        assert_eq!(a.classification, Classification::NoDecision);
        assert_eq!(a.duplicate_factor, None);
        assert_eq!(a.posterior, None);

        let few_drops = Evaluator::new(VerdictConfig {
            min_packet_drops: 51,
            ..VerdictConfig::default()
        })
        .unwrap();
        assert_eq!(few_drops.classify(&s), Classification::NoDecision);

        // Reaching the minimum exactly is enough.
        let met = Evaluator::new(VerdictConfig {
            min_droppable_pkts: 100,
            min_packet_drops: 50,
            ..VerdictConfig::default()
        })
        .unwrap();
        assert_eq!(met.classify(&s), Classification::ClosedLoop);
    }

    #[test]
    fn thresholds_are_configurable() {
        let strict = Evaluator::new(VerdictConfig {
            duplicate_threshold: 0.01,
            ..VerdictConfig::default()
        })
        .unwrap();
        assert_eq!(
            strict.classify(&snapshot(100, 50, 1, 0, 10)),
            Classification::DuplicateExceeded
        );
    }

    #[test]
    fn rejects_unusable_config() {
        let bad_rate = VerdictConfig {
            closed_loop_base_rate: 1.0,
            ..VerdictConfig::default()
        };
        assert!(matches!(
            Evaluator::new(bad_rate),
            Err(StatsError::OutOfUnitRange { field: "closed_loop_base_rate", .. })
        ));

        let inverted = VerdictConfig {
            closed_loop_threshold: 0.2,
            spoofed_threshold: 0.8,
            ..VerdictConfig::default()
        };
        assert!(matches!(
            Evaluator::new(inverted),
            Err(StatsError::InvertedThresholds { .. })
        ));

        let nan = VerdictConfig {
            duplicate_threshold: f64::NAN,
            ..VerdictConfig::default()
        };
        assert!(matches!(
            Evaluator::new(nan),
            Err(StatsError::BadDuplicateThreshold(_))
        ));
    }
}
