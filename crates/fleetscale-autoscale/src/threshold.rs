//! Threshold classification of raw CPU readings.

use fleetscale_core::{Classification, ScalingConfig};

/// Utilization percent from a raw reading with idle-percent semantics.
///
/// Readings above 100 pass through unchanged instead of going negative.
/// Far negative readings saturate at `i64::MAX`.
pub fn utilization(reading: i64) -> i64 {
    if reading <= 100 {
        100i64.saturating_sub(reading)
    } else {
        reading
    }
}

/// Classifies readings against the configured utilization band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdEvaluator {
    min_cpu_utilization: i64,
    max_cpu_utilization: i64,
}

impl ThresholdEvaluator {
    pub fn new(config: &ScalingConfig) -> Self {
        Self {
            min_cpu_utilization: config.min_cpu_utilization,
            max_cpu_utilization: config.max_cpu_utilization,
        }
    }

    /// The upper edge is checked first, so with `max <= min` readings in
    /// the overlap classify as `ScaleUp` and nothing is `Normal`.
    pub fn classify(&self, reading: i64) -> Classification {
        let u = utilization(reading);
        if u >= self.max_cpu_utilization {
            Classification::ScaleUp
        } else if u <= self.min_cpu_utilization {
            Classification::ScaleDown
        } else {
            Classification::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator(min: i64, max: i64) -> ThresholdEvaluator {
        ThresholdEvaluator {
            min_cpu_utilization: min,
            max_cpu_utilization: max,
        }
    }

    #[test]
    fn utilization_under_100() {
        assert_eq!(utilization(67), 33);
    }

    #[test]
    fn utilization_at_100() {
        assert_eq!(utilization(100), 0);
    }

    #[test]
    fn utilization_over_100() {
        assert_eq!(utilization(110), 110);
    }

    #[test]
    fn utilization_of_extreme_negative_readings_saturates() {
        assert_eq!(utilization(i64::MIN), i64::MAX);
        assert_eq!(utilization(i64::MIN + 99), i64::MAX);
        assert_eq!(utilization(i64::MIN + 101), i64::MAX);
        assert_eq!(utilization(-5), 105);
    }

    #[test]
    fn extreme_negative_reading_classifies_as_scale_up() {
        assert_eq!(evaluator(30, 80).classify(i64::MIN), Classification::ScaleUp);
    }

    #[test]
    fn utilization_inverts_whole_idle_range() {
        for r in 0..=100 {
            assert_eq!(utilization(r), 100 - r);
        }
    }

    #[test]
    fn classifies_against_band() {
        let e = evaluator(30, 80);
        assert_eq!(e.classify(10), Classification::ScaleUp); // u = 90
        assert_eq!(e.classify(20), Classification::ScaleUp); // u = 80, inclusive
        assert_eq!(e.classify(50), Classification::Normal); // u = 50
        assert_eq!(e.classify(70), Classification::ScaleDown); // u = 30, inclusive
        assert_eq!(e.classify(95), Classification::ScaleDown); // u = 5
        assert_eq!(e.classify(110), Classification::ScaleUp); // passes through
    }

    #[test]
    fn degenerate_band_favors_scale_up() {
        let e = evaluator(60, 40);
        assert_eq!(e.classify(50), Classification::ScaleUp); // u = 50
        assert_eq!(e.classify(80), Classification::ScaleDown); // u = 20
    }
}
