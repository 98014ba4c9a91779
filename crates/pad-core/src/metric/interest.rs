//! Distance in interest-statistic space.

use super::DistanceMetric;
use crate::types::InterestSet;

/// Compares two profiles by the statistics the consumer cares about.
///
/// Two profiles with equal window usage are at distance 0 under a
/// `window-usage` interest, however different the rest of the day looks.
#[derive(Debug, Clone)]
pub struct InterestDistance {
    interests: InterestSet,
}

impl InterestDistance {
    /// Create the metric for an interest set.
    pub fn new(interests: InterestSet) -> Self {
        Self { interests }
    }
}

impl DistanceMetric for InterestDistance {
    fn name(&self) -> &str {
        "interest"
    }

    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        self.interests.statistic_distance(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InterestSpec;

    #[test]
    fn test_window_usage_ignores_columns_outside_window() {
        let metric = InterestDistance::new(InterestSet::single(InterestSpec::window_usage(1, 3)));
        assert_eq!(metric.distance(&[9.0, 1.0, 1.0, 0.0], &[0.0, 2.0, 0.0, 7.0]), 0.0);
        assert!((metric.distance(&[0.0, 1.0, 1.0], &[0.0, 3.0, 1.0]) - 2.0).abs() < 1e-12);
    }
}
