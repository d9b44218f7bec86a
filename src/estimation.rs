//! Streaming estimators.
//!
//! An estimator is a stateful accumulator with two operations: `observe` a
//! value and `render` a text summary of what it has seen. Exactly one task
//! owns an estimator at a time; the driver is that task in a running
//! pipeline. The two implementations here are deliberately small.

use crate::types::Value;
use serde::{Deserialize, Serialize};

/// A single-owner streaming accumulator.
#[cfg_attr(test, mockall::automock)]
pub trait Estimator: Send {
    /// Fold one value into the running state.
    fn observe(&mut self, x: Value);

    /// Summary of the current state.
    fn render(&self) -> String;
}

impl<E: Estimator + ?Sized> Estimator for Box<E> {
    fn observe(&mut self, x: Value) {
        (**self).observe(x)
    }

    fn render(&self) -> String {
        (**self).render()
    }
}

/// Count, mean and variance via Welford's update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwoMoments {
    count: u64,
    mean: f64,
    m2: f64,
}

impl TwoMoments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance; 0 with fewer than two observations.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

impl Estimator for TwoMoments {
    fn observe(&mut self, x: Value) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn render(&self) -> String {
        format!(
            "n: {} mean: {:.6} var: {:.6}\n",
            self.count,
            self.mean,
            self.variance()
        )
    }
}

/// Minimum and maximum seen so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    count: u64,
    min: f64,
    max: f64,
}

impl Range {
    pub fn new() -> Self {
        Self {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// `None` until something was observed.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        (self.count > 0).then_some((self.min, self.max))
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for Range {
    fn observe(&mut self, x: Value) {
        self.count += 1;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    fn render(&self) -> String {
        match self.bounds() {
            Some((lo, hi)) => format!("n: {} min: {} max: {}\n", self.count, lo, hi),
            None => "n: 0\n".to_string(),
        }
    }
}

/// Which estimator a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    TwoMoments,
    Range,
}

impl EstimatorKind {
    pub fn build(self) -> Box<dyn Estimator> {
        match self {
            EstimatorKind::TwoMoments => Box::new(TwoMoments::new()),
            EstimatorKind::Range => Box::new(Range::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_two_moments() {
        let mut est = TwoMoments::new();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            est.observe(x);
        }
        assert_eq!(est.count(), 8);
        assert_relative_eq!(est.mean(), 5.0);
        assert_relative_eq!(est.variance(), 32.0 / 7.0, epsilon = 1e-12);
        assert_eq!(est.render(), "n: 8 mean: 5.000000 var: 4.571429\n");
    }

    #[test]
    fn test_two_moments_empty() {
        let est = TwoMoments::new();
        assert_eq!(est.variance(), 0.0);
        assert_eq!(est.render(), "n: 0 mean: 0.000000 var: 0.000000\n");
    }

    #[test]
    fn test_range() {
        let mut est = Range::new();
        assert_eq!(est.bounds(), None);
        assert_eq!(est.render(), "n: 0\n");
        for x in [3.0, -1.5, 8.0] {
            est.observe(x);
        }
        assert_eq!(est.bounds(), Some((-1.5, 8.0)));
        assert_eq!(est.render(), "n: 3 min: -1.5 max: 8\n");
    }

    #[test]
    fn test_boxed_estimator_delegates() {
        let mut est = EstimatorKind::Range.build();
        est.observe(1.0);
        assert_eq!(est.render(), "n: 1 min: 1 max: 1\n");
    }

    #[test]
    fn test_kind_serde() {
        let kind: EstimatorKind = serde_json::from_str("\"range\"").unwrap();
        assert_eq!(kind, EstimatorKind::Range);
        assert_eq!(
            serde_json::to_string(&EstimatorKind::TwoMoments).unwrap(),
            "\"two_moments\""
        );
    }

    proptest! {
        #[test]
        fn prop_mean_matches_batch(values in prop::collection::vec(-1e6f64..1e6, 1..200)) {
            let mut est = TwoMoments::new();
            for &x in &values {
                est.observe(x);
            }
            let batch = values.iter().sum::<f64>() / values.len() as f64;
            prop_assert!((est.mean() - batch).abs() <= 1e-6 * (1.0 + batch.abs()));
        }
    }
}
