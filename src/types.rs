//! Core data types for dataflow-rs
//!
//! # Main Types
//!
//! - [`Value`] - The scalar that flows through conduits
//! - [`Tuple`] - A fixed-width row assembled by a synchronizing join
//! - [`Transform`] - A pure `Value -> Value` function, also used as a predicate
//! - [`PredicateOutcome`] - Result of evaluating a transform as a predicate

use std::fmt;
use std::sync::Arc;

/// A scalar flowing through the pipeline. Copied, never shared.
pub type Value = f64;

/// A positional tuple of values, one per joined input.
pub type Tuple = Vec<Value>;

/// Outcome of evaluating a transform as a predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredicateOutcome {
    Pass,
    Reject,
    /// Neither 0 nor 1: the predicate is broken.
    Invalid(Value),
}

/// A named, pure unary function on values.
///
/// Cloning is cheap; clones share the same function. Predicates are
/// transforms whose result is exactly `0.0` or `1.0`.
#[derive(Clone)]
pub struct Transform {
    name: Arc<str>,
    f: Arc<dyn Fn(Value) -> Value + Send + Sync>,
}

impl Transform {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            f: Arc::new(f),
        }
    }

    /// Leaves every value unchanged.
    pub fn identity() -> Self {
        Self::new("identity", |x| x)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn apply(&self, x: Value) -> Value {
        (self.f)(x)
    }

    /// Evaluate as a predicate.
    #[inline]
    pub fn test(&self, x: Value) -> PredicateOutcome {
        let r = self.apply(x);
        if r == 1.0 {
            PredicateOutcome::Pass
        } else if r == 0.0 {
            PredicateOutcome::Reject
        } else {
            PredicateOutcome::Invalid(r)
        }
    }

    /// `other ∘ self`: apply `self` first, then `other`.
    pub fn then(&self, other: &Transform) -> Transform {
        let first = self.f.clone();
        let second = other.f.clone();
        Transform {
            name: Arc::from(format!("{} | {}", self.name, other.name)),
            f: Arc::new(move |x| second(first(x))),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transform({})", self.name)
    }
}
