//! Reusable transforms and predicates.
//!
//! Predicates built here always return exactly `0.0` or `1.0`, so they can be
//! fed straight into a partition stage.

use crate::types::{Transform, Value};

/// Threshold predicate: 1 if `x > t`, else 0.
pub fn step(t: Value) -> Transform {
    Transform::new(format!("step({})", t), move |x| if x > t { 1.0 } else { 0.0 })
}

/// 1 for strictly positive values. Zero is not positive.
pub fn if_positive() -> Transform {
    step(0.0)
}

/// Adds a constant.
pub fn shift(k: Value) -> Transform {
    Transform::new(format!("shift({})", k), move |x| x + k)
}

/// Multiplies by a constant.
pub fn scale(k: Value) -> Transform {
    Transform::new(format!("scale({})", k), move |x| x * k)
}

/// 1 if `lower <= x <= upper`, else 0.
pub fn band(lower: Value, upper: Value) -> Transform {
    Transform::new(format!("band({}, {})", lower, upper), move |x| {
        if x >= lower && x <= upper {
            1.0
        } else {
            0.0
        }
    })
}

/// `1 - p(x)`. For a 0/1 predicate this is its negation.
pub fn complement(p: &Transform) -> Transform {
    let inner = p.clone();
    Transform::new(format!("not {}", p.name()), move |x| 1.0 - inner.apply(x))
}

/// Always 1; routes every value.
pub fn always() -> Transform {
    Transform::new("always", |_| 1.0)
}

/// `a*x + b`.
pub fn affine(a: Value, b: Value) -> Transform {
    scale(a).then(&shift(b))
}
