//! Envelope algebra
//!
//! An [`Envelope`] describes the feasible range of an affine expression as one
//! of three shapes. The `Infeasible` absorbing rule lives here and nowhere
//! else; every arithmetic operation and every refinement preserves the
//! `lower ≤ upper` invariant.

use std::ops::{Add, Mul, Sub};

use crate::{model::ConstraintSet, num::Scalar, reduce::ReduceError};

/// Three-valued description of an expression's feasible range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope<T> {
    /// No value satisfies the constraints seen so far. Absorbs every operation.
    Infeasible,

    /// Exactly one value.
    Constant(T),

    /// The closed interval `[lower, upper]`. The degenerate case
    /// `lower == upper` is a tight interval, distinct from `Constant`.
    Box {
        /// Inclusive lower endpoint
        lower: T,

        /// Inclusive upper endpoint
        upper: T,
    },
}

impl<T: Scalar> Envelope<T> {
    /// Build a box envelope, asserting the endpoint order invariant.
    pub fn boxed(lower: T, upper: T) -> Self {
        assert!(lower <= upper, "envelope bounds out of order");

        Self::Box { lower, upper }
    }

    /// Divide by `divisor`, returning `None` when the divisor is
    /// indistinguishable from zero.
    pub fn checked_div(self, divisor: T) -> Option<Self> {
        if divisor.approx_zero() {
            return None;
        }

        Some(match self {
            Self::Infeasible => Self::Infeasible,
            Self::Constant(v) => Self::Constant(v / divisor),
            Self::Box { lower, upper } => {
                if divisor < T::zero() {
                    Self::Box {
                        lower: upper / divisor,
                        upper: lower / divisor,
                    }
                } else {
                    Self::Box {
                        lower: lower / divisor,
                        upper: upper / divisor,
                    }
                }
            }
        })
    }

    /// Refine this envelope by a constraint set.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::UnsupportedConstraint`] for `Semiinteger` and
    /// `Semicontinuous` sets.
    pub fn merge(self, set: &ConstraintSet<T>) -> Result<Self, ReduceError<T>> {
        let merged = match (self, *set) {
            (Self::Infeasible, _) => Self::Infeasible,

            (Self::Constant(v), ConstraintSet::GreaterThan(a)) => {
                if v >= a {
                    self
                } else {
                    Self::Infeasible
                }
            }
            (Self::Constant(v), ConstraintSet::LessThan(b)) => {
                // Comparison is against the upper bound.
                if v <= b {
                    self
                } else {
                    Self::Infeasible
                }
            }
            (Self::Constant(v), ConstraintSet::EqualTo(c)) => {
                if v.approx_eq(c) {
                    self
                } else {
                    Self::Infeasible
                }
            }
            (Self::Constant(v), ConstraintSet::Interval(a, b)) => {
                if a <= v && v <= b {
                    self
                } else {
                    Self::Infeasible
                }
            }

            (Self::Box { lower, upper }, ConstraintSet::GreaterThan(a)) => {
                if lower > a {
                    self
                } else if upper < a {
                    Self::Infeasible
                } else {
                    Self::Box { lower: a, upper }
                }
            }
            (Self::Box { lower, upper }, ConstraintSet::LessThan(b)) => {
                if upper <= b {
                    self
                } else if b < lower {
                    Self::Infeasible
                } else {
                    Self::Box { lower, upper: b }
                }
            }
            (Self::Box { lower, upper }, ConstraintSet::EqualTo(c)) => {
                if lower <= c && c <= upper {
                    Self::Constant(c)
                } else {
                    Self::Infeasible
                }
            }
            (Self::Box { lower, upper }, ConstraintSet::Interval(a, b)) => {
                if a <= lower && upper <= b {
                    self
                } else if upper < a || b < lower {
                    Self::Infeasible
                } else {
                    Self::Box {
                        lower: if a > lower { a } else { lower },
                        upper: if b < upper { b } else { upper },
                    }
                }
            }

            (_, ConstraintSet::Semiinteger(_, _) | ConstraintSet::Semicontinuous(_, _)) => {
                return Err(ReduceError::UnsupportedConstraint(set.kind().to_string()));
            }
        };

        Ok(merged)
    }
}

impl<T: Scalar> Add<T> for Envelope<T> {
    type Output = Self;

    fn add(self, shift: T) -> Self {
        match self {
            Self::Infeasible => Self::Infeasible,
            Self::Constant(v) => Self::Constant(v + shift),
            Self::Box { lower, upper } => Self::Box {
                lower: lower + shift,
                upper: upper + shift,
            },
        }
    }
}

impl<T: Scalar> Sub<T> for Envelope<T> {
    type Output = Self;

    fn sub(self, shift: T) -> Self {
        self + (-shift)
    }
}

impl<T: Scalar> Mul<T> for Envelope<T> {
    type Output = Self;

    fn mul(self, factor: T) -> Self {
        match self {
            Self::Infeasible => Self::Infeasible,
            _ if factor.approx_zero() => Self::Constant(T::zero()),
            Self::Constant(v) => Self::Constant(v * factor),
            Self::Box { lower, upper } => {
                if factor < T::zero() {
                    Self::Box {
                        lower: upper * factor,
                        upper: lower * factor,
                    }
                } else {
                    Self::Box {
                        lower: lower * factor,
                        upper: upper * factor,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn boxed(lower: f64, upper: f64) -> Envelope<f64> {
        Envelope::boxed(lower, upper)
    }

    #[test]
    fn affine_ops_shift_and_scale_boxes() {
        assert_eq!(boxed(-1.0, 2.0) + 3.0, boxed(2.0, 5.0));
        assert_eq!(boxed(-1.0, 2.0) - 1.0, boxed(-2.0, 1.0));
        assert_eq!(boxed(-1.0, 2.0) * 2.0, boxed(-2.0, 4.0));
    }

    #[test]
    fn negative_factor_swaps_endpoints() {
        assert_eq!(boxed(-1.0, 2.0) * -3.0, boxed(-6.0, 3.0));
    }

    #[test]
    fn zero_factor_collapses_to_constant_zero() {
        assert_eq!(boxed(-1.0, 2.0) * 0.0, Envelope::Constant(0.0));
        assert_eq!(Envelope::Constant(5.0) * 0.0, Envelope::Constant(0.0));
        assert_eq!(Envelope::<f64>::Infeasible * 0.0, Envelope::Infeasible);
    }

    #[test]
    fn infeasible_absorbs_every_operation() -> TestResult {
        let infeasible = Envelope::<f64>::Infeasible;

        assert_eq!(infeasible + 1.0, Envelope::Infeasible);
        assert_eq!(infeasible - 1.0, Envelope::Infeasible);
        assert_eq!(infeasible * 2.0, Envelope::Infeasible);
        assert_eq!(infeasible.checked_div(2.0), Some(Envelope::Infeasible));
        assert_eq!(
            infeasible.merge(&ConstraintSet::EqualTo(0.0))?,
            Envelope::Infeasible
        );

        Ok(())
    }

    #[test]
    fn division_by_zero_is_checked() {
        assert_eq!(boxed(0.0, 1.0).checked_div(0.0), None);
        assert_eq!(boxed(2.0, 4.0).checked_div(2.0), Some(boxed(1.0, 2.0)));
        assert_eq!(boxed(2.0, 4.0).checked_div(-2.0), Some(boxed(-2.0, -1.0)));
    }

    #[test]
    fn merge_greater_than_clips_or_rejects() -> TestResult {
        assert_eq!(boxed(1.0, 3.0).merge(&ConstraintSet::GreaterThan(0.0))?, boxed(1.0, 3.0));
        assert_eq!(boxed(1.0, 3.0).merge(&ConstraintSet::GreaterThan(2.0))?, boxed(2.0, 3.0));
        assert_eq!(
            boxed(1.0, 3.0).merge(&ConstraintSet::GreaterThan(4.0))?,
            Envelope::Infeasible
        );
        assert_eq!(
            Envelope::Constant(1.0).merge(&ConstraintSet::GreaterThan(1.0))?,
            Envelope::Constant(1.0)
        );
        assert_eq!(
            Envelope::Constant(0.5).merge(&ConstraintSet::GreaterThan(1.0))?,
            Envelope::Infeasible
        );

        Ok(())
    }

    #[test]
    fn merge_less_than_compares_constants_against_upper() -> TestResult {
        assert_eq!(
            Envelope::Constant(1.0).merge(&ConstraintSet::LessThan(2.0))?,
            Envelope::Constant(1.0)
        );
        assert_eq!(
            Envelope::Constant(3.0).merge(&ConstraintSet::LessThan(2.0))?,
            Envelope::Infeasible
        );
        assert_eq!(boxed(1.0, 3.0).merge(&ConstraintSet::LessThan(2.0))?, boxed(1.0, 2.0));
        assert_eq!(
            boxed(1.0, 3.0).merge(&ConstraintSet::LessThan(0.0))?,
            Envelope::Infeasible
        );

        Ok(())
    }

    #[test]
    fn merge_equal_to_collapses_boxes_to_constants() -> TestResult {
        assert_eq!(
            boxed(0.0, 2.0).merge(&ConstraintSet::EqualTo(1.0))?,
            Envelope::Constant(1.0)
        );
        assert_eq!(
            boxed(0.0, 2.0).merge(&ConstraintSet::EqualTo(3.0))?,
            Envelope::Infeasible
        );

        Ok(())
    }

    #[test]
    fn merge_interval_intersects() -> TestResult {
        assert_eq!(
            boxed(0.0, 4.0).merge(&ConstraintSet::Interval(1.0, 3.0))?,
            boxed(1.0, 3.0)
        );
        assert_eq!(
            boxed(1.0, 2.0).merge(&ConstraintSet::Interval(0.0, 3.0))?,
            boxed(1.0, 2.0)
        );
        assert_eq!(
            boxed(0.0, 1.0).merge(&ConstraintSet::Interval(2.0, 3.0))?,
            Envelope::Infeasible
        );

        Ok(())
    }

    #[test]
    fn semi_sets_are_rejected() {
        let err = boxed(0.0, 1.0).merge(&ConstraintSet::Semiinteger(1.0, 2.0)).err();

        assert!(matches!(
            err,
            Some(ReduceError::UnsupportedConstraint(kind)) if kind == "Semiinteger"
        ));

        let err = Envelope::Constant(0.0)
            .merge(&ConstraintSet::Semicontinuous(1.0, 2.0))
            .err();

        assert!(matches!(
            err,
            Some(ReduceError::UnsupportedConstraint(kind)) if kind == "Semicontinuous"
        ));
    }

    #[test]
    #[should_panic(expected = "envelope bounds out of order")]
    fn boxed_rejects_reversed_bounds() {
        let _ = Envelope::boxed(2.0, 1.0);
    }
}
