//! Numeric scalars and tolerances
//!
//! Every `≈ 0` and `≈ v` comparison in the crate goes through [`Scalar`], so the
//! tolerance policy lives in exactly one place: bit-exact for integers, a
//! relative-plus-absolute epsilon for floating point.

use std::fmt;

use num_traits::{FromPrimitive, NumAssign, Signed, ToPrimitive};

/// Absolute tolerance for `f64` comparisons.
pub const F64_ABS_TOL: f64 = 1e-12;

/// Relative tolerance for `f64` comparisons, scaled by the larger operand.
pub const F64_REL_TOL: f64 = 1e-12;

/// Ordered numeric type the models, envelopes, and markets are generic over.
pub trait Scalar:
    NumAssign
    + Signed
    + PartialOrd
    + Copy
    + fmt::Debug
    + fmt::Display
    + ToPrimitive
    + FromPrimitive
    + 'static
{
    /// Whether this value is indistinguishable from zero at the type's tolerance.
    fn approx_zero(self) -> bool;

    /// Whether two values are indistinguishable at the type's tolerance.
    fn approx_eq(self, other: Self) -> bool;

    /// Exact conversion to an `f64` solver coefficient.
    ///
    /// Returns `None` when the value has no exact `f64` representation, so a
    /// lossy conversion can never silently change an objective or constraint.
    fn to_coeff(self) -> Option<f64>;
}

impl Scalar for f64 {
    fn approx_zero(self) -> bool {
        self.abs() <= F64_ABS_TOL
    }

    fn approx_eq(self, other: Self) -> bool {
        let scale = self.abs().max(other.abs());

        (self - other).abs() <= F64_ABS_TOL + F64_REL_TOL * scale
    }

    fn to_coeff(self) -> Option<f64> {
        self.is_finite().then_some(self)
    }
}

impl Scalar for i64 {
    fn approx_zero(self) -> bool {
        self == 0
    }

    fn approx_eq(self, other: Self) -> bool {
        self == other
    }

    fn to_coeff(self) -> Option<f64> {
        // Only integers with absolute value <= 2^53 can be represented exactly
        // in an IEEE-754 `f64` mantissa; enforce that via a round-trip check.
        let f = self.to_f64()?;

        (f.to_i64() == Some(self)).then_some(f)
    }
}
