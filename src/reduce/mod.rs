//! Model-to-QUMO reduction
//!
//! The pipeline rewrites a constrained mixed binary/continuous model into a
//! Quadratic Unconstrained Mixed Optimization instance in four passes:
//! box-normalisation, slack introduction, penalty substitution, extraction.

pub mod boxify;
pub mod envelope;
pub mod equations;
pub mod limits;
pub mod penalty;
pub mod qumo;

use std::fmt;

use thiserror::Error;

pub use boxify::boxify;
pub use envelope::Envelope;
pub use equations::convert_to_equations;
pub use limits::infer_limits;
pub use penalty::substitute_penalties;
pub use qumo::{Qumo, extract_qumo};

use crate::{
    model::{Model, ModelError},
    num::Scalar,
};

/// Errors raised by the reduction passes.
#[derive(Debug, Error, PartialEq)]
pub enum ReduceError<T: fmt::Debug + fmt::Display> {
    /// A constraint's envelope collapsed to `Infeasible`.
    #[error("constraint `{constraint}` cannot be satisfied")]
    ModelInfeasible {
        /// Name of the offending constraint
        constraint: String,
    },

    /// Limit inference reached a variable with neither a fixed value, a binary
    /// domain, nor two-sided bounds.
    #[error(
        "expression `{expression}` has no finite range: variable `{variable}` is neither fixed, binary, nor bounded on both sides"
    )]
    UnboundedExpression {
        /// Rendering of the affine expression
        expression: String,

        /// Name of the offending variable
        variable: String,
    },

    /// A negative penalty weight was supplied.
    #[error("penalty weight {weight} is negative")]
    InvalidPenalty {
        /// The offending weight
        weight: T,
    },

    /// A constraint set no pass supports: `Semiinteger`/`Semicontinuous`
    /// anywhere, or a non-interval, non-equality shape past boxification.
    #[error("unsupported constraint set: {0}")]
    UnsupportedConstraint(String),

    /// Wrapped model mutation error.
    #[error(transparent)]
    Model(#[from] ModelError<T>),
}

/// Reduce a clone of `model` to a QUMO instance with penalty weight `weight`.
///
/// The caller's model is left untouched; see [`to_qumo_in_place`] for the
/// mutating variant.
///
/// # Errors
///
/// Returns a [`ReduceError`] when any pass fails.
pub fn to_qumo<T: Scalar>(model: &Model<T>, weight: T) -> Result<Qumo<T>, ReduceError<T>> {
    let mut clone = model.clone();

    to_qumo_in_place(&mut clone, weight)
}

/// Reduce `model` to a QUMO instance with penalty weight `weight`, mutating it
/// through the intermediate forms.
///
/// After a successful return the model is unconstrained and its objective
/// carries the penalty terms.
///
/// # Errors
///
/// Returns a [`ReduceError`] when any pass fails.
pub fn to_qumo_in_place<T: Scalar>(
    model: &mut Model<T>,
    weight: T,
) -> Result<Qumo<T>, ReduceError<T>> {
    boxify(model)?;
    convert_to_equations(model)?;
    substitute_penalties(model, weight)?;

    Ok(extract_qumo(model))
}
