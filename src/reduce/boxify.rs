//! Constraint box-normalisation
//!
//! Rewrites every linear constraint into the canonical form
//! `l ≤ f(x) ≤ u` with `u − l = 1` and a constant-free `f`, or into an
//! equality when the expression is provably constant. The equation converter
//! relies on both post-conditions.

use crate::{
    model::{Constraint, ConstraintKey, ConstraintSet, Model},
    num::Scalar,
    reduce::{Envelope, ReduceError, infer_limits},
};

/// Box-normalise every constraint of `model` in place.
///
/// Each rewrite deletes the old constraint and re-adds the new one under the
/// same name.
///
/// # Errors
///
/// Returns [`ReduceError::ModelInfeasible`] when a constraint's envelope
/// collapses, [`ReduceError::UnboundedExpression`] when limits cannot be
/// inferred, and [`ReduceError::UnsupportedConstraint`] for `Semi*` sets.
pub fn boxify<T: Scalar>(model: &mut Model<T>) -> Result<(), ReduceError<T>> {
    for key in model.constraint_keys() {
        boxify_constraint(model, key)?;
    }

    Ok(())
}

fn boxify_constraint<T: Scalar>(
    model: &mut Model<T>,
    key: ConstraintKey,
) -> Result<(), ReduceError<T>> {
    let (name, mut func, envelope) = {
        let Some(constraint) = model.constraint(key) else {
            return Ok(());
        };

        let envelope = infer_limits(constraint.func(), model)?.merge(constraint.set())?;

        (
            constraint.name().to_string(),
            constraint.func().clone(),
            envelope,
        )
    };

    let set = match envelope {
        Envelope::Infeasible => {
            return Err(ReduceError::ModelInfeasible { constraint: name });
        }
        Envelope::Constant(value) => {
            // The expression is provably constant. Keep the variable terms and
            // pin them to the residual right-hand side; no variable is
            // eliminated here.
            let rhs = value - func.constant_term();
            func.set_constant(T::zero());

            ConstraintSet::EqualTo(rhs)
        }
        Envelope::Box { lower, upper } => {
            let lower = lower - func.constant_term();
            let upper = upper - func.constant_term();
            let range = upper - lower;

            // A zero range would have reduced to the constant case above.
            assert!(range > T::zero(), "boxified range must be positive");

            func.set_constant(T::zero());
            func.divide(range);

            ConstraintSet::Interval(lower / range, upper / range)
        }
    };

    tracing::debug!(constraint = %name, set = set.kind(), "boxified constraint");

    model.remove_constraint(key);
    model.add_constraint(Constraint::new(name, func, set))?;

    Ok(())
}
