//! Penalty substitution
//!
//! Replaces every equality constraint with a squared-residual penalty term on
//! the objective, folded left over the model's constraint iteration order.

use crate::{
    model::{ConstraintSet, Model, Sense},
    num::Scalar,
    reduce::ReduceError,
};

/// Fold `±weight · (f − c)²` into the objective for every equality constraint
/// of `model`, then delete all constraints, in place.
///
/// The sign follows the optimization sense: `−weight` for a maximising model,
/// `+weight` for a minimising one, so violations are always penalised. A
/// weight indistinguishable from zero drops the constraints without touching
/// the objective and emits an advisory warning.
///
/// # Errors
///
/// Returns [`ReduceError::InvalidPenalty`] for a negative weight and
/// [`ReduceError::UnsupportedConstraint`] when a non-equality constraint
/// reaches this stage.
pub fn substitute_penalties<T: Scalar>(
    model: &mut Model<T>,
    weight: T,
) -> Result<(), ReduceError<T>> {
    if weight < T::zero() {
        return Err(ReduceError::InvalidPenalty { weight });
    }

    if weight.approx_zero() {
        tracing::warn!(
            %weight,
            "penalty weight is approximately zero; dropping constraints without penalising the objective"
        );
        model.clear_constraints();

        return Ok(());
    }

    let signed = match model.sense() {
        Sense::Maximise => -weight,
        Sense::Minimise => weight,
    };

    for key in model.constraint_keys() {
        let residual = {
            let Some(constraint) = model.constraint(key) else {
                continue;
            };

            let ConstraintSet::EqualTo(rhs) = *constraint.set() else {
                return Err(ReduceError::UnsupportedConstraint(format!(
                    "{} at the penalty stage",
                    constraint.set().kind()
                )));
            };

            let mut residual = constraint.func().clone();
            residual.set_constant(residual.constant_term() - rhs);

            residual
        };

        model.objective_mut().add_scaled_square(&residual, signed);
    }

    model.clear_constraints();

    Ok(())
}
