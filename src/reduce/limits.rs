//! Limit inference
//!
//! Computes an [`Envelope`] for an affine expression from the per-variable
//! capabilities of its model: fixed values, binary domains, and two-sided
//! bounds.

use crate::{
    model::{LinearExpr, Model},
    num::Scalar,
    reduce::{Envelope, ReduceError},
};

/// Infer the feasible range of `expr` over the variables of `model`.
///
/// Each term contributes `coef · value` to the running minimum and maximum:
/// fixed variables contribute their fix on both sides, binary variables
/// contribute `coef` to the side its sign points at, and two-sided bounded
/// variables contribute the sign-paired bound products.
///
/// # Errors
///
/// Returns [`ReduceError::UnboundedExpression`] when a variable has neither a
/// fixed value, a binary domain, nor bounds on both sides.
pub fn infer_limits<T: Scalar>(
    expr: &LinearExpr<T>,
    model: &Model<T>,
) -> Result<Envelope<T>, ReduceError<T>> {
    let mut min = expr.constant_term();
    let mut max = expr.constant_term();

    for (id, coefficient) in expr.terms() {
        let Some(variable) = model.variable(id) else {
            return Err(ReduceError::UnboundedExpression {
                expression: expr.to_string(),
                variable: id.to_string(),
            });
        };

        if let Some(fix) = variable.fix_value() {
            min += coefficient * fix;
            max += coefficient * fix;
        } else if variable.is_binary() {
            if coefficient > T::zero() {
                max += coefficient;
            } else {
                min += coefficient;
            }
        } else if let (Some(lower), Some(upper)) =
            (variable.lower_bound(), variable.upper_bound())
        {
            if coefficient < T::zero() {
                min += coefficient * upper;
                max += coefficient * lower;
            } else {
                min += coefficient * lower;
                max += coefficient * upper;
            }
        } else {
            return Err(ReduceError::UnboundedExpression {
                expression: expr.to_string(),
                variable: variable.name().to_string(),
            });
        }
    }

    Ok(Envelope::boxed(min, max))
}
