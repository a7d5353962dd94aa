//! Interval-to-equality conversion
//!
//! Collapses each boxified interval constraint into a single equality by
//! introducing one slack variable. Writing both one-sided forms
//! `f − δ_l = l` and `f + δ_u = u` forces `δ_l + δ_u = 1`, so one equation is
//! redundant; the upper form is the one retained.

use crate::{
    model::{Constraint, ConstraintSet, Model, Variable},
    num::Scalar,
    reduce::ReduceError,
};

/// Replace every interval constraint of `model` with an equality carrying a
/// fresh `[0, 1]` slack, in place.
///
/// Expects the shapes produced by [`boxify`](crate::reduce::boxify):
/// unit-range intervals and equalities. Equalities pass through unchanged.
///
/// # Errors
///
/// Returns [`ReduceError::UnsupportedConstraint`] when any other constraint
/// shape reaches this stage.
pub fn convert_to_equations<T: Scalar>(model: &mut Model<T>) -> Result<(), ReduceError<T>> {
    for (position, key) in model.constraint_keys().into_iter().enumerate() {
        let rewrite = {
            let Some(constraint) = model.constraint(key) else {
                continue;
            };

            match *constraint.set() {
                ConstraintSet::EqualTo(_) => None,
                ConstraintSet::Interval(lower, upper) => {
                    debug_assert!(
                        (upper - lower).approx_eq(T::one()),
                        "interval constraints must arrive box-normalised"
                    );

                    Some((constraint.name().to_string(), constraint.func().clone(), upper))
                }
                ref other => {
                    return Err(ReduceError::UnsupportedConstraint(format!(
                        "{} at the equation-conversion stage",
                        other.kind()
                    )));
                }
            }
        };

        let Some((name, mut func, upper)) = rewrite else {
            continue;
        };

        let slack = model.add_variable(Variable::bounded(
            format!("slack[{}]", position + 1),
            T::zero(),
            T::one(),
        ));

        func.add_term(slack, T::one());

        model.remove_constraint(key);
        model.add_constraint(Constraint::new(name, func, ConstraintSet::EqualTo(upper)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::model::{LinearExpr, Sense, VariableId};

    use super::*;

    #[test]
    fn interval_gains_a_unit_slack_and_becomes_an_equality() -> TestResult {
        let mut model = Model::new(Sense::Minimise);
        let x = model.add_variable(Variable::bounded("x", 0.0, 1.0));

        model.add_constraint(Constraint::new(
            "band",
            LinearExpr::new().with_term(x, 1.0),
            ConstraintSet::Interval(-0.5, 0.5),
        ))?;

        convert_to_equations(&mut model)?;

        assert_eq!(model.num_variables(), 2);

        let slack_id = VariableId::from_position(1);
        let slack = model.variable(slack_id).ok_or("slack missing")?;

        assert_eq!(slack.name(), "slack[1]");
        assert_eq!(slack.lower_bound(), Some(0.0));
        assert_eq!(slack.upper_bound(), Some(1.0));

        let (_, rewritten) = model.constraints().next().ok_or("constraint missing")?;

        assert_eq!(rewritten.name(), "band");
        assert_eq!(*rewritten.set(), ConstraintSet::EqualTo(0.5));
        assert_eq!(rewritten.func().coefficient(slack_id), 1.0);
        assert_eq!(rewritten.func().coefficient(x), 1.0);

        Ok(())
    }

    #[test]
    fn equalities_pass_through_untouched() -> TestResult {
        let mut model = Model::new(Sense::Minimise);
        let x = model.add_variable(Variable::bounded("x", 0.0, 1.0));

        model.add_constraint(Constraint::new(
            "fixed",
            LinearExpr::new().with_term(x, 2.0),
            ConstraintSet::EqualTo(1.0),
        ))?;

        convert_to_equations(&mut model)?;

        assert_eq!(model.num_variables(), 1);

        let (_, constraint) = model.constraints().next().ok_or("constraint missing")?;

        assert_eq!(*constraint.set(), ConstraintSet::EqualTo(1.0));

        Ok(())
    }

    #[test]
    fn one_sided_shapes_are_a_stage_error() -> TestResult {
        let mut model = Model::new(Sense::Minimise);
        let x = model.add_variable(Variable::bounded("x", 0.0, 1.0));

        model.add_constraint(Constraint::new(
            "loose",
            LinearExpr::new().with_term(x, 1.0),
            ConstraintSet::GreaterThan(0.0),
        ))?;

        let err = convert_to_equations(&mut model).err();

        assert!(matches!(
            err,
            Some(ReduceError::UnsupportedConstraint(kind))
                if kind.starts_with("GreaterThan")
        ));

        Ok(())
    }

    #[test]
    fn slacks_are_numbered_by_constraint_position() -> TestResult {
        let mut model = Model::new(Sense::Minimise);
        let x = model.add_variable(Variable::bounded("x", 0.0, 1.0));

        model.add_constraint(Constraint::new(
            "first",
            LinearExpr::new().with_term(x, 1.0),
            ConstraintSet::EqualTo(0.0),
        ))?;
        model.add_constraint(Constraint::new(
            "second",
            LinearExpr::new().with_term(x, 1.0),
            ConstraintSet::Interval(0.0, 1.0),
        ))?;

        convert_to_equations(&mut model)?;

        let slack = model
            .variable(VariableId::from_position(1))
            .ok_or("slack missing")?;

        assert_eq!(slack.name(), "slack[2]");

        Ok(())
    }
}
