//! Mixed-variable optimization models
//!
//! A [`Model`] owns a dense variable table, an insertion-ordered constraint
//! table with stable handles, and a quadratic objective. All iteration follows
//! insertion order so downstream transforms stay deterministic.

pub mod constraint;
pub mod expr;
pub mod variable;

use std::fmt;

use slotmap::SlotMap;
use thiserror::Error;

pub use constraint::{Constraint, ConstraintKey, ConstraintSet};
pub use expr::{LinearExpr, QuadExpr, VarPair};
pub use variable::{Variable, VariableId};

use crate::num::Scalar;

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sense {
    /// Minimise the objective.
    #[default]
    Minimise,

    /// Maximise the objective.
    Maximise,
}

/// Errors raised while building a model.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError<T: fmt::Debug + fmt::Display> {
    /// An interval (or semi-) set has its bounds out of order. The upstream
    /// data never checks this, so the model must.
    #[error("constraint `{name}` has lower bound {lower} greater than upper bound {upper}")]
    InvalidInterval {
        /// Name of the offending constraint
        name: String,

        /// Lower bound supplied
        lower: T,

        /// Upper bound supplied
        upper: T,
    },

    /// A constraint term references a variable outside the model's table.
    #[error("constraint `{constraint}` references unknown variable {variable}")]
    UnknownVariable {
        /// Name of the offending constraint
        constraint: String,

        /// The id that is not part of this model
        variable: VariableId,
    },
}

/// A mixed binary/continuous optimization model.
#[derive(Debug, Clone)]
pub struct Model<T> {
    sense: Sense,
    variables: Vec<Variable<T>>,
    constraints: SlotMap<ConstraintKey, Constraint<T>>,
    order: Vec<ConstraintKey>,
    objective: QuadExpr<T>,
}

impl<T: Scalar> Model<T> {
    /// Create an empty model with the given optimization sense.
    pub fn new(sense: Sense) -> Self {
        Self {
            sense,
            variables: Vec::new(),
            constraints: SlotMap::with_key(),
            order: Vec::new(),
            objective: QuadExpr::new(),
        }
    }

    /// The optimization direction.
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Append a variable to the table, returning its dense 1-based id.
    pub fn add_variable(&mut self, variable: Variable<T>) -> VariableId {
        self.variables.push(variable);

        VariableId::from_position(self.variables.len() - 1)
    }

    /// Look up a variable by id.
    pub fn variable(&self, id: VariableId) -> Option<&Variable<T>> {
        self.variables.get(id.position())
    }

    /// Iterate `(id, variable)` pairs in id order.
    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable<T>)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(position, variable)| (VariableId::from_position(position), variable))
    }

    /// Number of variables in the table.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Add a constraint, returning its handle.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] when an interval-shaped set has its bounds out
    /// of order, or when a term references a variable outside the table.
    pub fn add_constraint(
        &mut self,
        constraint: Constraint<T>,
    ) -> Result<ConstraintKey, ModelError<T>> {
        if let ConstraintSet::Interval(lower, upper)
        | ConstraintSet::Semiinteger(lower, upper)
        | ConstraintSet::Semicontinuous(lower, upper) = *constraint.set()
        {
            if upper < lower {
                return Err(ModelError::InvalidInterval {
                    name: constraint.name().to_string(),
                    lower,
                    upper,
                });
            }
        }

        for (variable, _) in constraint.func().terms() {
            if variable.position() >= self.variables.len() {
                return Err(ModelError::UnknownVariable {
                    constraint: constraint.name().to_string(),
                    variable,
                });
            }
        }

        let key = self.constraints.insert(constraint);
        self.order.push(key);

        Ok(key)
    }

    /// Remove a constraint by handle, returning it when present.
    pub fn remove_constraint(&mut self, key: ConstraintKey) -> Option<Constraint<T>> {
        let removed = self.constraints.remove(key);

        if removed.is_some() {
            self.order.retain(|&k| k != key);
        }

        removed
    }

    /// Look up a constraint by handle.
    pub fn constraint(&self, key: ConstraintKey) -> Option<&Constraint<T>> {
        self.constraints.get(key)
    }

    /// Snapshot of the constraint handles in insertion order.
    ///
    /// Transforms iterate this snapshot while deleting and re-adding, so
    /// freshly re-added constraints are never reprocessed within a pass.
    pub fn constraint_keys(&self) -> Vec<ConstraintKey> {
        self.order.clone()
    }

    /// Iterate `(handle, constraint)` pairs in insertion order.
    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintKey, &Constraint<T>)> {
        self.order
            .iter()
            .filter_map(|&key| self.constraints.get(key).map(|c| (key, c)))
    }

    /// Number of constraints.
    pub fn num_constraints(&self) -> usize {
        self.order.len()
    }

    /// Delete every constraint, leaving variables and objective untouched.
    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
        self.order.clear();
    }

    /// The objective expression.
    pub fn objective(&self) -> &QuadExpr<T> {
        &self.objective
    }

    /// Mutable access to the objective expression.
    pub fn objective_mut(&mut self) -> &mut QuadExpr<T> {
        &mut self.objective
    }

    /// Replace the objective expression.
    pub fn set_objective(&mut self, objective: QuadExpr<T>) {
        self.objective = objective;
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn two_variable_model() -> (Model<f64>, VariableId, VariableId) {
        let mut model = Model::new(Sense::Minimise);
        let x = model.add_variable(Variable::bounded("x", 0.0, 1.0));
        let y = model.add_variable(Variable::bounded("y", 0.0, 1.0));

        (model, x, y)
    }

    #[test]
    fn constraints_keep_insertion_order_across_removal() -> TestResult {
        let (mut model, x, _) = two_variable_model();

        let a = model.add_constraint(Constraint::new(
            "a",
            LinearExpr::new().with_term(x, 1.0),
            ConstraintSet::LessThan(1.0),
        ))?;
        let _b = model.add_constraint(Constraint::new(
            "b",
            LinearExpr::new().with_term(x, 1.0),
            ConstraintSet::GreaterThan(0.0),
        ))?;

        model.remove_constraint(a);
        model.add_constraint(Constraint::new(
            "c",
            LinearExpr::new().with_term(x, 1.0),
            ConstraintSet::EqualTo(0.5),
        ))?;

        let names: Vec<&str> = model.constraints().map(|(_, c)| c.name()).collect();

        assert_eq!(names, ["b", "c"]);

        Ok(())
    }

    #[test]
    fn interval_with_reversed_bounds_is_rejected() {
        let (mut model, x, _) = two_variable_model();

        let err = model
            .add_constraint(Constraint::new(
                "bad",
                LinearExpr::new().with_term(x, 1.0),
                ConstraintSet::Interval(2.0, 1.0),
            ))
            .err();

        assert!(matches!(
            err,
            Some(ModelError::InvalidInterval { lower, upper, .. })
                if lower == 2.0 && upper == 1.0
        ));
    }

    #[test]
    fn degenerate_interval_is_accepted() -> TestResult {
        let (mut model, x, _) = two_variable_model();

        model.add_constraint(Constraint::new(
            "tight",
            LinearExpr::new().with_term(x, 1.0),
            ConstraintSet::Interval(1.0, 1.0),
        ))?;

        Ok(())
    }

    #[test]
    fn unknown_variable_is_rejected() {
        let (mut model, _, y) = two_variable_model();
        let stale = VariableId::from_position(y.position() + 5);

        let err = model
            .add_constraint(Constraint::new(
                "stale",
                LinearExpr::new().with_term(stale, 1.0),
                ConstraintSet::EqualTo(0.0),
            ))
            .err();

        assert!(matches!(err, Some(ModelError::UnknownVariable { .. })));
    }

    #[test]
    fn clear_constraints_preserves_variables_and_objective() -> TestResult {
        let (mut model, x, _) = two_variable_model();

        model.add_constraint(Constraint::new(
            "a",
            LinearExpr::new().with_term(x, 1.0),
            ConstraintSet::LessThan(1.0),
        ))?;
        model.set_objective(QuadExpr::from_linear(LinearExpr::new().with_term(x, 1.0)));

        model.clear_constraints();

        assert_eq!(model.num_constraints(), 0);
        assert_eq!(model.num_variables(), 2);
        assert_eq!(model.objective().linear().coefficient(x), 1.0);

        Ok(())
    }
}
