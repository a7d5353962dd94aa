//! MILP solver backends
//!
//! Translates a linear [`Model`] into `good_lp` and runs the feature-selected
//! solver: HiGHS by default, microlp as the fallback backend.

use good_lp::{Expression, ProblemVariables, ResolutionError, Solution, SolverModel, variable};
use indexmap::IndexMap;
use thiserror::Error;

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

use crate::{
    model::{ConstraintSet, LinearExpr, Model, Sense},
    num::Scalar,
};

/// Binary threshold for determining truthiness of solver values.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Errors raised while translating a model or solving it.
#[derive(Debug, Error)]
pub enum SolveError {
    /// A model coefficient has no exact `f64` representation.
    #[error("coefficient {value} of `{context}` cannot be represented exactly as a solver coefficient")]
    CoefficientNotRepresentable {
        /// Variable or constraint the coefficient belongs to
        context: String,

        /// Rendering of the offending value
        value: String,
    },

    /// The objective carries quadratic terms, which the MILP backends cannot
    /// express.
    #[error("objective contains quadratic terms, which the MILP backends cannot express")]
    QuadraticObjective,

    /// A constraint set the backends cannot express.
    #[error("constraint `{name}` uses unsupported set {kind}")]
    UnsupportedConstraint {
        /// Name of the offending constraint
        name: String,

        /// Kind of the offending set
        kind: &'static str,
    },

    /// Internal solver invariant was violated (this is a bug).
    #[error("solver invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },

    /// Wrapped solver resolution error (non-optimal termination).
    #[error(transparent)]
    ResolutionError(#[from] ResolutionError),
}

/// Assignment extracted from an optimal MILP solution.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// 1-based indices, in ascending order, of the binary variables assigned
    /// one, counted in variable order.
    pub selected: Vec<usize>,

    /// Optimal values of the non-binary variables, keyed by name. Empty for
    /// all-binary models.
    pub continuous: IndexMap<String, f64>,
}

/// A synchronous MILP solving capability over [`Model`].
pub trait SolverBackend {
    /// Solve `model` to optimality.
    ///
    /// # Errors
    ///
    /// Returns a [`SolveError`] when translation fails or the solver
    /// terminates with any status other than optimal.
    fn solve<T: Scalar>(&self, model: &Model<T>) -> Result<SolveOutcome, SolveError>;
}

/// The feature-selected `good_lp` backend (HiGHS under the default features).
#[derive(Debug, Default, Clone, Copy)]
pub struct MilpBackend;

impl SolverBackend for MilpBackend {
    fn solve<T: Scalar>(&self, model: &Model<T>) -> Result<SolveOutcome, SolveError> {
        solve_with_default_solver(model)
    }
}

/// Solve `model` with the default backend.
///
/// # Errors
///
/// Returns a [`SolveError`] when translation fails or the solver terminates
/// with any status other than optimal.
pub fn solve<T: Scalar>(model: &Model<T>) -> Result<SolveOutcome, SolveError> {
    MilpBackend.solve(model)
}

fn solve_with_default_solver<T: Scalar>(model: &Model<T>) -> Result<SolveOutcome, SolveError> {
    if model.objective().has_quadratic_terms() {
        return Err(SolveError::QuadraticObjective);
    }

    let mut pb = ProblemVariables::new();
    let mut lp_vars = Vec::with_capacity(model.num_variables());

    for (_, var) in model.variables() {
        let mut definition = variable().name(var.name());

        if var.is_binary() {
            definition = definition.binary();
        }

        if let Some(fix) = var.fix_value() {
            let fix = coefficient(fix, var.name())?;
            definition = definition.min(fix).max(fix);
        } else {
            if let Some(lower) = var.lower_bound() {
                definition = definition.min(coefficient(lower, var.name())?);
            }
            if let Some(upper) = var.upper_bound() {
                definition = definition.max(coefficient(upper, var.name())?);
            }
        }

        lp_vars.push(pb.add(definition));
    }

    // The objective's constant shifts every value equally, so it plays no
    // part in the argmax and stays out of the solver.
    let objective = lp_terms(model.objective().linear(), &lp_vars, "objective")?;

    let problem = match model.sense() {
        Sense::Maximise => pb.maximise(objective),
        Sense::Minimise => pb.minimise(objective),
    };

    let mut lp = problem.using(default_solver);

    for (_, constraint) in model.constraints() {
        let expression = lp_terms(constraint.func(), &lp_vars, constraint.name())?;

        // The function's constant folds into the right-hand side.
        let shift = coefficient(constraint.func().constant_term(), constraint.name())?;

        match *constraint.set() {
            ConstraintSet::GreaterThan(lower) => {
                lp = lp.with(expression.geq(coefficient(lower, constraint.name())? - shift));
            }
            ConstraintSet::LessThan(upper) => {
                lp = lp.with(expression.leq(coefficient(upper, constraint.name())? - shift));
            }
            ConstraintSet::EqualTo(value) => {
                lp = lp.with(expression.eq(coefficient(value, constraint.name())? - shift));
            }
            ConstraintSet::Interval(lower, upper) => {
                lp = lp
                    .with(expression.clone().geq(coefficient(lower, constraint.name())? - shift));
                lp = lp.with(expression.leq(coefficient(upper, constraint.name())? - shift));
            }
            ConstraintSet::Semiinteger(_, _) | ConstraintSet::Semicontinuous(_, _) => {
                return Err(SolveError::UnsupportedConstraint {
                    name: constraint.name().to_string(),
                    kind: constraint.set().kind(),
                });
            }
        }
    }

    let solution = lp.solve()?;

    let mut selected = Vec::new();
    let mut continuous = IndexMap::new();
    let mut binary_index = 0;

    for ((_, var), lp_var) in model.variables().zip(&lp_vars) {
        if var.is_binary() {
            binary_index += 1;

            // Binary decision variables come back as floats; treat values
            // above the threshold as one to tolerate tiny numerical noise.
            if solution.value(*lp_var) > BINARY_THRESHOLD {
                selected.push(binary_index);
            }
        } else {
            continuous.insert(var.name().to_string(), solution.value(*lp_var));
        }
    }

    Ok(SolveOutcome {
        selected,
        continuous,
    })
}

/// Translate the variable terms of `expr` (constant excluded).
fn lp_terms<T: Scalar>(
    expr: &LinearExpr<T>,
    lp_vars: &[good_lp::Variable],
    context: &str,
) -> Result<Expression, SolveError> {
    let mut out = Expression::default();

    for (id, coef) in expr.terms() {
        let var = lp_vars
            .get(id.position())
            .ok_or(SolveError::InvariantViolation {
                message: "expression references a variable outside the model",
            })?;

        out += *var * coefficient(coef, context)?;
    }

    Ok(out)
}

fn coefficient<T: Scalar>(value: T, context: &str) -> Result<f64, SolveError> {
    value
        .to_coeff()
        .ok_or_else(|| SolveError::CoefficientNotRepresentable {
            context: context.to_string(),
            value: value.to_string(),
        })
}
