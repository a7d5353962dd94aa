//! Maximum-throughput settlement formulation
//!
//! Builds the integer program over the crate's [`Model`] type: one binary
//! decision per requested transaction, a non-negative post-trade security row
//! per participant, and a non-negative conversion-augmented cash row per
//! participant. The model composes with the QUMO reducer like any other.

use crate::{
    model::{Constraint, ConstraintSet, LinearExpr, Model, QuadExpr, Sense, Variable, VariableId},
    num::Scalar,
    settlement::{Market, PartyId, SettlementError},
    solver::{self, SolverBackend},
};

/// Build the maximum-throughput integer program for `market`.
///
/// Variables are `x[T1]..x[Tn]`, binary, in transaction order. Constraints
/// come in canonical order and naming: `security[P<p>]` for every
/// participant, then `currency[P<p>]` for every participant. The objective
/// maximises the number of executed transactions.
///
/// # Errors
///
/// Returns [`SettlementError::InvariantViolation`] if the assembled rows are
/// rejected by the model (which would be a bug in the assembler).
pub fn settlement_model<T: Scalar>(market: &Market<T>) -> Result<Model<T>, SettlementError> {
    let mut model = Model::new(Sense::Maximise);

    let xs: Vec<VariableId> = (1..=market.num_transactions())
        .map(|t| model.add_variable(Variable::binary(format!("x[T{t}]"))))
        .collect();

    for (party, row) in market.security_deltas().outer_iterator().enumerate() {
        let mut func = LinearExpr::constant(market.security0()[party]);

        for (column, &delta) in row.iter() {
            func.add_term(xs[column], delta);
        }

        add_row(&mut model, format!("security[{}]", PartyId::from_position(party)), func)?;
    }

    for (party, row) in market.currency_deltas().outer_iterator().enumerate() {
        let ratio = market.conversion()[party];

        let mut func = LinearExpr::constant(
            market.currency0()[party] + ratio * market.security0()[party],
        );

        for (column, &delta) in row.iter() {
            func.add_term(xs[column], delta);
        }

        // The cash row is conversion-augmented: each transaction's security
        // delta also moves this party's spendable wealth at its ratio.
        if !ratio.approx_zero() {
            if let Some(security_row) = market.security_deltas().outer_view(party) {
                for (column, &delta) in security_row.iter() {
                    func.add_term(xs[column], ratio * delta);
                }
            }
        }

        add_row(&mut model, format!("currency[{}]", PartyId::from_position(party)), func)?;
    }

    let mut objective = LinearExpr::new();

    for &x in &xs {
        objective.add_term(x, T::one());
    }

    model.set_objective(QuadExpr::from_linear(objective));

    Ok(model)
}

/// Formulate `market` and solve it with the default MILP backend, returning
/// the selected 1-based transaction indices in ascending order.
///
/// # Errors
///
/// Returns a [`SettlementError`] when formulation or solving fails.
pub fn settle<T: Scalar>(market: &Market<T>) -> Result<Vec<usize>, SettlementError> {
    settle_with(market, &solver::MilpBackend)
}

/// [`settle`] with an explicit solver backend.
///
/// # Errors
///
/// Returns a [`SettlementError`] when formulation or solving fails.
pub fn settle_with<T: Scalar, B: SolverBackend>(
    market: &Market<T>,
    backend: &B,
) -> Result<Vec<usize>, SettlementError> {
    let model = settlement_model(market)?;
    let outcome = backend.solve(&model)?;

    // The binary variables are exactly x[T1]..x[Tn] in order, so the solve
    // contract's selected indices are transaction indices.
    Ok(outcome.selected)
}

fn add_row<T: Scalar>(
    model: &mut Model<T>,
    name: String,
    func: LinearExpr<T>,
) -> Result<(), SettlementError> {
    model
        .add_constraint(Constraint::new(name, func, ConstraintSet::GreaterThan(T::zero())))
        .map_err(|_| SettlementError::InvariantViolation {
            message: "assembled settlement row was rejected by the model",
        })?;

    Ok(())
}
