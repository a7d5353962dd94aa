//! Qumo prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    model::{
        Constraint, ConstraintKey, ConstraintSet, LinearExpr, Model, ModelError, QuadExpr, Sense,
        VarPair, Variable, VariableId,
    },
    num::Scalar,
    reduce::{
        Envelope, Qumo, ReduceError, boxify, convert_to_equations, extract_qumo, infer_limits,
        substitute_penalties, to_qumo, to_qumo_in_place,
    },
    settlement::{
        ExchangeFactor, Market, MarketState, PartyId, PartyInfo, Scenario, ScenarioError,
        SettlementError, TransactionId, TransactionInfo, admissible_transactions, execute,
        parse_from_file, parse_scenario_str, settle, settlement_model, validate_solution,
    },
    solver::{MilpBackend, SolveError, SolveOutcome, SolverBackend, solve},
};
