//! Transaction settlement
//!
//! Builds maximum-throughput DvP settlement problems: a typed scenario is
//! assembled into a sparse [`Market`], formulated as an integer program over
//! the crate's [`Model`](crate::model::Model) type, solved through the MILP
//! backend, and checked by the executor/validator.

pub mod execution;
pub mod formulation;
pub mod market;
pub mod parser;
pub mod scenario;

use smallvec::SmallVec;
use thiserror::Error;

pub use execution::{admissible_transactions, execute, validate_solution};
pub use formulation::{settle, settle_with, settlement_model};
pub use market::{Market, MarketState};
pub use parser::{parse_from_file, parse_scenario_str};
pub use scenario::{
    ExchangeFactor, PartyId, PartyInfo, Scenario, ScenarioError, TransactionId, TransactionInfo,
};

use crate::solver::SolveError;

/// Errors raised while assembling, solving, or checking a settlement.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// Wrapped scenario validation error.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// Wrapped solver backend error.
    #[error(transparent)]
    Solver(#[from] SolveError),

    /// A transaction index outside `1..=num_transactions`.
    #[error("transaction index {index} is outside the market")]
    UnknownTransaction {
        /// The offending 1-based index
        index: usize,
    },

    /// A solution leaving a negative balance somewhere. Every offender is
    /// reported, not just the first.
    #[error(
        "solution leaves negative balances: securities at {negative_security:?}, wealth at {negative_wealth:?}"
    )]
    InfeasibleSolution {
        /// Parties whose security balance goes negative
        negative_security: SmallVec<[PartyId; 8]>,

        /// Parties whose conversion-augmented wealth goes negative
        negative_wealth: SmallVec<[PartyId; 8]>,
    },

    /// A feasible but non-maximal solution: more transactions could settle.
    #[error("solution is not maximal: transactions {admissible:?} are still admissible")]
    NonMaximalSolution {
        /// 1-based indices of the still-admissible transactions
        admissible: SmallVec<[usize; 8]>,
    },

    /// Internal settlement invariant was violated (this is a bug).
    #[error("settlement invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },
}
