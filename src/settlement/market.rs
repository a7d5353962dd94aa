//! Sparse market assembly
//!
//! Lowers a validated [`Scenario`] into dense per-party vectors and two
//! participants × transactions sparse delta matrices. Assembly goes through a
//! triplet matrix so duplicate entries sum rather than overwrite.

use sprs::{CsMat, TriMat};

use crate::{
    num::Scalar,
    settlement::{Scenario, SettlementError},
};

/// Opening balances, conversion ratios, and per-transaction balance deltas of
/// a settlement market.
#[derive(Debug, Clone)]
pub struct Market<T> {
    currency0: Vec<T>,
    security0: Vec<T>,
    conversion: Vec<T>,
    currency: CsMat<T>,
    security: CsMat<T>,
}

impl<T: Scalar> Market<T> {
    /// Assemble a market from a scenario, validating it first.
    ///
    /// Each transaction `t` contributes four nonzeros:
    /// `security[sf, t] = −sa`, `security[st, t] = +sa`,
    /// `currency[cf, t] = −ca`, `currency[ct, t] = +ca`.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`ScenarioError`](crate::settlement::ScenarioError)
    /// when validation fails, or [`SettlementError::InvariantViolation`] when
    /// a conversion ratio does not fit the scalar type.
    pub fn from_scenario(scenario: &Scenario<T>) -> Result<Self, SettlementError> {
        scenario.validate()?;

        let num_parties = scenario.parties.len();
        let num_transactions = scenario.transactions.len();

        let mut currency0 = Vec::with_capacity(num_parties);
        let mut security0 = Vec::with_capacity(num_parties);
        let mut conversion = Vec::with_capacity(num_parties);

        for party in &scenario.parties {
            currency0.push(party.currency_balance);
            security0.push(party.security_balance);

            conversion.push(match party.exchange_factor {
                Some(factor) => {
                    factor
                        .ratio()
                        .ok_or(SettlementError::InvariantViolation {
                            message: "exchange factor does not fit the scalar type",
                        })?
                }
                None => T::zero(),
            });
        }

        let mut currency = TriMat::new((num_parties, num_transactions));
        let mut security = TriMat::new((num_parties, num_transactions));
        let mut max_row = 0;

        for (column, transaction) in scenario.transactions.iter().enumerate() {
            security.add_triplet(
                transaction.security_from.position(),
                column,
                -transaction.security_amount,
            );
            security.add_triplet(
                transaction.security_to.position(),
                column,
                transaction.security_amount,
            );
            currency.add_triplet(
                transaction.cash_from.position(),
                column,
                -transaction.cash_amount,
            );
            currency.add_triplet(
                transaction.cash_to.position(),
                column,
                transaction.cash_amount,
            );

            max_row = max_row
                .max(transaction.security_from.position())
                .max(transaction.security_to.position());
        }

        // Validation has range-checked every reference, so the encountered
        // maxima cannot escape the declared shape. Parties untouched by any
        // transaction are legal.
        debug_assert!(num_transactions == 0 || max_row < num_parties);

        Ok(Self {
            currency0,
            security0,
            conversion,
            currency: currency.to_csr(),
            security: security.to_csr(),
        })
    }

    /// Number of participants.
    pub fn num_participants(&self) -> usize {
        self.currency0.len()
    }

    /// Number of requested transactions.
    pub fn num_transactions(&self) -> usize {
        self.currency.cols()
    }

    /// Opening currency balances, indexed by party position.
    pub fn currency0(&self) -> &[T] {
        &self.currency0
    }

    /// Opening security balances, indexed by party position.
    pub fn security0(&self) -> &[T] {
        &self.security0
    }

    /// Conversion ratios, indexed by party position; zero without an exchange
    /// factor.
    pub fn conversion(&self) -> &[T] {
        &self.conversion
    }

    /// The participants × transactions currency delta matrix.
    pub fn currency_deltas(&self) -> &CsMat<T> {
        &self.currency
    }

    /// The participants × transactions security delta matrix.
    pub fn security_deltas(&self) -> &CsMat<T> {
        &self.security
    }

    /// Currency delta of transaction column `column` for party row `row`.
    pub fn currency_delta(&self, row: usize, column: usize) -> T {
        entry(&self.currency, row, column)
    }

    /// Security delta of transaction column `column` for party row `row`.
    pub fn security_delta(&self, row: usize, column: usize) -> T {
        entry(&self.security, row, column)
    }
}

fn entry<T: Scalar>(matrix: &CsMat<T>, row: usize, column: usize) -> T {
    matrix
        .outer_view(row)
        .and_then(|r| r.get(column).copied())
        .unwrap_or_else(T::zero)
}

/// Post-execution balances of every participant.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketState<T> {
    /// Currency balance per party position.
    pub currency: Vec<T>,

    /// Security balance per party position.
    pub security: Vec<T>,

    /// `currency[p] + conversion[p] · security[p]` per party position.
    pub after_conversion: Vec<T>,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::settlement::{ExchangeFactor, PartyId, PartyInfo, TransactionId, TransactionInfo};

    use super::*;

    fn scenario() -> Result<Scenario<f64>, crate::settlement::ScenarioError> {
        Scenario::new(
            vec![
                PartyInfo {
                    id: PartyId::new(1),
                    security_balance: 1.0,
                    currency_balance: 0.0,
                    exchange_factor: Some(ExchangeFactor::new(1, 2)?),
                },
                PartyInfo {
                    id: PartyId::new(2),
                    security_balance: 0.0,
                    currency_balance: 1.0,
                    exchange_factor: None,
                },
            ],
            vec![TransactionInfo {
                id: TransactionId::new(1),
                security_from: PartyId::new(1),
                security_to: PartyId::new(2),
                security_amount: 1.0,
                cash_from: PartyId::new(2),
                cash_to: PartyId::new(1),
                cash_amount: 3.0,
            }],
        )
    }

    #[test]
    fn assembly_produces_four_nonzeros_per_transaction() -> TestResult {
        let market = Market::from_scenario(&scenario()?)?;

        assert_eq!(market.num_participants(), 2);
        assert_eq!(market.num_transactions(), 1);

        assert_eq!(market.security_delta(0, 0), -1.0);
        assert_eq!(market.security_delta(1, 0), 1.0);
        assert_eq!(market.currency_delta(1, 0), -3.0);
        assert_eq!(market.currency_delta(0, 0), 3.0);

        assert_eq!(market.security_deltas().nnz(), 2);
        assert_eq!(market.currency_deltas().nnz(), 2);

        Ok(())
    }

    #[test]
    fn opening_vectors_follow_party_order() -> TestResult {
        let market = Market::from_scenario(&scenario()?)?;

        assert_eq!(market.security0(), [1.0, 0.0]);
        assert_eq!(market.currency0(), [0.0, 1.0]);
        assert_eq!(market.conversion(), [2.0, 0.0]);

        Ok(())
    }

    #[test]
    fn absent_entries_read_as_zero() -> TestResult {
        let market = Market::from_scenario(&scenario()?)?;

        assert_eq!(market.security_delta(0, 5), 0.0);
        assert_eq!(market.currency_delta(7, 0), 0.0);

        Ok(())
    }

    #[test]
    fn invalid_scenarios_are_rejected_before_assembly() -> TestResult {
        let mut bad = scenario()?;
        bad.transactions[0].security_amount = -1.0;

        assert!(matches!(
            Market::from_scenario(&bad).err(),
            Some(SettlementError::Scenario(_))
        ));

        Ok(())
    }
}
