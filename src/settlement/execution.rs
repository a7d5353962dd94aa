//! Execution, validation, and admissibility
//!
//! The executor applies a chosen set of transactions to the opening balances;
//! the validator then requires non-negative securities and non-negative
//! conversion-augmented wealth everywhere, optionally also checking that no
//! further transaction could have settled.

use smallvec::SmallVec;

use crate::{
    num::Scalar,
    settlement::{Market, MarketState, PartyId, SettlementError},
};

/// Apply the deltas of `chosen` (1-based transaction indices, repeats
/// allowed) to the opening balances and return the resulting state.
///
/// Execution conserves totals: the currency and security column sums are
/// checked against the opening sums after applying the deltas.
///
/// # Errors
///
/// Returns [`SettlementError::UnknownTransaction`] for an out-of-range index
/// and [`SettlementError::InvariantViolation`] when conservation fails.
pub fn execute<T: Scalar>(
    market: &Market<T>,
    chosen: &[usize],
) -> Result<MarketState<T>, SettlementError> {
    let counts = transaction_counts(market, chosen)?;

    let mut currency = market.currency0().to_vec();
    let mut security = market.security0().to_vec();

    apply_deltas(market.currency_deltas(), &counts, &mut currency)?;
    apply_deltas(market.security_deltas(), &counts, &mut security)?;

    // Transactions move value between parties, never create it.
    ensure_conserved(market.currency0(), &currency, "currency")?;
    ensure_conserved(market.security0(), &security, "security")?;

    let after_conversion = currency
        .iter()
        .zip(&security)
        .zip(market.conversion())
        .map(|((&cash, &stock), &ratio)| cash + ratio * stock)
        .collect();

    Ok(MarketState {
        currency,
        security,
        after_conversion,
    })
}

/// Execute `chosen` and require non-negative securities and non-negative
/// conversion-augmented wealth for every participant.
///
/// With `check_admissible`, additionally require that no unchosen transaction
/// could still settle; a correct maximum-throughput solution admits none.
///
/// # Errors
///
/// Returns [`SettlementError::InfeasibleSolution`] listing every offending
/// party, or [`SettlementError::NonMaximalSolution`] listing every admissible
/// transaction.
pub fn validate_solution<T: Scalar>(
    market: &Market<T>,
    chosen: &[usize],
    check_admissible: bool,
) -> Result<MarketState<T>, SettlementError> {
    let state = execute(market, chosen)?;

    let negative_security: SmallVec<[PartyId; 8]> = negative_positions(&state.security);
    let negative_wealth: SmallVec<[PartyId; 8]> = negative_positions(&state.after_conversion);

    if !negative_security.is_empty() || !negative_wealth.is_empty() {
        return Err(SettlementError::InfeasibleSolution {
            negative_security,
            negative_wealth,
        });
    }

    if check_admissible {
        let admissible = admissible_transactions(market, &state, chosen);

        if !admissible.is_empty() {
            return Err(SettlementError::NonMaximalSolution { admissible });
        }
    }

    Ok(state)
}

/// The unchosen transactions whose deltas, applied to `state`, would keep
/// every security balance and every conversion-augmented wealth non-negative.
pub fn admissible_transactions<T: Scalar>(
    market: &Market<T>,
    state: &MarketState<T>,
    chosen: &[usize],
) -> SmallVec<[usize; 8]> {
    let mut is_chosen = vec![false; market.num_transactions()];

    for &index in chosen {
        if index >= 1 && index <= is_chosen.len() {
            is_chosen[index - 1] = true;
        }
    }

    (1..=market.num_transactions())
        .filter(|&index| !is_chosen[index - 1] && admits(market, state, index - 1))
        .collect()
}

fn admits<T: Scalar>(market: &Market<T>, state: &MarketState<T>, column: usize) -> bool {
    for party in 0..market.num_participants() {
        let security = state.security[party] + market.security_delta(party, column);
        let currency = state.currency[party] + market.currency_delta(party, column);
        let wealth = currency + market.conversion()[party] * security;

        if is_negative(security) || is_negative(wealth) {
            return false;
        }
    }

    true
}

fn transaction_counts<T: Scalar>(
    market: &Market<T>,
    chosen: &[usize],
) -> Result<Vec<u32>, SettlementError> {
    let mut counts = vec![0_u32; market.num_transactions()];

    for &index in chosen {
        if index == 0 || index > counts.len() {
            return Err(SettlementError::UnknownTransaction { index });
        }

        counts[index - 1] += 1;
    }

    Ok(counts)
}

fn apply_deltas<T: Scalar>(
    deltas: &sprs::CsMat<T>,
    counts: &[u32],
    balances: &mut [T],
) -> Result<(), SettlementError> {
    for (party, row) in deltas.outer_iterator().enumerate() {
        for (column, &delta) in row.iter() {
            if counts[column] == 0 {
                continue;
            }

            let repeats =
                T::from_u32(counts[column]).ok_or(SettlementError::InvariantViolation {
                    message: "repeat count does not fit the scalar type",
                })?;

            balances[party] += delta * repeats;
        }
    }

    Ok(())
}

fn ensure_conserved<T: Scalar>(
    before: &[T],
    after: &[T],
    what: &'static str,
) -> Result<(), SettlementError> {
    let sum = |values: &[T]| values.iter().fold(T::zero(), |acc, &v| acc + v);

    if sum(before).approx_eq(sum(after)) {
        Ok(())
    } else {
        tracing::error!(what, "execution failed to conserve totals");

        Err(SettlementError::InvariantViolation {
            message: "execution must conserve totals",
        })
    }
}

fn negative_positions<T: Scalar>(values: &[T]) -> SmallVec<[PartyId; 8]> {
    values
        .iter()
        .enumerate()
        .filter(|&(_, &value)| is_negative(value))
        .map(|(position, _)| PartyId::from_position(position))
        .collect()
}

fn is_negative<T: Scalar>(value: T) -> bool {
    value < T::zero() && !value.approx_zero()
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::settlement::{ExchangeFactor, PartyInfo, Scenario, TransactionId, TransactionInfo};

    use super::*;

    fn party(id: usize, security: f64, currency: f64) -> PartyInfo<f64> {
        PartyInfo {
            id: PartyId::new(id),
            security_balance: security,
            currency_balance: currency,
            exchange_factor: None,
        }
    }

    fn dvp(id: usize, seller: usize, buyer: usize, sa: f64, ca: f64) -> TransactionInfo<f64> {
        TransactionInfo {
            id: TransactionId::new(id),
            security_from: PartyId::new(seller),
            security_to: PartyId::new(buyer),
            security_amount: sa,
            cash_from: PartyId::new(buyer),
            cash_to: PartyId::new(seller),
            cash_amount: ca,
        }
    }

    fn simple_market() -> Result<Market<f64>, SettlementError> {
        Market::from_scenario(&Scenario::new(
            vec![party(1, 1.0, 0.0), party(2, 0.0, 1.0)],
            vec![dvp(1, 1, 2, 1.0, 1.0)],
        )?)
    }

    fn conversion_market(with_factor: bool) -> Result<Market<f64>, SettlementError> {
        let mut seller = party(1, 1.0, 0.0);

        if with_factor {
            seller.exchange_factor = Some(ExchangeFactor::new(1, 2)?);
        }

        Market::from_scenario(&Scenario::new(
            vec![seller, party(2, 0.0, 1.0)],
            vec![dvp(1, 1, 2, 1.0, 1.0), dvp(2, 2, 1, 1.0, 2.0)],
        )?)
    }

    #[test]
    fn executing_a_dvp_swaps_the_legs() -> TestResult {
        let market = simple_market()?;

        let state = execute(&market, &[1])?;

        assert_eq!(state.security, [0.0, 1.0]);
        assert_eq!(state.currency, [1.0, 0.0]);
        assert_eq!(state.after_conversion, [1.0, 0.0]);

        Ok(())
    }

    #[test]
    fn executing_nothing_returns_the_opening_state() -> TestResult {
        let market = simple_market()?;

        let state = execute(&market, &[])?;

        assert_eq!(state.security, market.security0());
        assert_eq!(state.currency, market.currency0());

        Ok(())
    }

    #[test]
    fn execution_conserves_totals() -> TestResult {
        let market = conversion_market(true)?;

        for chosen in [&[][..], &[1][..], &[2][..], &[1, 2][..]] {
            let state = execute(&market, chosen)?;

            assert!(state.currency.iter().sum::<f64>() == market.currency0().iter().sum::<f64>());
            assert!(state.security.iter().sum::<f64>() == market.security0().iter().sum::<f64>());
        }

        Ok(())
    }

    #[test]
    fn out_of_range_indices_are_rejected() -> TestResult {
        let market = simple_market()?;

        assert!(matches!(
            execute(&market, &[0]).err(),
            Some(SettlementError::UnknownTransaction { index: 0 })
        ));
        assert!(matches!(
            execute(&market, &[2]).err(),
            Some(SettlementError::UnknownTransaction { index: 2 })
        ));

        Ok(())
    }

    #[test]
    fn validator_accepts_the_simple_swap() -> TestResult {
        let market = simple_market()?;

        let state = validate_solution(&market, &[1], true)?;

        assert_eq!(state.security, [0.0, 1.0]);

        Ok(())
    }

    #[test]
    fn validator_reports_every_offending_party() -> TestResult {
        // Without a conversion factor, T2 alone drives P1's cash and P2's
        // securities negative; both offenders must be listed.
        let market = conversion_market(false)?;

        let err = validate_solution(&market, &[2], false).err();

        let Some(SettlementError::InfeasibleSolution {
            negative_security,
            negative_wealth,
        }) = err
        else {
            return Err("expected an infeasible-solution error".into());
        };

        assert_eq!(negative_security.as_slice(), [PartyId::new(2)]);
        assert_eq!(negative_wealth.as_slice(), [PartyId::new(1)]);

        Ok(())
    }

    #[test]
    fn conversion_unlocks_the_return_transaction() -> TestResult {
        // After T1 the seller holds cash only; the buyer can only afford the
        // return leg because the seller's new securities convert to cash.
        let with_factor = conversion_market(true)?;
        let state = execute(&with_factor, &[1])?;

        assert_eq!(
            admissible_transactions(&with_factor, &state, &[1]).as_slice(),
            [2]
        );

        let without_factor = conversion_market(false)?;
        let state = execute(&without_factor, &[1])?;

        assert!(admissible_transactions(&without_factor, &state, &[1]).is_empty());

        Ok(())
    }

    #[test]
    fn maximal_solutions_pass_the_admissibility_check() -> TestResult {
        let market = conversion_market(true)?;

        let err = validate_solution(&market, &[1], true).err();

        assert!(matches!(
            err,
            Some(SettlementError::NonMaximalSolution { admissible }) if admissible.as_slice() == [2]
        ));

        validate_solution(&market, &[1, 2], true)?;

        Ok(())
    }
}
