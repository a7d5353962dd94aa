//! Settlement scenario data model
//!
//! Typed parties, delivery-versus-payment transactions, and exchange factors,
//! with the validation the assembler relies on: dense 1-based ids,
//! non-negative balances, positive amounts, and the DvP pairing invariant.

use std::fmt;

use thiserror::Error;

use crate::num::Scalar;

/// Participant identifier, displayed as `P<id>`. Ids are positive and dense:
/// the `n`-th party of a scenario has id `n`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartyId(usize);

impl PartyId {
    /// Wrap a raw 1-based id.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub(crate) fn from_position(position: usize) -> Self {
        Self(position + 1)
    }

    /// The raw 1-based id.
    pub fn get(self) -> usize {
        self.0
    }

    /// The 0-based row position in market matrices.
    pub(crate) fn position(self) -> usize {
        self.0 - 1
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl fmt::Debug for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Transaction identifier, displayed as `T<id>`. Ids are positive and dense.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(usize);

impl TransactionId {
    /// Wrap a raw 1-based id.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// The raw 1-based id.
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Conversion rule "`security` units of security convert to `currency` units
/// of cash"; both sides must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeFactor {
    security: u32,
    currency: u32,
}

impl ExchangeFactor {
    /// Create an exchange factor.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::InvalidExchangeFactor`] when either side is
    /// zero.
    pub fn new(security: u32, currency: u32) -> Result<Self, ScenarioError> {
        if security == 0 || currency == 0 {
            return Err(ScenarioError::InvalidExchangeFactor { security, currency });
        }

        Ok(Self { security, currency })
    }

    /// Security units per conversion.
    pub fn security(self) -> u32 {
        self.security
    }

    /// Currency units per conversion.
    pub fn currency(self) -> u32 {
        self.currency
    }

    /// The conversion ratio `currency / security` in the scalar type.
    pub fn ratio<T: Scalar>(self) -> Option<T> {
        Some(T::from_u32(self.currency)? / T::from_u32(self.security)?)
    }
}

/// A participant with its opening balances and optional conversion rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PartyInfo<T> {
    /// Party identifier; must equal the party's 1-based position.
    pub id: PartyId,

    /// Opening security balance, non-negative.
    pub security_balance: T,

    /// Opening currency balance, non-negative.
    pub currency_balance: T,

    /// Optional security-to-cash conversion rule.
    pub exchange_factor: Option<ExchangeFactor>,
}

/// A requested DvP transaction: a security leg and an opposite cash leg
/// between the same two parties.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInfo<T> {
    /// Transaction identifier; must equal the transaction's 1-based position.
    pub id: TransactionId,

    /// Party delivering the securities.
    pub security_from: PartyId,

    /// Party receiving the securities.
    pub security_to: PartyId,

    /// Security amount, positive.
    pub security_amount: T,

    /// Party paying the cash.
    pub cash_from: PartyId,

    /// Party receiving the cash.
    pub cash_to: PartyId,

    /// Cash amount, positive.
    pub cash_amount: T,
}

/// Errors raised while validating a scenario.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    /// Party ids must be the dense sequence `P1..Pn` in order.
    #[error("party at position {position} has id {found}, expected P{position}")]
    NonDensePartyId {
        /// 1-based position in the party list
        position: usize,

        /// The id found there
        found: PartyId,
    },

    /// Transaction ids must be the dense sequence `T1..Tn` in order.
    #[error("transaction at position {position} has id {found}, expected T{position}")]
    NonDenseTransactionId {
        /// 1-based position in the transaction list
        position: usize,

        /// The id found there
        found: TransactionId,
    },

    /// A party opens with a negative balance.
    #[error("party {party} has a negative {balance} balance")]
    NegativeBalance {
        /// The offending party
        party: PartyId,

        /// Which balance is negative
        balance: &'static str,
    },

    /// An exchange factor with a zero side.
    #[error(
        "exchange factor must convert a positive security amount into a positive currency amount, got {security} S into {currency} C"
    )]
    InvalidExchangeFactor {
        /// Security units supplied
        security: u32,

        /// Currency units supplied
        currency: u32,
    },

    /// A transaction amount that is not strictly positive.
    #[error("transaction {transaction} has a non-positive {amount} amount")]
    NonPositiveAmount {
        /// The offending transaction
        transaction: TransactionId,

        /// Which amount is non-positive
        amount: &'static str,
    },

    /// A transaction delivering securities from a party to itself.
    #[error("transaction {transaction} transfers securities from {party} to itself")]
    SelfTransfer {
        /// The offending transaction
        transaction: TransactionId,

        /// The party on both ends
        party: PartyId,
    },

    /// The cash leg does not mirror the security leg.
    #[error(
        "transaction {transaction} is not delivery-versus-payment: the cash leg must run opposite to the security leg between the same parties"
    )]
    BrokenDvp {
        /// The offending transaction
        transaction: TransactionId,
    },

    /// A transaction referencing a party outside the scenario.
    #[error("transaction {transaction} references unknown party {party}")]
    UnknownParty {
        /// The offending transaction
        transaction: TransactionId,

        /// The id that is not part of the scenario
        party: PartyId,
    },
}

/// An ordered market scenario: parties first, requested transactions second.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario<T> {
    /// Participants, in id order.
    pub parties: Vec<PartyInfo<T>>,

    /// Requested transactions, in id order.
    pub transactions: Vec<TransactionInfo<T>>,
}

impl<T: Scalar> Scenario<T> {
    /// Build and validate a scenario.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScenarioError`] encountered.
    pub fn new(
        parties: Vec<PartyInfo<T>>,
        transactions: Vec<TransactionInfo<T>>,
    ) -> Result<Self, ScenarioError> {
        let scenario = Self {
            parties,
            transactions,
        };

        scenario.validate()?;

        Ok(scenario)
    }

    /// Check every local invariant of the scenario.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScenarioError`] encountered.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        for (position, party) in self.parties.iter().enumerate() {
            if party.id.get() != position + 1 {
                return Err(ScenarioError::NonDensePartyId {
                    position: position + 1,
                    found: party.id,
                });
            }

            if party.security_balance < T::zero() {
                return Err(ScenarioError::NegativeBalance {
                    party: party.id,
                    balance: "security",
                });
            }

            if party.currency_balance < T::zero() {
                return Err(ScenarioError::NegativeBalance {
                    party: party.id,
                    balance: "currency",
                });
            }
        }

        for (position, transaction) in self.transactions.iter().enumerate() {
            if transaction.id.get() != position + 1 {
                return Err(ScenarioError::NonDenseTransactionId {
                    position: position + 1,
                    found: transaction.id,
                });
            }

            if transaction.security_amount <= T::zero() {
                return Err(ScenarioError::NonPositiveAmount {
                    transaction: transaction.id,
                    amount: "security",
                });
            }

            if transaction.cash_amount <= T::zero() {
                return Err(ScenarioError::NonPositiveAmount {
                    transaction: transaction.id,
                    amount: "cash",
                });
            }

            if transaction.security_from == transaction.security_to {
                return Err(ScenarioError::SelfTransfer {
                    transaction: transaction.id,
                    party: transaction.security_from,
                });
            }

            if transaction.security_from != transaction.cash_to
                || transaction.security_to != transaction.cash_from
            {
                return Err(ScenarioError::BrokenDvp {
                    transaction: transaction.id,
                });
            }

            for party in [transaction.security_from, transaction.security_to] {
                if party.get() == 0 || party.get() > self.parties.len() {
                    return Err(ScenarioError::UnknownParty {
                        transaction: transaction.id,
                        party,
                    });
                }
            }
        }

        Ok(())
    }
}
