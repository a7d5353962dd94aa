//! Scenario text format
//!
//! Two comma-separated sections divided by blank lines: parties first,
//! requested transactions second. Whitespace around commas is ignored and
//! every numeric literal is a non-negative decimal integer.
//!
//! ```text
//! Party Id,Security Balance,Currency Balance,CCF Exchange Factor
//! P1,1,0,P1 converts 1 S into 2 C
//! P2,0,1
//!
//! Transaction Id,From,To,Security Amount,From,To,Cash Amount
//! T1,P1,P2,1,P2,P1,1
//! ```

use std::{fs, path::Path};

use thiserror::Error;

use crate::{
    num::Scalar,
    settlement::{
        ExchangeFactor, Market, PartyId, PartyInfo, Scenario, ScenarioError, SettlementError,
        TransactionId, TransactionInfo,
    },
};

/// Expected header of the party section.
pub const PARTY_HEADER: &str = "Party Id,Security Balance,Currency Balance,CCF Exchange Factor";

/// Expected header of the transaction section.
pub const TRANSACTION_HEADER: &str = "Transaction Id,From,To,Security Amount,From,To,Cash Amount";

/// Errors raised while parsing scenario text. Line numbers are 1-based.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Wrapped file-system error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A section header is missing or malformed.
    #[error("line {line}: expected header `{expected}`")]
    MissingHeader {
        /// Line where the header was expected
        line: usize,

        /// The header that should be there
        expected: &'static str,
    },

    /// A row with the wrong number of comma-separated fields.
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        /// Line of the offending row
        line: usize,

        /// Human description of the accepted field counts
        expected: &'static str,

        /// Fields actually present
        found: usize,
    },

    /// A field that does not parse as what the format requires there.
    #[error("line {line}: invalid {what}: `{found}`")]
    InvalidField {
        /// Line of the offending row
        line: usize,

        /// What the field should have been
        what: &'static str,

        /// The text found
        found: String,
    },

    /// An exchange clause naming a different party than its row.
    #[error("line {line}: exchange clause names {found}, expected the row's party {expected}")]
    ExchangePartyMismatch {
        /// Line of the offending row
        line: usize,

        /// Party named by the clause
        found: PartyId,

        /// Party owning the row
        expected: PartyId,
    },

    /// Wrapped scenario validation error.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// Wrapped market assembly error.
    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

/// Parse a scenario file and assemble its market.
///
/// # Errors
///
/// Returns a [`ParseError`] on IO failure, malformed text, or an invalid
/// scenario.
pub fn parse_from_file<T: Scalar>(path: impl AsRef<Path>) -> Result<Market<T>, ParseError> {
    let input = fs::read_to_string(path)?;
    let scenario = parse_scenario_str(&input)?;

    Ok(Market::from_scenario(&scenario)?)
}

/// Parse scenario text into its validated data model.
///
/// # Errors
///
/// Returns a [`ParseError`] on malformed text or an invalid scenario.
pub fn parse_scenario_str<T: Scalar>(input: &str) -> Result<Scenario<T>, ParseError> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()));

    let mut parties = Vec::new();
    let mut transactions = Vec::new();

    let header = lines.by_ref().find(|(_, text)| !text.is_empty());
    expect_header(header, PARTY_HEADER)?;

    // Party rows run until the first blank line.
    for (line, text) in lines.by_ref() {
        if text.is_empty() {
            break;
        }

        parties.push(party_row(line, text)?);
    }

    // Skip any further blank separator lines before the transaction header.
    let header = lines.by_ref().find(|(_, text)| !text.is_empty());
    expect_header(header, TRANSACTION_HEADER)?;

    for (line, text) in lines {
        if text.is_empty() {
            continue;
        }

        transactions.push(transaction_row(line, text)?);
    }

    Ok(Scenario::new(parties, transactions)?)
}

fn expect_header(
    found: Option<(usize, &str)>,
    expected: &'static str,
) -> Result<(), ParseError> {
    match found {
        Some((_, text)) if normalised(text) == normalised(expected) => Ok(()),
        Some((line, _)) => Err(ParseError::MissingHeader { line, expected }),
        None => Err(ParseError::MissingHeader { line: 0, expected }),
    }
}

fn normalised(header: &str) -> String {
    header
        .split(',')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(",")
}

fn party_row<T: Scalar>(line: usize, text: &str) -> Result<PartyInfo<T>, ParseError> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();

    if fields.len() != 3 && fields.len() != 4 {
        return Err(ParseError::FieldCount {
            line,
            expected: "3 or 4",
            found: fields.len(),
        });
    }

    let id = party_id(line, fields[0])?;
    let security_balance = amount(line, fields[1], "security balance")?;
    let currency_balance = amount(line, fields[2], "currency balance")?;

    let exchange_factor = match fields.get(3) {
        Some(&clause) if !clause.is_empty() => Some(exchange_clause(line, clause, id)?),
        _ => None,
    };

    Ok(PartyInfo {
        id,
        security_balance,
        currency_balance,
        exchange_factor,
    })
}

/// Parse the clause `P<id> converts <s> S into <c> C`.
fn exchange_clause(
    line: usize,
    clause: &str,
    row_party: PartyId,
) -> Result<ExchangeFactor, ParseError> {
    let tokens: Vec<&str> = clause.split_whitespace().collect();

    let [party, converts, security, s, into, currency, c] = tokens.as_slice() else {
        return Err(invalid(line, "exchange clause", clause));
    };

    if *converts != "converts" || *s != "S" || *into != "into" || *c != "C" {
        return Err(invalid(line, "exchange clause", clause));
    }

    let clause_party = party_id(line, party)?;

    if clause_party != row_party {
        return Err(ParseError::ExchangePartyMismatch {
            line,
            found: clause_party,
            expected: row_party,
        });
    }

    let security = integer(line, security, "exchange security amount")?;
    let currency = integer(line, currency, "exchange currency amount")?;

    Ok(ExchangeFactor::new(security, currency)?)
}

fn transaction_row<T: Scalar>(line: usize, text: &str) -> Result<TransactionInfo<T>, ParseError> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();

    let [id, security_from, security_to, security_amount, cash_from, cash_to, cash_amount] =
        fields.as_slice()
    else {
        return Err(ParseError::FieldCount {
            line,
            expected: "7",
            found: fields.len(),
        });
    };

    Ok(TransactionInfo {
        id: transaction_id(line, id)?,
        security_from: party_id(line, security_from)?,
        security_to: party_id(line, security_to)?,
        security_amount: amount(line, security_amount, "security amount")?,
        cash_from: party_id(line, cash_from)?,
        cash_to: party_id(line, cash_to)?,
        cash_amount: amount(line, cash_amount, "cash amount")?,
    })
}

fn party_id(line: usize, field: &str) -> Result<PartyId, ParseError> {
    field
        .strip_prefix('P')
        .and_then(|digits| digits.parse().ok())
        .map(PartyId::new)
        .ok_or_else(|| invalid(line, "party id", field))
}

fn transaction_id(line: usize, field: &str) -> Result<TransactionId, ParseError> {
    field
        .strip_prefix('T')
        .and_then(|digits| digits.parse().ok())
        .map(TransactionId::new)
        .ok_or_else(|| invalid(line, "transaction id", field))
}

fn integer(line: usize, field: &str, what: &'static str) -> Result<u32, ParseError> {
    field.parse().map_err(|_| invalid(line, what, field))
}

fn amount<T: Scalar>(line: usize, field: &str, what: &'static str) -> Result<T, ParseError> {
    let raw: u64 = field.parse().map_err(|_| invalid(line, what, field))?;

    T::from_u64(raw).ok_or_else(|| invalid(line, what, field))
}

fn invalid(line: usize, what: &'static str, found: &str) -> ParseError {
    ParseError::InvalidField {
        line,
        what,
        found: found.to_string(),
    }
}
