// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use crate::models::CandidateTransaction;
use crate::rates::{self, RateSource};
use crate::utils::round_cents;
use chrono::NaiveDate;
use csv::StringRecord;
use rusqlite::Connection;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Caller-supplied normalization knobs. Cards in `reimbursable_cards` mark
/// rows as reimbursable (USD-native, exempt from conversion).
#[derive(Debug, Clone, Default)]
pub struct ImportConfig {
    pub reimbursable_cards: HashSet<String>,
}

/// Statement column order: date;description;amount;subcategory;category;card
const COL_DATE: usize = 0;
const COL_DESCRIPTION: usize = 1;
const COL_AMOUNT: usize = 2;
const COL_SUBCATEGORY: usize = 3;
const COL_CATEGORY: usize = 4;
const COL_CARD: usize = 5;

/// Parse one raw statement row into a candidate. Currency policy is applied
/// separately so a preview can report unresolved rates per row.
pub fn normalize(
    rec: &StringRecord,
    line: usize,
    cfg: &ImportConfig,
) -> Result<CandidateTransaction, LedgerError> {
    let field = |idx: usize| rec.get(idx).map(str::trim).unwrap_or("");

    let date_raw = field(COL_DATE);
    let date = parse_statement_date(date_raw)
        .ok_or_else(|| LedgerError::parse(line, format!("invalid date '{}'", date_raw)))?;

    let description = field(COL_DESCRIPTION);
    if description.is_empty() {
        return Err(LedgerError::parse(line, "empty description"));
    }

    let amount_raw = field(COL_AMOUNT);
    let amount = parse_statement_amount(amount_raw)
        .ok_or_else(|| LedgerError::parse(line, format!("invalid amount '{}'", amount_raw)))?;

    let card = Some(field(COL_CARD))
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let reimbursable = card
        .as_deref()
        .is_some_and(|c| cfg.reimbursable_cards.contains(c));

    let subcategory = Some(field(COL_SUBCATEGORY))
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let category = Some(field(COL_CATEGORY))
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(CandidateTransaction {
        uuid: identity_key(date, description, amount),
        date,
        description: description.to_string(),
        amount,
        card,
        reimbursable,
        exchange_rate: None,
        amount_eur: None,
        amount_usd: None,
        subcategory,
        category,
        budget_type: None,
        confidence: None,
    })
}

/// Fill in the normalized amounts.
///
/// Reimbursable rows are USD-native and never carry an EUR amount or rate.
/// Regular rows are EUR-native; the USD amount is EUR x rate, rounded
/// half-up to cents. Returns false when the rate is unresolved: the row is
/// held for manual rate entry, never committed with an empty conversion.
pub fn apply_currency_policy(
    cand: &mut CandidateTransaction,
    conn: &Connection,
    source: &dyn RateSource,
) -> Result<bool, LedgerError> {
    if cand.reimbursable {
        cand.amount_eur = None;
        cand.exchange_rate = None;
        cand.amount_usd = Some(cand.amount);
        return Ok(true);
    }
    cand.amount_eur = Some(cand.amount);
    match rates::get_rate(conn, source, cand.date) {
        Ok(rate) => {
            apply_rate(cand, rate);
            Ok(true)
        }
        Err(LedgerError::RateUnresolved(_)) => {
            cand.exchange_rate = None;
            cand.amount_usd = None;
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Manual rate entry for a held row.
pub fn apply_rate(cand: &mut CandidateTransaction, rate: Decimal) {
    cand.exchange_rate = Some(rate);
    cand.amount_usd = Some(round_cents(cand.amount * rate));
}

/// Stable identity key: SHA-256 over (date, description, amount). This, not
/// a storage counter, is a transaction's identity and the dedup handle.
pub fn identity_key(date: NaiveDate, description: &str, amount: Decimal) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(description.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(amount.normalize().to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Statement dates arrive as day.month.year.
pub fn parse_statement_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d.%m.%Y").ok()
}

/// Localized decimal: optional thousands dots, comma decimal separator, and
/// an optional trailing currency symbol which is stripped, not interpreted.
pub fn parse_statement_amount(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim();
    for tag in ["€", "EUR", "$", "USD"] {
        s = s.trim_end_matches(tag).trim_end();
    }
    if s.is_empty() {
        return None;
    }
    let normalized: String = s.replace('.', "").replace(',', ".");
    if !normalized
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == '-')
    {
        return None;
    }
    normalized.parse::<Decimal>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_localized_amounts() {
        assert_eq!(
            parse_statement_amount("1.234,56 €").unwrap().to_string(),
            "1234.56"
        );
        assert_eq!(parse_statement_amount("12,30").unwrap().to_string(), "12.30");
        assert_eq!(parse_statement_amount("-7,99 EUR").unwrap().to_string(), "-7.99");
        assert_eq!(parse_statement_amount("1200").unwrap().to_string(), "1200");
        assert!(parse_statement_amount("abc").is_none());
        assert!(parse_statement_amount("").is_none());
    }

    #[test]
    fn parses_statement_dates() {
        assert_eq!(
            parse_statement_date("03.02.2026").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
        );
        assert!(parse_statement_date("2026-02-03").is_none());
        assert!(parse_statement_date("31.02.2026").is_none());
    }

    #[test]
    fn identity_key_is_stable_and_sensitive() {
        let d = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let a: Decimal = "12.30".parse().unwrap();
        let k1 = identity_key(d, "REWE BERLIN", a);
        let k2 = identity_key(d, "REWE BERLIN", a);
        assert_eq!(k1, k2);
        assert_ne!(k1, identity_key(d, "REWE MUENCHEN", a));
        assert_ne!(k1, identity_key(d, "REWE BERLIN", "12.31".parse().unwrap()));
        // Trailing zeros do not change identity.
        assert_eq!(k1, identity_key(d, "REWE BERLIN", "12.300".parse().unwrap()));
    }
}
