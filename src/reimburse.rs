// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use crate::models::ReimbursementRecord;
use crate::utils::month_bounds;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;

/// Recompute a month's reimbursable total from the ledger and upsert the
/// rollup row. Idempotent; settled amounts are never touched.
pub fn recompute(
    conn: &Connection,
    year: i32,
    month: u32,
) -> Result<ReimbursementRecord, LedgerError> {
    let (first, last) =
        month_bounds(year, month).map_err(|e| LedgerError::parse(0, e.to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT amount_usd FROM transactions
         WHERE reimbursable=1 AND archived=0 AND date>=?1 AND date<=?2",
    )?;
    let mut rows = stmt.query(params![first.to_string(), last.to_string()])?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let s: String = r.get(0)?;
        total += s
            .parse::<Decimal>()
            .map_err(|_| LedgerError::parse(0, format!("invalid amount '{}' in ledger", s)))?;
    }
    conn.execute(
        "INSERT INTO reimbursements(year, month, total_usd) VALUES (?1, ?2, ?3)
         ON CONFLICT(year, month) DO UPDATE SET total_usd=excluded.total_usd",
        params![year, month, total.to_string()],
    )?;
    record(conn, year, month)?.ok_or_else(|| {
        LedgerError::parse(0, format!("missing reimbursement row {}-{:02}", year, month))
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementOutcome {
    pub record: ReimbursementRecord,
    /// Settled above the derived total. Recorded verbatim and surfaced for
    /// review, not auto-corrected.
    pub over_settled: bool,
}

/// Record a partial or full settlement against a month. Amounts accumulate;
/// over-settlement is flagged, never rejected.
pub fn settle(
    conn: &Connection,
    year: i32,
    month: u32,
    amount: Decimal,
    date: NaiveDate,
) -> Result<SettlementOutcome, LedgerError> {
    let existing = record(conn, year, month)?
        .ok_or_else(|| LedgerError::parse(0, format!("no reimbursement row {}-{:02}", year, month)))?;
    let settled = existing.settled_usd + amount;
    conn.execute(
        "UPDATE reimbursements SET settled_usd=?1, settlement_date=?2
         WHERE year=?3 AND month=?4",
        params![settled.to_string(), date.to_string(), year, month],
    )?;
    let updated = record(conn, year, month)?.ok_or_else(|| {
        LedgerError::parse(0, format!("missing reimbursement row {}-{:02}", year, month))
    })?;
    let over_settled = updated.settled_usd > updated.total_usd;
    Ok(SettlementOutcome {
        record: updated,
        over_settled,
    })
}

pub fn record(
    conn: &Connection,
    year: i32,
    month: u32,
) -> Result<Option<ReimbursementRecord>, LedgerError> {
    let found = conn
        .query_row(
            "SELECT total_usd, settled_usd, settlement_date, notes
             FROM reimbursements WHERE year=?1 AND month=?2",
            params![year, month],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;
    match found {
        Some((total, settled, date, notes)) => Ok(Some(ReimbursementRecord {
            year,
            month,
            total_usd: parse_stored(&total)?,
            settled_usd: parse_stored(&settled)?,
            settlement_date: match date {
                Some(d) => Some(
                    d.parse::<NaiveDate>()
                        .map_err(|_| LedgerError::parse(0, format!("invalid date '{}'", d)))?,
                ),
                None => None,
            },
            notes,
        })),
        None => Ok(None),
    }
}

pub fn list(conn: &Connection) -> Result<Vec<ReimbursementRecord>, LedgerError> {
    let mut stmt = conn.prepare(
        "SELECT year, month FROM reimbursements ORDER BY year DESC, month DESC",
    )?;
    let keys: Vec<(i32, u32)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<Result<_, _>>()?;
    let mut out = Vec::new();
    for (year, month) in keys {
        if let Some(rec) = record(conn, year, month)? {
            out.push(rec);
        }
    }
    Ok(out)
}

fn parse_stored(s: &str) -> Result<Decimal, LedgerError> {
    s.parse::<Decimal>()
        .map_err(|_| LedgerError::parse(0, format!("invalid amount '{}' in reimbursements", s)))
}
