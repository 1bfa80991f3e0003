// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use crate::models::{Currency, MovementKind, SavingsBucket};
use crate::utils::{month_bounds, prev_month};
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn create_bucket(
    conn: &Connection,
    name: &str,
    currency: Currency,
    goal: Decimal,
    start: Decimal,
    target_date: Option<NaiveDate>,
) -> Result<i64, LedgerError> {
    conn.execute(
        "INSERT INTO savings_buckets(name, currency, goal_amount, start_amount, target_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            name,
            currency.as_str(),
            goal.to_string(),
            start.to_string(),
            target_date.map(|d| d.to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn bucket(conn: &Connection, id: i64) -> Result<Option<SavingsBucket>, LedgerError> {
    let found = conn
        .query_row(
            "SELECT id, name, currency, goal_amount, start_amount, is_active, target_date
             FROM savings_buckets WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, bool>(5)?,
                    r.get::<_, Option<String>>(6)?,
                ))
            },
        )
        .optional()?;
    let Some((id, name, ccy, goal, start, is_active, target)) = found else {
        return Ok(None);
    };
    Ok(Some(SavingsBucket {
        id,
        name,
        currency: Currency::from_str_tag(&ccy)
            .ok_or_else(|| LedgerError::parse(0, format!("invalid currency '{}'", ccy)))?,
        goal_amount: parse_stored(&goal)?,
        start_amount: parse_stored(&start)?,
        is_active,
        target_date: match target {
            Some(d) => Some(
                d.parse::<NaiveDate>()
                    .map_err(|_| LedgerError::parse(0, format!("invalid date '{}'", d)))?,
            ),
            None => None,
        },
    }))
}

pub fn bucket_by_name(conn: &Connection, name: &str) -> Result<Option<SavingsBucket>, LedgerError> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM savings_buckets WHERE name=?1",
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    match id {
        Some(id) => bucket(conn, id),
        None => Ok(None),
    }
}

/// Record a deposit. Movements are append-only; mistakes get offsetting
/// movements, never edits.
pub fn credit(
    conn: &Connection,
    bucket_id: i64,
    date: NaiveDate,
    amount: Decimal,
    description: Option<&str>,
) -> Result<(), LedgerError> {
    append(conn, bucket_id, date, amount, MovementKind::Credit, None, description)
}

/// Record a withdrawal; `amount` is positive, stored negative.
pub fn debit(
    conn: &Connection,
    bucket_id: i64,
    date: NaiveDate,
    amount: Decimal,
    description: Option<&str>,
) -> Result<(), LedgerError> {
    append(conn, bucket_id, date, -amount, MovementKind::Debit, None, description)
}

fn append(
    conn: &Connection,
    bucket_id: i64,
    date: NaiveDate,
    signed_amount: Decimal,
    kind: MovementKind,
    transfer_group: Option<i64>,
    description: Option<&str>,
) -> Result<(), LedgerError> {
    conn.execute(
        "INSERT INTO savings_movements(bucket_id, date, amount, kind, transfer_group, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            bucket_id,
            date.to_string(),
            signed_amount.to_string(),
            kind.as_str(),
            transfer_group,
            description,
        ],
    )?;
    Ok(())
}

/// Move funds between buckets as an atomic linked pair: one debit on the
/// source, one credit on the destination, sharing a transfer group. Never a
/// single unpaired entry.
pub fn transfer(
    conn: &mut Connection,
    from: i64,
    to: i64,
    date: NaiveDate,
    amount: Decimal,
    description: Option<&str>,
) -> Result<i64, LedgerError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let group: i64 = tx.query_row(
        "SELECT COALESCE(MAX(transfer_group), 0) + 1 FROM savings_movements",
        [],
        |r| r.get(0),
    )?;
    append(&tx, from, date, -amount, MovementKind::Transfer, Some(group), description)?;
    append(&tx, to, date, amount, MovementKind::Transfer, Some(group), description)?;
    tx.commit()?;
    Ok(group)
}

/// Balance is a fold over the movement log: start + sum of signed amounts.
pub fn balance(conn: &Connection, bucket_id: i64) -> Result<Decimal, LedgerError> {
    let b = bucket(conn, bucket_id)?
        .ok_or_else(|| LedgerError::parse(0, format!("unknown bucket {}", bucket_id)))?;
    let mut stmt =
        conn.prepare_cached("SELECT amount FROM savings_movements WHERE bucket_id=?1")?;
    let mut rows = stmt.query(params![bucket_id])?;
    let mut total = b.start_amount;
    while let Some(r) = rows.next()? {
        let s: String = r.get(0)?;
        total += parse_stored(&s)?;
    }
    Ok(total)
}

#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub balance: Decimal,
    pub goal: Decimal,
    pub percent: Option<Decimal>,
    pub exceeded: bool,
}

pub fn progress(conn: &Connection, bucket_id: i64) -> Result<Progress, LedgerError> {
    let b = bucket(conn, bucket_id)?
        .ok_or_else(|| LedgerError::parse(0, format!("unknown bucket {}", bucket_id)))?;
    let balance = balance(conn, bucket_id)?;
    let percent = if b.goal_amount > Decimal::ZERO {
        Some((balance / b.goal_amount) * Decimal::ONE_HUNDRED)
    } else {
        None
    };
    Ok(Progress {
        balance,
        goal: b.goal_amount,
        percent,
        exceeded: balance > b.goal_amount,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    /// Average net credit over the three calendar months before `as_of`.
    pub monthly_net: Decimal,
    /// None when the trailing average is zero or negative: months-to-goal
    /// is undefined, reported rather than crashed on.
    pub months_to_goal: Option<Decimal>,
}

pub fn projection(
    conn: &Connection,
    bucket_id: i64,
    as_of: NaiveDate,
) -> Result<Projection, LedgerError> {
    let b = bucket(conn, bucket_id)?
        .ok_or_else(|| LedgerError::parse(0, format!("unknown bucket {}", bucket_id)))?;
    let current = balance(conn, bucket_id)?;

    let mut net = Decimal::ZERO;
    let (mut y, mut m) = (as_of.year(), as_of.month());
    for _ in 0..3 {
        (y, m) = prev_month(y, m);
        let (first, last) =
            month_bounds(y, m).map_err(|e| LedgerError::parse(0, e.to_string()))?;
        let mut stmt = conn.prepare_cached(
            "SELECT amount FROM savings_movements
             WHERE bucket_id=?1 AND date>=?2 AND date<=?3",
        )?;
        let mut rows = stmt.query(params![bucket_id, first.to_string(), last.to_string()])?;
        while let Some(r) = rows.next()? {
            let s: String = r.get(0)?;
            net += parse_stored(&s)?;
        }
    }
    let monthly_net = net / Decimal::from(3);

    let remaining = b.goal_amount - current;
    let months_to_goal = if monthly_net <= Decimal::ZERO {
        None
    } else if remaining <= Decimal::ZERO {
        Some(Decimal::ZERO)
    } else {
        Some(remaining / monthly_net)
    };
    Ok(Projection {
        monthly_net,
        months_to_goal,
    })
}

/// Net signed movement across all buckets for a calendar month. Transfers
/// cancel out by construction. Feeds the budget rollover computation.
pub fn monthly_net_all(conn: &Connection, year: i32, month: u32) -> Result<Decimal, LedgerError> {
    let (first, last) =
        month_bounds(year, month).map_err(|e| LedgerError::parse(0, e.to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT amount FROM savings_movements WHERE date>=?1 AND date<=?2",
    )?;
    let mut rows = stmt.query(params![first.to_string(), last.to_string()])?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let s: String = r.get(0)?;
        total += parse_stored(&s)?;
    }
    Ok(total)
}

fn parse_stored(s: &str) -> Result<Decimal, LedgerError> {
    s.parse::<Decimal>()
        .map_err(|_| LedgerError::parse(0, format!("invalid amount '{}' in savings", s)))
}
