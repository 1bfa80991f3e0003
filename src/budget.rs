// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use crate::models::MonthlyBudgetRow;
use crate::savings;
use crate::utils::{month_bounds, next_month};
use rusqlite::{Connection, TransactionBehavior, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Under,
    Near,
    Over,
}

/// Spent-percentage thresholds: under 80 -> under, 80..100 -> near, 100 and
/// above -> over. A zero budget with nonzero spend is over by definition,
/// not a division error.
pub fn status_for(budgeted: Decimal, actual: Decimal) -> BudgetStatus {
    if budgeted.is_zero() {
        return if actual.is_zero() {
            BudgetStatus::Under
        } else {
            BudgetStatus::Over
        };
    }
    let percent = actual / budgeted * Decimal::ONE_HUNDRED;
    if percent < Decimal::from(80) {
        BudgetStatus::Under
    } else if percent < Decimal::ONE_HUNDRED {
        BudgetStatus::Near
    } else {
        BudgetStatus::Over
    }
}

/// Copy a template's lines into monthly budget rows for (year, month).
/// Refuses to touch a month that already has rows.
pub fn instantiate(
    conn: &mut Connection,
    template: &str,
    year: i32,
    month: u32,
) -> Result<usize, LedgerError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let existing: i64 = tx.query_row(
        "SELECT COUNT(*) FROM monthly_budgets WHERE year=?1 AND month=?2",
        params![year, month],
        |r| r.get(0),
    )?;
    if existing > 0 {
        return Err(LedgerError::AlreadyInstantiated { year, month });
    }
    let template_id: i64 = tx
        .query_row(
            "SELECT id FROM budget_templates WHERE name=?1",
            params![template],
            |r| r.get(0),
        )
        .map_err(|_| LedgerError::parse(0, format!("unknown template '{}'", template)))?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "SELECT budget_type, category, subcategory, budgeted_amount
             FROM template_lines WHERE template_id=?1",
        )?;
        let lines: Vec<(String, String, String, String)> = stmt
            .query_map(params![template_id], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
            })?
            .collect::<Result<_, _>>()?;
        for (budget_type, category, subcategory, amount) in lines {
            tx.execute(
                "INSERT INTO monthly_budgets(
                    year, month, budget_type, category, subcategory, budgeted_amount
                 ) VALUES (?1,?2,?3,?4,?5,?6)",
                params![year, month, budget_type, category, subcategory, amount],
            )?;
            inserted += 1;
        }
    }
    tx.commit()?;
    Ok(inserted)
}

pub fn rows(conn: &Connection, year: i32, month: u32) -> Result<Vec<MonthlyBudgetRow>, LedgerError> {
    let mut stmt = conn.prepare(
        "SELECT id, budget_type, category, subcategory, budgeted_amount,
                is_locked, is_rollover, notes
         FROM monthly_budgets WHERE year=?1 AND month=?2
         ORDER BY budget_type, category, subcategory",
    )?;
    let raw: Vec<(i64, String, String, String, String, bool, bool, Option<String>)> = stmt
        .query_map(params![year, month], |r| {
            Ok((
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
                r.get(6)?,
                r.get(7)?,
            ))
        })?
        .collect::<Result<_, _>>()?;
    let mut out = Vec::new();
    for (id, budget_type, category, subcategory, amount, is_locked, is_rollover, notes) in raw {
        out.push(MonthlyBudgetRow {
            id,
            year,
            month,
            budget_type,
            category,
            subcategory,
            budgeted_amount: parse_stored(&amount)?,
            is_locked,
            is_rollover,
            notes,
        });
    }
    Ok(out)
}

/// Edit a budget line's amount. Locked rows reject mutation and keep their
/// stored amount.
pub fn set_amount(
    conn: &Connection,
    year: i32,
    month: u32,
    budget_type: &str,
    category: &str,
    subcategory: &str,
    amount: Decimal,
) -> Result<(), LedgerError> {
    let locked: bool = conn
        .query_row(
            "SELECT is_locked FROM monthly_budgets
             WHERE year=?1 AND month=?2 AND budget_type=?3 AND category=?4 AND subcategory=?5",
            params![year, month, budget_type, category, subcategory],
            |r| r.get(0),
        )
        .map_err(|_| {
            LedgerError::parse(
                0,
                format!("no budget row for {}/{}/{}", budget_type, category, subcategory),
            )
        })?;
    if locked {
        return Err(LedgerError::BudgetLocked { year, month });
    }
    conn.execute(
        "UPDATE monthly_budgets SET budgeted_amount=?1
         WHERE year=?2 AND month=?3 AND budget_type=?4 AND category=?5 AND subcategory=?6",
        params![amount.to_string(), year, month, budget_type, category, subcategory],
    )?;
    Ok(())
}

/// One-way unlocked -> locked transition for every row of the month.
pub fn lock_month(conn: &mut Connection, year: i32, month: u32) -> Result<usize, LedgerError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let n = tx.execute(
        "UPDATE monthly_budgets SET is_locked=1 WHERE year=?1 AND month=?2",
        params![year, month],
    )?;
    tx.commit()?;
    Ok(n)
}

#[derive(Debug, Clone, Serialize)]
pub struct ActualLine {
    pub budget_type: String,
    pub category: String,
    pub subcategory: String,
    pub budgeted: Decimal,
    pub actual: Decimal,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnbudgetedLine {
    pub budget_type: String,
    pub category: String,
    pub subcategory: String,
    pub actual: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActualsReport {
    pub lines: Vec<ActualLine>,
    /// Spend in categories with no budget line for the month. Surfaced
    /// separately, never dropped.
    pub unbudgeted: Vec<UnbudgetedLine>,
    pub total_spend: Decimal,
}

/// Sum EUR spend for the month over non-reimbursable, non-archived
/// transactions, grouped by category triple and matched against the
/// month's budget rows.
pub fn actuals(conn: &Connection, year: i32, month: u32) -> Result<ActualsReport, LedgerError> {
    let (first, last) =
        month_bounds(year, month).map_err(|e| LedgerError::parse(0, e.to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT COALESCE(budget_type,''), COALESCE(category,''), COALESCE(subcategory,''), amount_eur
         FROM transactions
         WHERE reimbursable=0 AND archived=0 AND amount_eur IS NOT NULL
           AND date>=?1 AND date<=?2",
    )?;
    let mut rows_q = stmt.query(params![first.to_string(), last.to_string()])?;
    let mut spend: BTreeMap<(String, String, String), Decimal> = BTreeMap::new();
    let mut total_spend = Decimal::ZERO;
    while let Some(r) = rows_q.next()? {
        let key = (
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        );
        let amount = parse_stored(&r.get::<_, String>(3)?)?;
        total_spend += amount;
        *spend.entry(key).or_insert(Decimal::ZERO) += amount;
    }

    let mut lines = Vec::new();
    for row in rows(conn, year, month)? {
        let key = (
            row.budget_type.clone(),
            row.category.clone(),
            row.subcategory.clone(),
        );
        let actual = spend.remove(&key).unwrap_or(Decimal::ZERO);
        lines.push(ActualLine {
            budget_type: row.budget_type,
            category: row.category,
            subcategory: row.subcategory,
            budgeted: row.budgeted_amount,
            actual,
            status: status_for(row.budgeted_amount, actual),
        });
    }
    let unbudgeted = spend
        .into_iter()
        .map(|((budget_type, category, subcategory), actual)| UnbudgetedLine {
            budget_type,
            category,
            subcategory,
            actual,
        })
        .collect();
    Ok(ActualsReport {
        lines,
        unbudgeted,
        total_spend,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RolloverSummary {
    pub income: Decimal,
    pub spend: Decimal,
    pub saved: Decimal,
    pub leftover: Decimal,
}

/// Leftover = active income - non-reimbursable spend - net savings
/// movement, for one calendar month. Where the leftover goes is always the
/// caller's explicit choice.
pub fn rollover(conn: &Connection, year: i32, month: u32) -> Result<RolloverSummary, LedgerError> {
    let mut stmt =
        conn.prepare_cached("SELECT amount FROM income_streams WHERE is_active=1")?;
    let mut rows_q = stmt.query([])?;
    let mut income = Decimal::ZERO;
    while let Some(r) = rows_q.next()? {
        let s: String = r.get(0)?;
        income += parse_stored(&s)?;
    }
    let spend = actuals(conn, year, month)?.total_spend;
    let saved = savings::monthly_net_all(conn, year, month)?;
    Ok(RolloverSummary {
        income,
        spend,
        saved,
        leftover: income - spend - saved,
    })
}

#[derive(Debug, Clone, Copy)]
pub enum RolloverTarget {
    /// Append the leftover as a rollover income row on the next month.
    NextMonthIncome,
    /// Deposit the leftover into a savings bucket.
    SavingsBucket(i64),
}

pub const ROLLOVER_BUDGET_TYPE: &str = "Income";
pub const ROLLOVER_CATEGORY: &str = "Rollover";

/// Route a month's leftover. The next-month income row is flagged
/// `is_rollover` and may be appended even when that month is locked; it is
/// the one sanctioned post-lock addition.
pub fn apply_rollover(
    conn: &mut Connection,
    year: i32,
    month: u32,
    target: RolloverTarget,
) -> Result<RolloverSummary, LedgerError> {
    let summary = rollover(conn, year, month)?;
    match target {
        RolloverTarget::NextMonthIncome => {
            let (ny, nm) = next_month(year, month);
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing: Option<String> = {
                use rusqlite::OptionalExtension;
                tx.query_row(
                    "SELECT budgeted_amount FROM monthly_budgets
                     WHERE year=?1 AND month=?2 AND budget_type=?3 AND category=?4 AND subcategory=?5",
                    params![ny, nm, ROLLOVER_BUDGET_TYPE, ROLLOVER_CATEGORY, ROLLOVER_CATEGORY],
                    |r| r.get(0),
                )
                .optional()?
            };
            let new_amount = match existing {
                Some(s) => parse_stored(&s)? + summary.leftover,
                None => summary.leftover,
            };
            tx.execute(
                "INSERT INTO monthly_budgets(
                    year, month, budget_type, category, subcategory,
                    budgeted_amount, is_rollover
                 ) VALUES (?1,?2,?3,?4,?5,?6,1)
                 ON CONFLICT(year, month, budget_type, category, subcategory)
                 DO UPDATE SET budgeted_amount=excluded.budgeted_amount, is_rollover=1",
                params![
                    ny,
                    nm,
                    ROLLOVER_BUDGET_TYPE,
                    ROLLOVER_CATEGORY,
                    ROLLOVER_CATEGORY,
                    new_amount.to_string(),
                ],
            )?;
            tx.commit()?;
        }
        RolloverTarget::SavingsBucket(bucket_id) => {
            let (_, last) =
                month_bounds(year, month).map_err(|e| LedgerError::parse(0, e.to_string()))?;
            savings::credit(
                conn,
                bucket_id,
                last,
                summary.leftover,
                Some(&format!("Rollover {}-{:02}", year, month)),
            )?;
        }
    }
    Ok(summary)
}

fn parse_stored(s: &str) -> Result<Decimal, LedgerError> {
    s.parse::<Decimal>()
        .map_err(|_| LedgerError::parse(0, format!("invalid amount '{}' in budgets", s)))
}
