// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::classifier::{Classification, Classifier};
use crate::dedup;
use crate::errors::LedgerError;
use crate::models::{CandidateTransaction, Currency, Transaction};
use crate::normalizer::{self, ImportConfig};
use crate::rates::RateSource;
use crate::reimburse;
use chrono::Datelike;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;

pub const REIMBURSABLE_BUDGET_TYPE: &str = "Additional";
pub const REIMBURSABLE_CATEGORY: &str = "Reimbursable";
pub const FALLBACK_BUDGET_TYPE: &str = "Unexpected";
pub const FALLBACK_CATEGORY: &str = "Unexpected";
pub const FALLBACK_SUBCATEGORY: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowStatus {
    /// Fully normalized, categorized, and new; will be committed.
    Ready,
    /// No confident category (no match or an ambiguous tie); held for
    /// manual categorization.
    NeedsCategory,
    /// No convertible rate within the fallback window; held for manual
    /// rate entry.
    NeedsRate,
    /// Identity key already persisted; informational, excluded from commit.
    Duplicate,
    /// Row malformed; skipped without aborting the batch.
    ParseError,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewRow {
    pub line: usize,
    pub status: RowStatus,
    pub candidate: Option<CandidateTransaction>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub rows: Vec<PreviewRow>,
}

impl Preview {
    pub fn count(&self, status: &RowStatus) -> usize {
        self.rows.iter().filter(|r| r.status == *status).count()
    }
}

/// Caller corrections for one preview row, keyed by line. `learn` feeds the
/// corrected subcategory back into the classifier at commit ("apply to
/// future similar merchants" is this explicit flag, never implicit).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Correction {
    pub line: usize,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub learn: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Commit rows still lacking a category under the fallback triple
    /// instead of holding them.
    pub accept_uncategorized: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub held_rate: usize,
    pub held_category: usize,
    pub parse_errors: usize,
    pub months: Vec<(i32, u32)>,
}

/// Preview phase: normalize, classify, convert, and dedup a whole batch
/// without touching the ledger. Safe to abort or repeat; the only write is
/// the rate-cache warm-up.
pub fn preview<R: Read>(
    conn: &Connection,
    source: &dyn RateSource,
    cfg: &ImportConfig,
    rdr: &mut csv::Reader<R>,
) -> Result<Preview, LedgerError> {
    let classifier = Classifier::load(conn)?;
    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let line = idx + 1;
        let rec = match rec {
            Ok(rec) => rec,
            Err(e) => {
                rows.push(PreviewRow {
                    line,
                    status: RowStatus::ParseError,
                    candidate: None,
                    detail: Some(e.to_string()),
                });
                continue;
            }
        };
        rows.push(preview_row(conn, source, cfg, &classifier, &rec, line)?);
    }
    Ok(Preview { rows })
}

fn preview_row(
    conn: &Connection,
    source: &dyn RateSource,
    cfg: &ImportConfig,
    classifier: &Classifier,
    rec: &csv::StringRecord,
    line: usize,
) -> Result<PreviewRow, LedgerError> {
    let mut cand = match normalizer::normalize(rec, line, cfg) {
        Ok(c) => c,
        Err(e) => {
            return Ok(PreviewRow {
                line,
                status: RowStatus::ParseError,
                candidate: None,
                detail: Some(e.to_string()),
            });
        }
    };

    if dedup::is_known(conn, &cand.uuid)? {
        return Ok(PreviewRow {
            line,
            status: RowStatus::Duplicate,
            candidate: Some(cand),
            detail: None,
        });
    }

    let mut detail = None;
    if cand.reimbursable {
        cand.subcategory = Some(REIMBURSABLE_CATEGORY.to_string());
        cand.category = Some(REIMBURSABLE_CATEGORY.to_string());
        cand.budget_type = Some(REIMBURSABLE_BUDGET_TYPE.to_string());
    } else if cand.subcategory.is_none() {
        match classifier.classify(&cand.description) {
            Classification::Hit {
                subcategory,
                confidence,
            } => {
                cand.subcategory = Some(subcategory);
                cand.confidence = Some(confidence);
            }
            Classification::Ambiguous => {
                detail = Some(LedgerError::AmbiguousCategory(cand.description.clone()).to_string());
            }
            Classification::NoMatch => {}
        }
    }
    if !cand.reimbursable {
        if let Some(sub) = cand.subcategory.clone() {
            match resolve_subcategory(conn, &sub)? {
                Some((budget_type, category)) => {
                    cand.budget_type = Some(budget_type);
                    cand.category = Some(category);
                }
                None => {
                    // Subcategory text that resolves to no definition goes
                    // back to manual review.
                    detail = Some(LedgerError::UnknownCategory(sub).to_string());
                    cand.subcategory = None;
                    cand.confidence = None;
                }
            }
        }
    }

    let resolved = normalizer::apply_currency_policy(&mut cand, conn, source)?;
    let status = if !resolved {
        RowStatus::NeedsRate
    } else if cand.subcategory.is_none() {
        RowStatus::NeedsCategory
    } else {
        RowStatus::Ready
    };
    Ok(PreviewRow {
        line,
        status,
        candidate: Some(cand),
        detail,
    })
}

/// Resolve subcategory text against the category definitions. Inactive
/// definitions still resolve (historically-valid text stays valid).
pub fn resolve_subcategory(
    conn: &Connection,
    subcategory: &str,
) -> Result<Option<(String, String)>, LedgerError> {
    let found = conn
        .query_row(
            "SELECT budget_type, category FROM categories WHERE subcategory=?1
             ORDER BY is_active DESC, id LIMIT 1",
            params![subcategory],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )
        .optional()?;
    Ok(found)
}

/// Commit phase: persist accepted rows all-or-nothing, feed flagged
/// corrections to the classifier, and recompute reimbursements for the
/// affected months. A storage failure rolls the whole batch back; held and
/// malformed rows are reported, never fatal.
pub fn commit(
    conn: &mut Connection,
    preview: Preview,
    corrections: &[Correction],
    opts: &CommitOptions,
) -> Result<CommitSummary, LedgerError> {
    let mut summary = CommitSummary::default();
    let mut to_learn: Vec<(String, String)> = Vec::new();
    // (candidate, note) pairs that survived corrections.
    let mut accepted: Vec<(CandidateTransaction, Option<String>)> = Vec::new();

    for row in preview.rows {
        match row.status {
            RowStatus::ParseError => {
                summary.parse_errors += 1;
                continue;
            }
            RowStatus::Duplicate => {
                summary.duplicates += 1;
                continue;
            }
            _ => {}
        }
        let Some(mut cand) = row.candidate else {
            summary.parse_errors += 1;
            continue;
        };
        let correction = corrections.iter().find(|c| c.line == row.line);
        let mut note = None;
        if let Some(c) = correction {
            if let Some(sub) = &c.subcategory {
                match resolve_subcategory(conn, sub)? {
                    Some((budget_type, category)) => {
                        cand.subcategory = Some(sub.clone());
                        cand.budget_type = Some(budget_type);
                        cand.category = Some(category);
                        if c.learn {
                            to_learn.push((cand.description.clone(), sub.clone()));
                        }
                    }
                    None => return Err(LedgerError::UnknownCategory(sub.clone())),
                }
            }
            if let Some(rate) = c.rate {
                if !cand.reimbursable && cand.amount_usd.is_none() {
                    normalizer::apply_rate(&mut cand, rate);
                }
            }
            note = c.note.clone();
        }

        if !cand.reimbursable && cand.amount_usd.is_none() {
            summary.held_rate += 1;
            continue;
        }
        if cand.subcategory.is_none() {
            if opts.accept_uncategorized {
                cand.subcategory = Some(FALLBACK_SUBCATEGORY.to_string());
                cand.category = Some(FALLBACK_CATEGORY.to_string());
                cand.budget_type = Some(FALLBACK_BUDGET_TYPE.to_string());
            } else {
                summary.held_category += 1;
                continue;
            }
        }
        accepted.push((cand, note));
    }

    // Exclusive-write section: inserts, learning, and reimbursement
    // recompute land atomically or not at all.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut months: BTreeSet<(i32, u32)> = BTreeSet::new();
    {
        let mut classifier = Classifier::load(&tx)?;
        for (cand, note) in &accepted {
            // A stale preview must not double-insert.
            if dedup::is_known(&tx, &cand.uuid)? {
                summary.duplicates += 1;
                continue;
            }
            insert_transaction(&tx, cand, note.as_deref())?;
            summary.inserted += 1;
            if cand.reimbursable {
                months.insert((cand.date.year(), cand.date.month()));
            }
        }
        for (description, subcategory) in &to_learn {
            classifier.learn(&tx, description, subcategory)?;
        }
        for (year, month) in &months {
            reimburse::recompute(&tx, *year, *month)?;
        }
    }
    tx.commit()?;
    summary.months = months.into_iter().collect();
    Ok(summary)
}

fn insert_transaction(
    conn: &Connection,
    cand: &CandidateTransaction,
    note: Option<&str>,
) -> Result<(), LedgerError> {
    let currency = if cand.reimbursable {
        Currency::Usd
    } else {
        Currency::Eur
    };
    conn.execute(
        "INSERT INTO transactions(
            uuid, date, description, original_amount, original_currency,
            amount_eur, amount_usd, exchange_rate, subcategory, category,
            budget_type, card, reimbursable, note
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
        params![
            cand.uuid,
            cand.date.to_string(),
            cand.description,
            cand.amount.to_string(),
            currency.as_str(),
            cand.amount_eur.map(|d| d.to_string()),
            cand.amount_usd
                .ok_or_else(|| LedgerError::RateUnresolved(cand.date))?
                .to_string(),
            cand.exchange_rate.map(|d| d.to_string()),
            cand.subcategory,
            cand.category,
            cand.budget_type,
            cand.card,
            cand.reimbursable as i64,
            note,
        ],
    )?;
    Ok(())
}

/// Explicit post-commit mutation: the only path that changes a committed
/// transaction's category triple (and optionally its note — the two mutable
/// fields). Optionally teaches the classifier the corrected mapping.
pub fn recategorize(
    conn: &Connection,
    uuid: &str,
    subcategory: &str,
    note: Option<&str>,
    learn: bool,
) -> Result<(), LedgerError> {
    let (budget_type, category) = resolve_subcategory(conn, subcategory)?
        .ok_or_else(|| LedgerError::UnknownCategory(subcategory.to_string()))?;
    let description: String = conn
        .query_row(
            "SELECT description FROM transactions WHERE uuid=?1",
            params![uuid],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| LedgerError::parse(0, format!("unknown transaction '{}'", uuid)))?;
    conn.execute(
        "UPDATE transactions
         SET subcategory=?1, category=?2, budget_type=?3,
             note=COALESCE(?4, note), updated_at=datetime('now')
         WHERE uuid=?5",
        params![subcategory, category, budget_type, note, uuid],
    )?;
    if learn {
        let mut classifier = Classifier::load(conn)?;
        classifier.learn(conn, &description, subcategory)?;
    }
    Ok(())
}

/// Load one committed transaction by identity key.
pub fn transaction(conn: &Connection, uuid: &str) -> Result<Option<Transaction>, LedgerError> {
    let raw = conn
        .query_row(
            "SELECT uuid, date, description, original_amount, original_currency,
                    amount_eur, amount_usd, exchange_rate, subcategory, category,
                    budget_type, card, reimbursable, archived, note
             FROM transactions WHERE uuid=?1",
            params![uuid],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, Option<String>>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, Option<String>>(7)?,
                    r.get::<_, Option<String>>(8)?,
                    r.get::<_, Option<String>>(9)?,
                    r.get::<_, Option<String>>(10)?,
                    r.get::<_, Option<String>>(11)?,
                    r.get::<_, bool>(12)?,
                    r.get::<_, bool>(13)?,
                    r.get::<_, Option<String>>(14)?,
                ))
            },
        )
        .optional()?;
    let Some((
        uuid,
        date,
        description,
        original_amount,
        original_currency,
        amount_eur,
        amount_usd,
        exchange_rate,
        subcategory,
        category,
        budget_type,
        card,
        reimbursable,
        archived,
        note,
    )) = raw
    else {
        return Ok(None);
    };
    let amount = |s: &str| {
        s.parse::<Decimal>()
            .map_err(|e| LedgerError::parse(0, format!("bad amount '{}': {}", s, e)))
    };
    Ok(Some(Transaction {
        date: date
            .parse()
            .map_err(|e| LedgerError::parse(0, format!("bad date '{}': {}", date, e)))?,
        original_amount: amount(&original_amount)?,
        original_currency: Currency::from_str_tag(&original_currency).ok_or_else(|| {
            LedgerError::parse(0, format!("bad currency '{}'", original_currency))
        })?,
        amount_eur: amount_eur.as_deref().map(&amount).transpose()?,
        amount_usd: amount(&amount_usd)?,
        exchange_rate: exchange_rate.as_deref().map(&amount).transpose()?,
        uuid,
        description,
        subcategory,
        category,
        budget_type,
        card,
        reimbursable,
        archived,
        note,
    }))
}

/// Soft archival: the row stays for history but drops out of actuals and
/// reimbursement sums.
pub fn archive(conn: &Connection, uuid: &str) -> Result<bool, LedgerError> {
    let n = conn.execute(
        "UPDATE transactions SET archived=1, updated_at=datetime('now') WHERE uuid=?1",
        params![uuid],
    )?;
    Ok(n > 0)
}
