// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The fixed currency pair. EUR is the budget (home) currency, USD the
/// reimbursement currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Eur,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }

    pub fn from_str_tag(s: &str) -> Option<Currency> {
        match s {
            "EUR" => Some(Currency::Eur),
            "USD" => Some(Currency::Usd),
            _ => None,
        }
    }
}

/// A committed ledger transaction. Immutable after commit except for the
/// category triple and note; never physically deleted (archived instead).
///
/// Reimbursable rows are denominated in USD and carry neither an EUR amount
/// nor a rate. Non-reimbursable rows are denominated in EUR and always carry
/// both the USD amount and the rate used to derive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub uuid: String,
    pub date: NaiveDate,
    pub description: String,
    pub original_amount: Decimal,
    pub original_currency: Currency,
    pub amount_eur: Option<Decimal>,
    pub amount_usd: Decimal,
    pub exchange_rate: Option<Decimal>,
    pub subcategory: Option<String>,
    pub category: Option<String>,
    pub budget_type: Option<String>,
    pub card: Option<String>,
    pub reimbursable: bool,
    pub archived: bool,
    pub note: Option<String>,
}

/// Normalized statement row awaiting commit. `amount` is the parsed native
/// amount (EUR for regular rows, USD for reimbursable ones); `amount_usd`
/// stays empty while the rate is unresolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTransaction {
    pub uuid: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub card: Option<String>,
    pub reimbursable: bool,
    pub exchange_rate: Option<Decimal>,
    pub amount_eur: Option<Decimal>,
    pub amount_usd: Option<Decimal>,
    pub subcategory: Option<String>,
    pub category: Option<String>,
    pub budget_type: Option<String>,
    pub confidence: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyBudgetRow {
    pub id: i64,
    pub year: i32,
    pub month: u32,
    pub budget_type: String,
    pub category: String,
    pub subcategory: String,
    pub budgeted_amount: Decimal,
    pub is_locked: bool,
    pub is_rollover: bool,
    pub notes: Option<String>,
}

/// Monthly rollup of reimbursable spend, keyed (year, month). The total is
/// derived and recomputable; the settled amount only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReimbursementRecord {
    pub year: i32,
    pub month: u32,
    pub total_usd: Decimal,
    pub settled_usd: Decimal,
    pub settlement_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsBucket {
    pub id: i64,
    pub name: String,
    pub currency: Currency,
    pub goal_amount: Decimal,
    pub start_amount: Decimal,
    pub is_active: bool,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Credit,
    Debit,
    Transfer,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Credit => "credit",
            MovementKind::Debit => "debit",
            MovementKind::Transfer => "transfer",
        }
    }

}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantPattern {
    pub pattern: String,
    pub subcategory: String,
    pub confidence: i64,
}
