// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("no exchange rate for {0} within the fallback window")]
    RateUnresolved(NaiveDate),

    #[error("ambiguous category for '{0}'")]
    AmbiguousCategory(String),

    #[error("budget {year}-{month:02} is locked")]
    BudgetLocked { year: i32, month: u32 },

    #[error("budget {year}-{month:02} already instantiated")]
    AlreadyInstantiated { year: i32, month: u32 },

    #[error("unknown subcategory '{0}'")]
    UnknownCategory(String),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn parse(line: usize, reason: impl Into<String>) -> LedgerError {
        LedgerError::Parse {
            line,
            reason: reason.into(),
        }
    }
}
