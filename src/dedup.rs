// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use rusqlite::Connection;

/// Split candidate identity keys into (new, already persisted). Pure set
/// membership against the committed ledger; running the same batch twice
/// makes every key land in the second bucket.
pub fn partition(
    conn: &Connection,
    keys: &[String],
) -> Result<(Vec<String>, Vec<String>), LedgerError> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM transactions WHERE uuid=?1")?;
    let mut new_keys = Vec::new();
    let mut existing = Vec::new();
    for key in keys {
        if stmt.exists([key])? {
            existing.push(key.clone());
        } else {
            new_keys.push(key.clone());
        }
    }
    Ok((new_keys, existing))
}

pub fn is_known(conn: &Connection, key: &str) -> Result<bool, LedgerError> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM transactions WHERE uuid=?1")?;
    Ok(stmt.exists([key])?)
}
