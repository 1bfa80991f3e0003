// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("org.billfold", "Billfold", "billfold"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("billfold.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- Committed ledger. uuid is the deterministic identity key derived from
    -- (date, description, amount); it is the dedup handle, not a counter.
    CREATE TABLE IF NOT EXISTS transactions(
        uuid TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        description TEXT NOT NULL,
        original_amount TEXT NOT NULL,
        original_currency TEXT NOT NULL CHECK(original_currency IN ('EUR','USD')),
        amount_eur TEXT,
        amount_usd TEXT NOT NULL,
        exchange_rate TEXT,
        subcategory TEXT,
        category TEXT,
        budget_type TEXT,
        card TEXT,
        reimbursable INTEGER NOT NULL DEFAULT 0,
        archived INTEGER NOT NULL DEFAULT 0,
        note TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
    CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category);
    CREATE INDEX IF NOT EXISTS idx_transactions_reimbursable ON transactions(reimbursable);

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        budget_type TEXT NOT NULL,
        category TEXT NOT NULL,
        subcategory TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(budget_type, category, subcategory)
    );

    CREATE TABLE IF NOT EXISTS budget_templates(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS template_lines(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        template_id INTEGER NOT NULL,
        budget_type TEXT NOT NULL,
        category TEXT NOT NULL,
        subcategory TEXT NOT NULL,
        budgeted_amount TEXT NOT NULL,
        FOREIGN KEY(template_id) REFERENCES budget_templates(id) ON DELETE CASCADE
    );

    -- One row per (year, month, triple); budgeted_amount frozen once locked.
    CREATE TABLE IF NOT EXISTS monthly_budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        budget_type TEXT NOT NULL,
        category TEXT NOT NULL,
        subcategory TEXT NOT NULL,
        budgeted_amount TEXT NOT NULL,
        is_locked INTEGER NOT NULL DEFAULT 0,
        is_rollover INTEGER NOT NULL DEFAULT 0,
        notes TEXT,
        UNIQUE(year, month, budget_type, category, subcategory)
    );
    CREATE INDEX IF NOT EXISTS idx_monthly_budgets_ym ON monthly_budgets(year, month);

    CREATE TABLE IF NOT EXISTS savings_buckets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        currency TEXT NOT NULL CHECK(currency IN ('EUR','USD')),
        goal_amount TEXT NOT NULL,
        start_amount TEXT NOT NULL DEFAULT '0',
        is_active INTEGER NOT NULL DEFAULT 1,
        target_date TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Append-only; amount is signed (credits positive, debits negative).
    -- Transfer pairs share a transfer_group.
    CREATE TABLE IF NOT EXISTS savings_movements(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bucket_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('credit','debit','transfer')),
        transfer_group INTEGER,
        description TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(bucket_id) REFERENCES savings_buckets(id)
    );
    CREATE INDEX IF NOT EXISTS idx_savings_movements_bucket ON savings_movements(bucket_id);

    CREATE TABLE IF NOT EXISTS income_streams(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        amount TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        owner TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS reimbursements(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        total_usd TEXT NOT NULL,
        settled_usd TEXT NOT NULL DEFAULT '0',
        settlement_date TEXT,
        notes TEXT,
        UNIQUE(year, month)
    );

    -- A pattern may map to more than one subcategory after an explicit
    -- re-learn; classify resolves the conflict by confidence.
    CREATE TABLE IF NOT EXISTS merchant_patterns(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pattern TEXT NOT NULL,
        subcategory TEXT NOT NULL,
        confidence INTEGER NOT NULL DEFAULT 1,
        last_used TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(pattern, subcategory)
    );

    -- EUR->USD rate per date; immutable once written.
    CREATE TABLE IF NOT EXISTS exchange_rates(
        date TEXT PRIMARY KEY,
        rate TEXT NOT NULL,
        fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    )?;
    Ok(())
}
