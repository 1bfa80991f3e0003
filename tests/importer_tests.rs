// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::db;
use billfold::ingest::{self, CommitOptions, Correction, RowStatus};
use billfold::models::Currency;
use billfold::normalizer::ImportConfig;
use billfold::rates::{RateSource, SourceError};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::io::Write;
use tempfile::NamedTempFile;

struct FixedSource(Option<Decimal>);

impl RateSource for FixedSource {
    fn rate_for(&self, _date: NaiveDate) -> Result<Option<Decimal>, SourceError> {
        Ok(self.0)
    }
}

fn base_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO categories(budget_type, category, subcategory)
         VALUES ('Essential','Food','Supermarket')",
        [],
    )
    .unwrap();
    conn
}

fn cfg() -> ImportConfig {
    ImportConfig {
        reimbursable_cards: ["Amex".to_string()].into_iter().collect(),
    }
}

fn reader(body: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_reader(body.as_bytes())
}

const HEADER: &str = "date;description;amount;subcategory;category;card\n";

#[test]
fn commit_applies_currency_policy_per_row() {
    let mut conn = base_conn();
    let source = FixedSource(Some("1.10".parse().unwrap()));
    let body = format!(
        "{}03.02.2026;REWE BERLIN;12,30 €;Supermarket;Food;Visa\n04.02.2026;TEAM LUNCH;50,00;;;Amex\n",
        HEADER
    );
    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    assert!(preview.rows.iter().all(|r| r.status == RowStatus::Ready));

    let summary = ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();
    assert_eq!(summary.inserted, 2);

    let (eur, usd, rate, ccy): (Option<String>, String, Option<String>, String) = conn
        .query_row(
            "SELECT amount_eur, amount_usd, exchange_rate, original_currency
             FROM transactions WHERE reimbursable=0",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(eur.unwrap(), "12.30");
    assert_eq!(usd, "13.53");
    assert_eq!(rate.unwrap(), "1.10");
    assert_eq!(ccy, "EUR");

    let (eur, usd, rate, ccy): (Option<String>, String, Option<String>, String) = conn
        .query_row(
            "SELECT amount_eur, amount_usd, exchange_rate, original_currency
             FROM transactions WHERE reimbursable=1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert!(eur.is_none());
    assert!(rate.is_none());
    assert_eq!(usd, "50.00");
    assert_eq!(ccy, "USD");

    // Reimbursable row got the fixed triple and a monthly rollup.
    let (bt, cat, sub): (String, String, String) = conn
        .query_row(
            "SELECT budget_type, category, subcategory FROM transactions WHERE reimbursable=1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!((bt.as_str(), cat.as_str(), sub.as_str()), ("Additional", "Reimbursable", "Reimbursable"));
    let total: String = conn
        .query_row(
            "SELECT total_usd FROM reimbursements WHERE year=2026 AND month=2",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(total, "50.00");
}

#[test]
fn second_run_is_idempotent() {
    let mut conn = base_conn();
    let source = FixedSource(Some("1.10".parse().unwrap()));
    let body = format!(
        "{}03.02.2026;REWE BERLIN;12,30;Supermarket;Food;Visa\n04.02.2026;TEAM LUNCH;50,00;;;Amex\n",
        HEADER
    );

    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    let first = ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();
    assert_eq!(first.inserted, 2);

    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    assert_eq!(preview.count(&RowStatus::Duplicate), 2);
    let second = ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 2);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn failed_commit_leaves_no_partial_batch() {
    let mut conn = base_conn();
    let source = FixedSource(Some("1.10".parse().unwrap()));
    let body = format!(
        "{}03.02.2026;REWE;12,30;Supermarket;Food;Visa\n04.02.2026;LIDL;8,00;Supermarket;Food;Visa\n",
        HEADER
    );

    // Abort the second insert of the batch at the storage layer.
    conn.execute_batch(
        "CREATE TRIGGER fail_second_insert BEFORE INSERT ON transactions
         WHEN (SELECT COUNT(*) FROM transactions) >= 1
         BEGIN SELECT RAISE(ABORT, 'storage failed'); END;",
    )
    .unwrap();

    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    assert!(ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).is_err());

    // Not even the first row survives a mid-batch failure.
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);

    // Retrying the whole batch after the fault clears succeeds.
    conn.execute_batch("DROP TRIGGER fail_second_insert;").unwrap();
    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    let summary = ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();
    assert_eq!(summary.inserted, 2);
}

#[test]
fn malformed_rows_are_skipped_not_fatal() {
    let mut conn = base_conn();
    let source = FixedSource(Some("1.10".parse().unwrap()));
    let body = format!(
        "{}31.02.2026;BAD DATE;5,00;Supermarket;Food;Visa\n03.02.2026;REWE;12,30;Supermarket;Food;Visa\n04.02.2026;NO AMOUNT;abc;Supermarket;Food;Visa\n",
        HEADER
    );
    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    assert_eq!(preview.count(&RowStatus::ParseError), 2);
    assert_eq!(preview.count(&RowStatus::Ready), 1);

    let summary = ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.parse_errors, 2);
}

#[test]
fn unresolved_rate_holds_row_until_manual_rate() {
    let mut conn = base_conn();
    let source = FixedSource(None);
    let body = format!("{}03.02.2026;REWE;12,30;Supermarket;Food;Visa\n", HEADER);

    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    assert_eq!(preview.count(&RowStatus::NeedsRate), 1);
    let held = ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();
    assert_eq!(held.inserted, 0);
    assert_eq!(held.held_rate, 1);

    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    let corrections = vec![Correction {
        line: 1,
        rate: Some("1.20".parse().unwrap()),
        ..Default::default()
    }];
    let summary = ingest::commit(&mut conn, preview, &corrections, &CommitOptions::default()).unwrap();
    assert_eq!(summary.inserted, 1);

    let (usd, rate): (String, String) = conn
        .query_row(
            "SELECT amount_usd, exchange_rate FROM transactions",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(usd, "14.76");
    assert_eq!(rate, "1.20");
}

#[test]
fn uncategorized_rows_need_explicit_opt_in() {
    let mut conn = base_conn();
    let source = FixedSource(Some("1.10".parse().unwrap()));
    let body = format!("{}03.02.2026;MYSTERY SHOP;9,99;;;Visa\n", HEADER);

    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    assert_eq!(preview.count(&RowStatus::NeedsCategory), 1);
    let held = ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();
    assert_eq!(held.inserted, 0);
    assert_eq!(held.held_category, 1);

    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    let opts = CommitOptions {
        accept_uncategorized: true,
    };
    let summary = ingest::commit(&mut conn, preview, &[], &opts).unwrap();
    assert_eq!(summary.inserted, 1);

    let (bt, cat, sub): (String, String, String) = conn
        .query_row(
            "SELECT budget_type, category, subcategory FROM transactions",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(
        (bt.as_str(), cat.as_str(), sub.as_str()),
        ("Unexpected", "Unexpected", "Uncategorized")
    );
}

#[test]
fn flagged_correction_teaches_classifier() {
    let mut conn = base_conn();
    let source = FixedSource(Some("1.10".parse().unwrap()));
    let body = format!("{}03.02.2026;REWE FRANKFURT;12,30;;;Visa\n", HEADER);

    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    assert_eq!(preview.count(&RowStatus::NeedsCategory), 1);
    let corrections = vec![Correction {
        line: 1,
        subcategory: Some("Supermarket".to_string()),
        learn: true,
        ..Default::default()
    }];
    let summary = ingest::commit(&mut conn, preview, &corrections, &CommitOptions::default()).unwrap();
    assert_eq!(summary.inserted, 1);

    // A later row from the same merchant classifies without a correction.
    let body = format!("{}10.02.2026;REWE BERLIN;7,49;;;Visa\n", HEADER);
    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    assert_eq!(preview.count(&RowStatus::Ready), 1);
    assert_eq!(
        preview.rows[0].candidate.as_ref().unwrap().subcategory,
        Some("Supermarket".to_string())
    );
}

#[test]
fn recategorize_is_the_only_mutation_path() {
    let mut conn = base_conn();
    conn.execute(
        "INSERT INTO categories(budget_type, category, subcategory)
         VALUES ('Fun','Leisure','Eating Out')",
        [],
    )
    .unwrap();
    let source = FixedSource(Some("1.10".parse().unwrap()));
    let body = format!("{}03.02.2026;REWE TO GO;12,30;Supermarket;Food;Visa\n", HEADER);
    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();

    let uuid: String = conn
        .query_row("SELECT uuid FROM transactions", [], |r| r.get(0))
        .unwrap();
    ingest::recategorize(&conn, &uuid, "Eating Out", Some("kiosk"), true).unwrap();

    let (bt, cat, sub, note): (String, String, String, Option<String>) = conn
        .query_row(
            "SELECT budget_type, category, subcategory, note FROM transactions",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!((bt.as_str(), cat.as_str(), sub.as_str()), ("Fun", "Leisure", "Eating Out"));
    assert_eq!(note.unwrap(), "kiosk");

    // The learn flag recorded the corrected mapping.
    let confidence: i64 = conn
        .query_row(
            "SELECT confidence FROM merchant_patterns WHERE pattern='REWE' AND subcategory='Eating Out'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(confidence, 1);

    let err = ingest::recategorize(&conn, &uuid, "Nonexistent", None, false).unwrap_err();
    assert!(matches!(err, billfold::errors::LedgerError::UnknownCategory(_)));
}

#[test]
fn archive_is_soft() {
    let mut conn = base_conn();
    let source = FixedSource(Some("1.10".parse().unwrap()));
    let body = format!("{}03.02.2026;REWE;12,30;Supermarket;Food;Visa\n", HEADER);
    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();

    let uuid: String = conn
        .query_row("SELECT uuid FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert!(ingest::archive(&conn, &uuid).unwrap());
    assert!(!ingest::archive(&conn, "no-such-uuid").unwrap());

    // The row survives, and its identity key still blocks re-import.
    let archived: bool = conn
        .query_row("SELECT archived FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert!(archived);
    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    assert_eq!(preview.count(&RowStatus::Duplicate), 1);
}

#[test]
fn stored_rows_hydrate_into_transactions() {
    let mut conn = base_conn();
    let source = FixedSource(Some("1.10".parse().unwrap()));
    let body = format!(
        "{}03.02.2026;REWE BERLIN;12,30;Supermarket;Food;Visa\n04.02.2026;TEAM LUNCH;50,00;;;Amex\n",
        HEADER
    );
    let preview = ingest::preview(&conn, &source, &cfg(), &mut reader(&body)).unwrap();
    ingest::commit(&mut conn, preview, &[], &CommitOptions::default()).unwrap();

    let uuid: String = conn
        .query_row(
            "SELECT uuid FROM transactions WHERE reimbursable=1",
            [],
            |r| r.get(0),
        )
        .unwrap();
    let tx = ingest::transaction(&conn, &uuid).unwrap().unwrap();
    assert!(tx.reimbursable);
    assert!(!tx.archived);
    assert_eq!(tx.original_currency, Currency::Usd);
    assert_eq!(tx.amount_usd.to_string(), "50.00");
    assert!(tx.amount_eur.is_none());
    assert!(tx.exchange_rate.is_none());
    assert_eq!(tx.date, NaiveDate::from_ymd_opt(2026, 2, 4).unwrap());

    assert!(ingest::transaction(&conn, "missing").unwrap().is_none());
}

#[test]
fn preview_from_statement_file() {
    let conn = base_conn();
    let source = FixedSource(Some("1.10".parse().unwrap()));

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "{}03.02.2026;REWE;1.234,56 €;Supermarket;Food;Visa\n",
        HEADER
    )
    .unwrap();
    file.flush().unwrap();

    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_path(file.path())
        .unwrap();
    let preview = ingest::preview(&conn, &source, &cfg(), &mut rdr).unwrap();
    assert_eq!(preview.count(&RowStatus::Ready), 1);
    let cand = preview.rows[0].candidate.as_ref().unwrap();
    assert_eq!(cand.amount.to_string(), "1234.56");
    assert_eq!(
        cand.date,
        NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
    );
}
