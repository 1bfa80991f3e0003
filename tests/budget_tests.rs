// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::budget::{self, BudgetStatus, RolloverTarget};
use billfold::db;
use billfold::errors::LedgerError;
use billfold::models::Currency;
use billfold::savings;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn seed_template(conn: &Connection) {
    conn.execute("INSERT INTO budget_templates(name) VALUES ('standard')", [])
        .unwrap();
    for (t, c, s, a) in [
        ("Essential", "Food", "Supermarket", "400"),
        ("Essential", "Housing", "Rent", "1200"),
        ("Fun", "Leisure", "Eating Out", "0"),
    ] {
        conn.execute(
            "INSERT INTO template_lines(template_id, budget_type, category, subcategory, budgeted_amount)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![t, c, s, a],
        )
        .unwrap();
    }
}

fn insert_spend(
    conn: &Connection,
    uuid: &str,
    date: &str,
    triple: (&str, &str, &str),
    amount_eur: &str,
) {
    conn.execute(
        "INSERT INTO transactions(
            uuid, date, description, original_amount, original_currency,
            amount_eur, amount_usd, exchange_rate, budget_type, category, subcategory
         ) VALUES (?1, ?2, 'spend', ?3, 'EUR', ?3, ?3, '1.0', ?4, ?5, ?6)",
        params![uuid, date, amount_eur, triple.0, triple.1, triple.2],
    )
    .unwrap();
}

#[test]
fn instantiate_copies_template_once() {
    let mut c = conn();
    seed_template(&c);
    let n = budget::instantiate(&mut c, "standard", 2026, 2).unwrap();
    assert_eq!(n, 3);

    let err = budget::instantiate(&mut c, "standard", 2026, 2).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::AlreadyInstantiated { year: 2026, month: 2 }
    ));
    let count: i64 = c
        .query_row(
            "SELECT COUNT(*) FROM monthly_budgets WHERE year=2026 AND month=2",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(count, 3);
}

#[test]
fn locked_rows_reject_amount_edits() {
    let mut c = conn();
    seed_template(&c);
    budget::instantiate(&mut c, "standard", 2026, 2).unwrap();
    budget::lock_month(&mut c, 2026, 2).unwrap();

    let err = budget::set_amount(
        &c,
        2026,
        2,
        "Essential",
        "Food",
        "Supermarket",
        "999".parse().unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::BudgetLocked { year: 2026, month: 2 }));

    let amount: String = c
        .query_row(
            "SELECT budgeted_amount FROM monthly_budgets WHERE subcategory='Supermarket'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(amount, "400");
}

#[test]
fn actuals_cover_every_euro_of_spend() {
    let mut c = conn();
    seed_template(&c);
    budget::instantiate(&mut c, "standard", 2026, 2).unwrap();

    insert_spend(&c, "t1", "2026-02-03", ("Essential", "Food", "Supermarket"), "120.50");
    insert_spend(&c, "t2", "2026-02-10", ("Essential", "Food", "Supermarket"), "200.00");
    insert_spend(&c, "t3", "2026-02-11", ("Fun", "Leisure", "Eating Out"), "35.00");
    // No budget line for this triple; must land in the unbudgeted group.
    insert_spend(&c, "t4", "2026-02-12", ("Fun", "Travel", "Train"), "89.90");
    // Outside the month; ignored.
    insert_spend(&c, "t5", "2026-03-01", ("Essential", "Food", "Supermarket"), "10.00");

    let report = budget::actuals(&c, 2026, 2).unwrap();

    let supermarket = report
        .lines
        .iter()
        .find(|l| l.subcategory == "Supermarket")
        .unwrap();
    assert_eq!(supermarket.actual.to_string(), "320.50");
    assert_eq!(supermarket.status, BudgetStatus::Near);

    // Zero budget with spend reports as over, not a division error.
    let eating_out = report
        .lines
        .iter()
        .find(|l| l.subcategory == "Eating Out")
        .unwrap();
    assert_eq!(eating_out.status, BudgetStatus::Over);

    assert_eq!(report.unbudgeted.len(), 1);
    assert_eq!(report.unbudgeted[0].subcategory, "Train");
    assert_eq!(report.unbudgeted[0].actual.to_string(), "89.90");

    let line_sum: Decimal = report.lines.iter().map(|l| l.actual).sum();
    let unbudgeted_sum: Decimal = report.unbudgeted.iter().map(|u| u.actual).sum();
    assert_eq!(line_sum + unbudgeted_sum, report.total_spend);
    assert_eq!(report.total_spend.to_string(), "445.40");
}

#[test]
fn actuals_skip_reimbursable_and_archived_rows() {
    let mut c = conn();
    seed_template(&c);
    budget::instantiate(&mut c, "standard", 2026, 2).unwrap();

    insert_spend(&c, "t1", "2026-02-03", ("Essential", "Food", "Supermarket"), "50.00");
    conn_insert_reimbursable(&c, "r1", "2026-02-04", "80.00");
    insert_spend(&c, "t2", "2026-02-05", ("Essential", "Food", "Supermarket"), "30.00");
    c.execute("UPDATE transactions SET archived=1 WHERE uuid='t2'", [])
        .unwrap();

    let report = budget::actuals(&c, 2026, 2).unwrap();
    assert_eq!(report.total_spend.to_string(), "50.00");
}

fn conn_insert_reimbursable(conn: &Connection, uuid: &str, date: &str, amount_usd: &str) {
    conn.execute(
        "INSERT INTO transactions(
            uuid, date, description, original_amount, original_currency,
            amount_usd, reimbursable, budget_type, category, subcategory
         ) VALUES (?1, ?2, 'work expense', ?3, 'USD', ?3, 1,
                   'Additional', 'Reimbursable', 'Reimbursable')",
        params![uuid, date, amount_usd],
    )
    .unwrap();
}

#[test]
fn rollover_routes_leftover_to_next_month_income() {
    let mut c = conn();
    seed_template(&c);
    budget::instantiate(&mut c, "standard", 2026, 2).unwrap();
    c.execute(
        "INSERT INTO income_streams(name, amount) VALUES ('salary', '3000')",
        [],
    )
    .unwrap();
    insert_spend(&c, "t1", "2026-02-03", ("Essential", "Food", "Supermarket"), "400.00");

    let bucket = savings::create_bucket(
        &c,
        "emergency",
        Currency::Eur,
        "10000".parse().unwrap(),
        Decimal::ZERO,
        None,
    )
    .unwrap();
    savings::credit(&c, bucket, "2026-02-15".parse().unwrap(), "600".parse().unwrap(), None)
        .unwrap();

    let summary = budget::rollover(&c, 2026, 2).unwrap();
    assert_eq!(summary.income.to_string(), "3000");
    assert_eq!(summary.spend.to_string(), "400.00");
    assert_eq!(summary.saved.to_string(), "600");
    assert_eq!(summary.leftover.to_string(), "2000.00");

    // Lock the next month first; the rollover row is the sanctioned
    // post-lock addition.
    budget::instantiate(&mut c, "standard", 2026, 3).unwrap();
    budget::lock_month(&mut c, 2026, 3).unwrap();
    budget::apply_rollover(&mut c, 2026, 2, RolloverTarget::NextMonthIncome).unwrap();

    let (amount, is_rollover): (String, bool) = c
        .query_row(
            "SELECT budgeted_amount, is_rollover FROM monthly_budgets
             WHERE year=2026 AND month=3 AND budget_type='Income'
               AND category='Rollover' AND subcategory='Rollover'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(amount, "2000.00");
    assert!(is_rollover);

    // Applying again accumulates instead of duplicating the row.
    budget::apply_rollover(&mut c, 2026, 2, RolloverTarget::NextMonthIncome).unwrap();
    let (count, amount): (i64, String) = c
        .query_row(
            "SELECT COUNT(*), budgeted_amount FROM monthly_budgets
             WHERE year=2026 AND month=3 AND category='Rollover'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(amount, "4000.00");
}

#[test]
fn rollover_can_feed_a_savings_bucket() {
    let mut c = conn();
    c.execute(
        "INSERT INTO income_streams(name, amount) VALUES ('salary', '1000')",
        [],
    )
    .unwrap();
    let bucket = savings::create_bucket(
        &c,
        "vacation",
        Currency::Eur,
        "5000".parse().unwrap(),
        Decimal::ZERO,
        None,
    )
    .unwrap();

    budget::apply_rollover(&mut c, 2026, 2, RolloverTarget::SavingsBucket(bucket)).unwrap();
    assert_eq!(savings::balance(&c, bucket).unwrap().to_string(), "1000");

    let (date, kind): (String, String) = c
        .query_row(
            "SELECT date, kind FROM savings_movements WHERE bucket_id=?1",
            params![bucket],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(date, "2026-02-28");
    assert_eq!(kind, "credit");
}

#[test]
fn inactive_income_streams_are_excluded() {
    let c = conn();
    c.execute(
        "INSERT INTO income_streams(name, amount) VALUES ('salary', '3000')",
        [],
    )
    .unwrap();
    c.execute(
        "INSERT INTO income_streams(name, amount, is_active) VALUES ('old job', '2000', 0)",
        [],
    )
    .unwrap();
    let summary = budget::rollover(&c, 2026, 2).unwrap();
    assert_eq!(summary.income.to_string(), "3000");
}
