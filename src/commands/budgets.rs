// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::budget::{self, BudgetStatus, RolloverTarget};
use crate::savings;
use crate::utils::{maybe_print_json, parse_decimal, parse_month, pretty_table};
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("instantiate", sub)) => {
            let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
            let template = sub.get_one::<String>("template").unwrap().trim();
            let n = budget::instantiate(conn, template, year, month)?;
            println!("Instantiated {} budget lines for {}-{:02}", n, year, month);
        }
        Some(("set", sub)) => {
            let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            budget::set_amount(
                conn,
                year,
                month,
                sub.get_one::<String>("type").unwrap().trim(),
                sub.get_one::<String>("category").unwrap().trim(),
                sub.get_one::<String>("subcategory").unwrap().trim(),
                amount,
            )?;
            println!("Budget updated for {}-{:02}", year, month);
        }
        Some(("lock", sub)) => {
            let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
            let n = budget::lock_month(conn, year, month)?;
            println!("Locked {} budget lines for {}-{:02}", n, year, month);
        }
        Some(("actuals", sub)) => actuals(conn, sub)?,
        Some(("rollover", sub)) => rollover(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn status_label(s: BudgetStatus) -> &'static str {
    match s {
        BudgetStatus::Under => "under",
        BudgetStatus::Near => "near",
        BudgetStatus::Over => "over",
    }
}

fn actuals(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
    let report = budget::actuals(conn, year, month)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &report)? {
        return Ok(());
    }
    let mut data = Vec::new();
    for line in &report.lines {
        data.push(vec![
            line.budget_type.clone(),
            line.category.clone(),
            line.subcategory.clone(),
            line.budgeted.to_string(),
            line.actual.to_string(),
            status_label(line.status).to_string(),
        ]);
    }
    for u in &report.unbudgeted {
        data.push(vec![
            u.budget_type.clone(),
            u.category.clone(),
            u.subcategory.clone(),
            "-".to_string(),
            u.actual.to_string(),
            "unbudgeted".to_string(),
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["Type", "Category", "Subcategory", "Budget (EUR)", "Actual (EUR)", "Status"],
            data
        )
    );
    println!("Total spend: {} EUR", report.total_spend);
    Ok(())
}

fn rollover(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
    let summary = match sub.get_one::<String>("to").map(String::as_str) {
        None => budget::rollover(conn, year, month)?,
        Some("income") => {
            budget::apply_rollover(conn, year, month, RolloverTarget::NextMonthIncome)?
        }
        Some("bucket") => {
            let name = sub
                .get_one::<String>("bucket")
                .ok_or_else(|| anyhow!("--bucket is required with --to bucket"))?;
            let bucket = savings::bucket_by_name(conn, name.trim())?
                .with_context(|| format!("Bucket '{}' not found", name))?;
            budget::apply_rollover(conn, year, month, RolloverTarget::SavingsBucket(bucket.id))?
        }
        Some(other) => return Err(anyhow!("Unknown rollover target '{}'", other)),
    };
    println!(
        "{}-{:02}: income={} spend={} saved={} leftover={}",
        year, month, summary.income, summary.spend, summary.saved, summary.leftover
    );
    Ok(())
}
