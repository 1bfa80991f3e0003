// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::reimburse;
use crate::utils::{maybe_print_json, parse_date, parse_decimal, parse_month, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("recompute", sub)) => {
            let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
            let rec = reimburse::recompute(conn, year, month)?;
            println!(
                "{}-{:02}: total {} USD, settled {} USD",
                year, month, rec.total_usd, rec.settled_usd
            );
        }
        Some(("settle", sub)) => {
            let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let date = parse_date(sub.get_one::<String>("date").unwrap())?;
            let outcome = reimburse::settle(conn, year, month, amount, date)?;
            println!(
                "{}-{:02}: settled {} of {} USD",
                year, month, outcome.record.settled_usd, outcome.record.total_usd
            );
            if outcome.over_settled {
                println!("Warning: settled amount exceeds the derived total");
            }
        }
        Some(("status", sub)) => status(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn status(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let records = reimburse::list(conn)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &records)? {
        return Ok(());
    }
    let mut data = Vec::new();
    for rec in &records {
        data.push(vec![
            format!("{}-{:02}", rec.year, rec.month),
            rec.total_usd.to_string(),
            rec.settled_usd.to_string(),
            rec.settlement_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            if rec.settled_usd > rec.total_usd {
                "over-settled"
            } else if rec.settled_usd == rec.total_usd && !rec.total_usd.is_zero() {
                "settled"
            } else {
                "open"
            }
            .to_string(),
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["Month", "Total (USD)", "Settled (USD)", "Settled on", "State"],
            data
        )
    );
    Ok(())
}
