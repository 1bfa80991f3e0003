// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ingest;
use crate::reimburse;
use crate::utils::{maybe_print_json, month_bounds, parse_month, pretty_table};
use anyhow::{Context, Result};
use chrono::Datelike;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("recategorize", sub)) => {
            let uuid = sub.get_one::<String>("uuid").unwrap().trim();
            let subcategory = sub.get_one::<String>("subcategory").unwrap().trim();
            let note = sub.get_one::<String>("note").map(String::as_str);
            ingest::recategorize(conn, uuid, subcategory, note, sub.get_flag("learn"))?;
            println!("Recategorized {} -> {}", uuid, subcategory);
        }
        Some(("archive", sub)) => archive(conn, sub)?,
        Some(("export", sub)) => export(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut sql = String::from(
        "SELECT uuid, date, description, original_amount, original_currency,
                amount_usd, subcategory, reimbursable
         FROM transactions WHERE archived=0",
    );
    let mut binds: Vec<String> = Vec::new();
    if let Some(month) = sub.get_one::<String>("month") {
        let (year, m) = parse_month(month)?;
        let (first, last) = month_bounds(year, m)?;
        binds.push(first.to_string());
        sql.push_str(&format!(" AND date>=?{}", binds.len()));
        binds.push(last.to_string());
        sql.push_str(&format!(" AND date<=?{}", binds.len()));
    }
    if let Some(cat) = sub.get_one::<String>("category") {
        binds.push(cat.trim().to_string());
        sql.push_str(&format!(" AND category=?{}", binds.len()));
    }
    if sub.get_flag("reimbursable") {
        sql.push_str(" AND reimbursable=1");
    }
    sql.push_str(" ORDER BY date, description");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(binds.iter()), |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, Option<String>>(6)?,
            r.get::<_, bool>(7)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (uuid, date, desc, amount, ccy, usd, subcat, reimb) = row?;
        data.push(vec![
            uuid.get(..12).unwrap_or(uuid.as_str()).to_string(),
            date,
            desc,
            format!("{} {}", amount, ccy),
            usd,
            subcat.unwrap_or_default(),
            if reimb { "yes" } else { "" }.to_string(),
        ]);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Description", "Original", "USD", "Subcategory", "Reimb"],
                data
            )
        );
    }
    Ok(())
}

fn export(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let out = sub.get_one::<String>("out").unwrap().trim();
    let mut sql = String::from(
        "SELECT uuid, date, description, original_amount, original_currency,
                amount_eur, amount_usd, exchange_rate, budget_type, category,
                subcategory, card, reimbursable, note
         FROM transactions WHERE archived=0",
    );
    let mut binds: Vec<String> = Vec::new();
    if let Some(month) = sub.get_one::<String>("month") {
        let (year, m) = parse_month(month)?;
        let (first, last) = month_bounds(year, m)?;
        binds.push(first.to_string());
        sql.push_str(&format!(" AND date>=?{}", binds.len()));
        binds.push(last.to_string());
        sql.push_str(&format!(" AND date<=?{}", binds.len()));
    }
    sql.push_str(" ORDER BY date, description");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(binds.iter()))?;
    let mut wtr = csv::Writer::from_path(out)?;
    wtr.write_record([
        "uuid",
        "date",
        "description",
        "original_amount",
        "original_currency",
        "amount_eur",
        "amount_usd",
        "exchange_rate",
        "budget_type",
        "category",
        "subcategory",
        "card",
        "reimbursable",
        "note",
    ])?;
    let mut n = 0usize;
    while let Some(r) = rows.next()? {
        let mut record: Vec<String> = Vec::with_capacity(14);
        for idx in 0..12 {
            record.push(r.get::<_, Option<String>>(idx)?.unwrap_or_default());
        }
        record.push(if r.get::<_, bool>(12)? { "1" } else { "0" }.to_string());
        record.push(r.get::<_, Option<String>>(13)?.unwrap_or_default());
        wtr.write_record(&record)?;
        n += 1;
    }
    wtr.flush()?;
    println!("Exported {} transactions to {}", n, out);
    Ok(())
}

fn archive(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let uuid = sub.get_one::<String>("uuid").unwrap().trim();
    let tx = ingest::transaction(conn, uuid)?
        .with_context(|| format!("Transaction '{}' not found", uuid))?;
    if !ingest::archive(conn, uuid)? {
        println!("Transaction '{}' not found", uuid);
        return Ok(());
    }
    // Archived reimbursable spend drops out of the monthly rollup.
    if tx.reimbursable {
        reimburse::recompute(conn, tx.date.year(), tx.date.month())?;
        println!(
            "Archived {}; reimbursements recomputed for {}-{:02}",
            uuid,
            tx.date.year(),
            tx.date.month()
        );
    } else {
        println!("Archived {}", uuid);
    }
    Ok(())
}
