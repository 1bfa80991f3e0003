// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::rates::{self, FrankfurterSource};
use crate::utils::{parse_date, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("fetch", sub)) => {
            let start = parse_date(sub.get_one::<String>("start").unwrap())?;
            let end = parse_date(sub.get_one::<String>("end").unwrap())?;
            let source = FrankfurterSource::new()?;
            let n = source.fetch_range(conn, start, end)?;
            println!("Cached {} EUR->USD rates for {}..{}", n, start, end);
        }
        Some(("show", sub)) => show(conn, sub)?,
        Some(("set", sub)) => {
            let date = parse_date(sub.get_one::<String>("date").unwrap())?;
            let rate = parse_decimal(sub.get_one::<String>("rate").unwrap())?;
            rates::set_manual_rate(conn, date, rate)?;
            println!("Rate for {} set to {}", date, rate);
        }
        _ => {}
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    if let Some(d) = sub.get_one::<String>("date") {
        let date = parse_date(d)?;
        match rates::cached_rate(conn, date)? {
            Some(rate) => println!("{} -> {}", date, rate),
            None => println!("No cached rate for {}", date),
        }
        return Ok(());
    }
    let mut stmt = conn.prepare(
        "SELECT date, rate FROM exchange_rates ORDER BY date DESC LIMIT 50",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (d, r) = row?;
        data.push(vec![d, r]);
    }
    println!("{}", pretty_table(&["Date", "EUR->USD"], data));
    Ok(())
}
