// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let owner = sub.get_one::<String>("owner").map(|s| s.trim());
            conn.execute(
                "INSERT INTO income_streams(name, amount, owner) VALUES (?1,?2,?3)",
                params![name, amount.to_string(), owner],
            )?;
            println!("Added income stream '{}' = {} EUR/month", name, amount);
        }
        Some(("list", _)) => list(conn)?,
        Some(("deactivate", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let n = conn.execute(
                "UPDATE income_streams SET is_active=0 WHERE name=?1",
                params![name],
            )?;
            if n == 0 {
                println!("No income stream named '{}'", name);
            } else {
                println!("Deactivated '{}'", name);
            }
        }
        _ => {}
    }
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT name, amount, owner, is_active FROM income_streams ORDER BY name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, bool>(3)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (name, amount, owner, active) = row?;
        data.push(vec![
            name,
            amount,
            owner.unwrap_or_default(),
            if active { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!(
        "{}",
        pretty_table(&["Name", "Amount (EUR)", "Owner", "Active"], data)
    );
    Ok(())
}
