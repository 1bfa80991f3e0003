// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let budget_type = sub.get_one::<String>("type").unwrap().trim();
            let category = sub.get_one::<String>("category").unwrap().trim();
            let subcategory = sub.get_one::<String>("subcategory").unwrap().trim();
            conn.execute(
                "INSERT INTO categories(budget_type, category, subcategory) VALUES (?1,?2,?3)",
                params![budget_type, category, subcategory],
            )?;
            println!("Added {}/{}/{}", budget_type, category, subcategory);
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("deactivate", sub)) => {
            let subcategory = sub.get_one::<String>("subcategory").unwrap().trim();
            let n = conn.execute(
                "UPDATE categories SET is_active=0 WHERE subcategory=?1",
                params![subcategory],
            )?;
            if n == 0 {
                println!("No category definition named '{}'", subcategory);
            } else {
                println!("Deactivated '{}'; existing transactions keep it", subcategory);
            }
        }
        _ => {}
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT budget_type, category, subcategory, is_active FROM categories
         ORDER BY budget_type, category, subcategory",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, bool>(3)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (t, c, s, active) = row?;
        data.push(vec![t, c, s, if active { "yes" } else { "no" }.to_string()]);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!(
            "{}",
            pretty_table(&["Type", "Category", "Subcategory", "Active"], data)
        );
    }
    Ok(())
}
