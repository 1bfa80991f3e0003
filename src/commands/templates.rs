// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            conn.execute(
                "INSERT INTO budget_templates(name) VALUES (?1)",
                params![name],
            )?;
            println!("Created template '{}'", name);
        }
        Some(("add-line", sub)) => add_line(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        _ => {}
    }
    Ok(())
}

fn add_line(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let template = sub.get_one::<String>("template").unwrap().trim();
    let budget_type = sub.get_one::<String>("type").unwrap().trim();
    let category = sub.get_one::<String>("category").unwrap().trim();
    let subcategory = sub.get_one::<String>("subcategory").unwrap().trim();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;

    let template_id: i64 = conn
        .query_row(
            "SELECT id FROM budget_templates WHERE name=?1",
            params![template],
            |r| r.get(0),
        )
        .with_context(|| format!("Template '{}' not found", template))?;
    conn.execute(
        "INSERT INTO template_lines(template_id, budget_type, category, subcategory, budgeted_amount)
         VALUES (?1,?2,?3,?4,?5)",
        params![template_id, budget_type, category, subcategory, amount.to_string()],
    )?;
    println!(
        "Added {}/{}/{} = {} to '{}'",
        budget_type, category, subcategory, amount, template
    );
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT t.name, l.budget_type, l.category, l.subcategory, l.budgeted_amount
         FROM budget_templates t LEFT JOIN template_lines l ON l.template_id = t.id
         ORDER BY t.name, l.budget_type, l.category, l.subcategory",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, Option<String>>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (name, t, c, s, a) = row?;
        data.push(vec![
            name,
            t.unwrap_or_default(),
            c.unwrap_or_default(),
            s.unwrap_or_default(),
            a.unwrap_or_default(),
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["Template", "Type", "Category", "Subcategory", "Amount"],
            data
        )
    );
    Ok(())
}
