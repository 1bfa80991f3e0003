// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::classifier::{self, Classifier};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => {
            let classifier = Classifier::load(conn)?;
            let patterns = classifier.patterns();
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &patterns)? {
                return Ok(());
            }
            let data = patterns
                .iter()
                .map(|p| {
                    vec![
                        p.pattern.clone(),
                        p.subcategory.clone(),
                        p.confidence.to_string(),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["Pattern", "Subcategory", "Confidence"], data)
            );
        }
        Some(("reset", sub)) => {
            let pattern = sub.get_one::<String>("pattern").unwrap().trim();
            let n = classifier::reset_pattern(conn, pattern)?;
            println!("Removed {} mapping(s) for '{}'", n, pattern.to_uppercase());
        }
        _ => {}
    }
    Ok(())
}
