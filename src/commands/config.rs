// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{get_reimbursable_cards, set_reimbursable_cards};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set-cards", sub)) => {
            let cards: Vec<String> = sub
                .get_one::<String>("cards")
                .unwrap()
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            set_reimbursable_cards(conn, &cards)?;
            println!("Reimbursable cards: {}", cards.join(", "));
        }
        Some(("show", _)) => {
            let mut cards: Vec<String> = get_reimbursable_cards(conn)?.into_iter().collect();
            cards.sort();
            if cards.is_empty() {
                println!("No reimbursable cards configured");
            } else {
                println!("Reimbursable cards: {}", cards.join(", "));
            }
        }
        _ => {}
    }
    Ok(())
}
