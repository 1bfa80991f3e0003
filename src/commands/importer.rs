// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ingest::{self, CommitOptions, Correction, Preview, RowStatus};
use crate::normalizer::ImportConfig;
use crate::rates::FrankfurterSource;
use crate::utils::{get_reimbursable_cards, maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("preview", sub)) => preview(conn, sub),
        Some(("commit", sub)) => commit(conn, sub),
        _ => Ok(()),
    }
}

fn build_preview(conn: &Connection, path: &str) -> Result<Preview> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open statement {}", path))?;
    let cfg = ImportConfig {
        reimbursable_cards: get_reimbursable_cards(conn)?,
    };
    let source = FrankfurterSource::new()?;
    let preview = ingest::preview(conn, &source, &cfg, &mut rdr)?;
    Ok(preview)
}

fn status_label(s: &RowStatus) -> &'static str {
    match s {
        RowStatus::Ready => "ready",
        RowStatus::NeedsCategory => "needs-category",
        RowStatus::NeedsRate => "needs-rate",
        RowStatus::Duplicate => "duplicate",
        RowStatus::ParseError => "parse-error",
    }
}

fn preview(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let preview = build_preview(conn, path)?;

    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if !maybe_print_json(json_flag, jsonl_flag, &preview.rows)? {
        let mut data = Vec::new();
        for row in &preview.rows {
            let (date, desc, amount, subcat) = match &row.candidate {
                Some(c) => (
                    c.date.to_string(),
                    c.description.clone(),
                    c.amount.to_string(),
                    c.subcategory.clone().unwrap_or_default(),
                ),
                None => Default::default(),
            };
            data.push(vec![
                row.line.to_string(),
                status_label(&row.status).to_string(),
                date,
                desc,
                amount,
                subcat,
                row.detail.clone().unwrap_or_default(),
            ]);
        }
        println!(
            "{}",
            pretty_table(
                &["Line", "Status", "Date", "Description", "Amount", "Subcategory", "Detail"],
                data
            )
        );
        println!(
            "ready={} needs-category={} needs-rate={} duplicates={} parse-errors={}",
            preview.count(&RowStatus::Ready),
            preview.count(&RowStatus::NeedsCategory),
            preview.count(&RowStatus::NeedsRate),
            preview.count(&RowStatus::Duplicate),
            preview.count(&RowStatus::ParseError),
        );
    }
    Ok(())
}

fn commit(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let preview = build_preview(conn, path)?;

    let corrections: Vec<Correction> = match sub.get_one::<String>("corrections") {
        Some(p) => {
            let raw = std::fs::read_to_string(p.trim())
                .with_context(|| format!("Open corrections {}", p))?;
            serde_json::from_str(&raw).with_context(|| format!("Parse corrections {}", p))?
        }
        None => Vec::new(),
    };
    let opts = CommitOptions {
        accept_uncategorized: sub.get_flag("accept-uncategorized"),
    };
    let summary = ingest::commit(conn, preview, &corrections, &opts)?;
    println!(
        "Committed {}: inserted={} duplicates={} held-rate={} held-category={} parse-errors={}",
        path,
        summary.inserted,
        summary.duplicates,
        summary.held_rate,
        summary.held_category,
        summary.parse_errors,
    );
    for (year, month) in &summary.months {
        println!("Reimbursements recomputed for {}-{:02}", year, month);
    }
    Ok(())
}
