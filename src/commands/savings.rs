// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Currency;
use crate::savings;
use crate::utils::{maybe_print_json, parse_date, parse_decimal};
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => create(conn, sub)?,
        Some(("credit", sub)) => movement(conn, sub, true)?,
        Some(("debit", sub)) => movement(conn, sub, false)?,
        Some(("transfer", sub)) => transfer(conn, sub)?,
        Some(("status", sub)) => status(conn, sub)?,
        Some(("projection", sub)) => projection(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn bucket_id(conn: &Connection, sub: &clap::ArgMatches, arg: &str) -> Result<i64> {
    let name = sub.get_one::<String>(arg).unwrap().trim();
    let bucket = savings::bucket_by_name(conn, name)?
        .with_context(|| format!("Bucket '{}' not found", name))?;
    Ok(bucket.id)
}

fn create(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim();
    let ccy = sub.get_one::<String>("currency").unwrap();
    let currency =
        Currency::from_str_tag(ccy).ok_or_else(|| anyhow!("Unknown currency '{}'", ccy))?;
    let goal = parse_decimal(sub.get_one::<String>("goal").unwrap())?;
    let start = parse_decimal(sub.get_one::<String>("start").unwrap())?;
    let target_date = match sub.get_one::<String>("target-date") {
        Some(d) => Some(parse_date(d)?),
        None => None,
    };
    let id = savings::create_bucket(conn, name, currency, goal, start, target_date)?;
    println!("Created bucket '{}' (#{})", name, id);
    Ok(())
}

fn movement(conn: &Connection, sub: &clap::ArgMatches, is_credit: bool) -> Result<()> {
    let id = bucket_id(conn, sub, "bucket")?;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let note = sub.get_one::<String>("note").map(String::as_str);
    if is_credit {
        savings::credit(conn, id, date, amount, note)?;
    } else {
        savings::debit(conn, id, date, amount, note)?;
    }
    println!("Balance: {}", savings::balance(conn, id)?);
    Ok(())
}

fn transfer(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let from = bucket_id(conn, sub, "from")?;
    let to = bucket_id(conn, sub, "to")?;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let note = sub.get_one::<String>("note").map(String::as_str);
    let group = savings::transfer(conn, from, to, date, amount, note)?;
    println!("Transfer recorded (group {})", group);
    Ok(())
}

fn status(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = bucket_id(conn, sub, "bucket")?;
    let progress = savings::progress(conn, id)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &progress)? {
        return Ok(());
    }
    match progress.percent {
        Some(p) => println!(
            "Balance {} / goal {} ({:.1}%){}",
            progress.balance,
            progress.goal,
            p,
            if progress.exceeded { " - goal exceeded" } else { "" }
        ),
        None => println!("Balance {} (no goal set)", progress.balance),
    }
    Ok(())
}

fn projection(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = bucket_id(conn, sub, "bucket")?;
    let as_of = match sub.get_one::<String>("as-of") {
        Some(d) => parse_date(d)?,
        None => Utc::now().date_naive(),
    };
    let projection = savings::projection(conn, id, as_of)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &projection)? {
        return Ok(());
    }
    match projection.months_to_goal {
        Some(m) => println!(
            "Trailing net {}/month; about {:.1} months to goal",
            projection.monthly_net, m
        ),
        None => println!(
            "Trailing net {}/month; goal unreachable at the current pace",
            projection.monthly_net
        ),
    }
    Ok(())
}
