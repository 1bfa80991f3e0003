// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use thiserror::Error;

/// Transport-level failure of the external rate source, distinct from a
/// clean "no data for this date" response.
#[derive(Debug, Error)]
#[error("rate source unavailable: {0}")]
pub struct SourceError(pub String);

/// Binary contract of §external rate source: a scalar rate or no data.
pub trait RateSource {
    fn rate_for(&self, date: NaiveDate) -> Result<Option<Decimal>, SourceError>;
}

/// EUR->USD daily reference rates from the Frankfurter API (ECB data).
pub struct FrankfurterSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl FrankfurterSource {
    pub fn new() -> Result<Self> {
        Ok(FrankfurterSource {
            client: crate::utils::http_client()?,
            base_url: "https://api.frankfurter.app".to_string(),
        })
    }

    /// Warm the cache for a whole date range with a single range call.
    /// Existing entries are left untouched.
    pub fn fetch_range(
        &self,
        conn: &Connection,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize> {
        let url = format!("{}/{}..{}?from=EUR&to=USD", self.base_url, start, end);
        let resp = self
            .client
            .get(url)
            .send()
            .context("Rate range request failed")?
            .error_for_status()
            .context("Rate range request rejected")?;
        let body: serde_json::Value = resp.json().context("Invalid rate range response")?;
        let rates = body
            .get("rates")
            .and_then(|r| r.as_object())
            .context("Rate range response missing rates")?;
        let mut inserted = 0;
        for (date, per_ccy) in rates {
            if let Some(rate) = per_ccy.get("USD") {
                // Keep the source's textual precision instead of bouncing
                // through f64.
                let rate: Decimal = rate
                    .to_string()
                    .parse()
                    .with_context(|| format!("Invalid rate '{}' for {}", rate, date))?;
                inserted += conn.execute(
                    "INSERT OR IGNORE INTO exchange_rates(date, rate) VALUES (?1, ?2)",
                    params![date, rate.to_string()],
                )?;
            }
        }
        Ok(inserted)
    }
}

impl RateSource for FrankfurterSource {
    fn rate_for(&self, date: NaiveDate) -> Result<Option<Decimal>, SourceError> {
        let url = format!("{}/{}?from=EUR&to=USD", self.base_url, date);
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| SourceError(e.to_string()))?;
        if !resp.status().is_success() {
            // The API answers 404 for dates it has no data for.
            return Ok(None);
        }
        let body: serde_json::Value = resp.json().map_err(|e| SourceError(e.to_string()))?;
        match body.get("rates").and_then(|r| r.get("USD")) {
            Some(v) => v
                .to_string()
                .parse::<Decimal>()
                .map(Some)
                .map_err(|e| SourceError(e.to_string())),
            None => Ok(None),
        }
    }
}

pub fn cached_rate(conn: &Connection, date: NaiveDate) -> Result<Option<Decimal>, LedgerError> {
    let r: Option<String> = conn
        .query_row(
            "SELECT rate FROM exchange_rates WHERE date=?1",
            params![date.to_string()],
            |r| r.get(0),
        )
        .optional()?;
    match r {
        Some(s) => Ok(Some(s.parse::<Decimal>().map_err(|_| {
            LedgerError::parse(0, format!("invalid cached rate '{}'", s))
        })?)),
        None => Ok(None),
    }
}

/// Resolve the EUR->USD rate for a date.
///
/// Lookup order: exact cache hit, exact-date source call, then the source
/// for dates within 3 days (nearest first, earlier date on ties). A window
/// hit is cached under the requested date so the next lookup is O(1).
/// Transport failures get exactly one retry before counting as a miss.
pub fn get_rate(
    conn: &Connection,
    source: &dyn RateSource,
    date: NaiveDate,
) -> Result<Decimal, LedgerError> {
    if let Some(rate) = cached_rate(conn, date)? {
        return Ok(rate);
    }
    if let Some(rate) = probe(source, date) {
        store(conn, date, rate)?;
        return Ok(rate);
    }
    for offset in [-1i64, 1, -2, 2, -3, 3] {
        let nearby = date + Duration::days(offset);
        if let Some(rate) = probe(source, nearby) {
            store(conn, date, rate)?;
            return Ok(rate);
        }
    }
    Err(LedgerError::RateUnresolved(date))
}

fn probe(source: &dyn RateSource, date: NaiveDate) -> Option<Decimal> {
    for _ in 0..2 {
        match source.rate_for(date) {
            Ok(found) => return found,
            // One retry on transport failure, then treat as a miss.
            Err(_) => continue,
        }
    }
    None
}

fn store(conn: &Connection, date: NaiveDate, rate: Decimal) -> Result<(), LedgerError> {
    conn.execute(
        "INSERT OR IGNORE INTO exchange_rates(date, rate) VALUES (?1, ?2)",
        params![date.to_string(), rate.to_string()],
    )?;
    Ok(())
}

/// Manual override for dates the source cannot resolve. Cached entries are
/// immutable, so overriding an already-cached date is rejected.
pub fn set_manual_rate(conn: &Connection, date: NaiveDate, rate: Decimal) -> Result<()> {
    if cached_rate(conn, date)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .is_some()
    {
        anyhow::bail!("Rate for {} already cached", date);
    }
    if rate <= Decimal::ZERO {
        anyhow::bail!("Rate must be positive");
    }
    conn.execute(
        "INSERT INTO exchange_rates(date, rate) VALUES (?1, ?2)",
        params![date.to_string(), rate.to_string()],
    )?;
    Ok(())
}
