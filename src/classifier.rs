// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::MerchantPattern;
use rusqlite::{Connection, Result, params};

/// Outcome of a classification attempt. `Ambiguous` means two patterns of
/// equal confidence point at different subcategories; the row must go to
/// manual review rather than be guessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Hit { subcategory: String, confidence: i64 },
    Ambiguous,
    NoMatch,
}

/// Compiled prefix matcher over the learned merchant patterns. Patterns are
/// matched case-insensitively against the start of the description; the
/// highest-confidence match wins.
pub struct Classifier {
    patterns: Vec<MerchantPattern>,
}

impl Classifier {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT pattern, subcategory, confidence FROM merchant_patterns
             ORDER BY confidence DESC, pattern",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(MerchantPattern {
                pattern: r.get(0)?,
                subcategory: r.get(1)?,
                confidence: r.get(2)?,
            })
        })?;
        let mut patterns = Vec::new();
        for row in rows {
            patterns.push(row?);
        }
        Ok(Classifier { patterns })
    }

    pub fn classify(&self, description: &str) -> Classification {
        let hay = description.trim().to_uppercase();
        let mut best: Option<&MerchantPattern> = None;
        let mut tied_other = false;
        for p in &self.patterns {
            if !hay.starts_with(&p.pattern) {
                continue;
            }
            match best {
                None => best = Some(p),
                Some(b) if p.confidence > b.confidence => {
                    best = Some(p);
                    tied_other = false;
                }
                Some(b) if p.confidence == b.confidence && p.subcategory != b.subcategory => {
                    tied_other = true;
                }
                Some(_) => {}
            }
        }
        match best {
            Some(_) if tied_other => Classification::Ambiguous,
            Some(b) => Classification::Hit {
                subcategory: b.subcategory.clone(),
                confidence: b.confidence,
            },
            None => Classification::NoMatch,
        }
    }

    /// Record a confirmed (description -> subcategory) pairing. The same
    /// mapping gains confidence; a differing subcategory gets its own row so
    /// the old mapping is never silently overwritten. Conflicts are resolved
    /// by confidence at classify time.
    pub fn learn(&mut self, conn: &Connection, description: &str, subcategory: &str) -> Result<()> {
        let Some(pattern) = extract_pattern(description) else {
            return Ok(());
        };
        conn.execute(
            "INSERT INTO merchant_patterns(pattern, subcategory, confidence, last_used)
             VALUES (?1, ?2, 1, datetime('now'))
             ON CONFLICT(pattern, subcategory)
             DO UPDATE SET confidence = confidence + 1, last_used = excluded.last_used",
            params![pattern, subcategory],
        )?;
        let confidence: i64 = conn.query_row(
            "SELECT confidence FROM merchant_patterns WHERE pattern=?1 AND subcategory=?2",
            params![pattern, subcategory],
            |r| r.get(0),
        )?;
        match self
            .patterns
            .iter_mut()
            .find(|p| p.pattern == pattern && p.subcategory == subcategory)
        {
            Some(p) => p.confidence = confidence,
            None => self.patterns.push(MerchantPattern {
                pattern,
                subcategory: subcategory.to_string(),
                confidence,
            }),
        }
        Ok(())
    }

    pub fn patterns(&self) -> &[MerchantPattern] {
        &self.patterns
    }
}

/// Drop all learned mappings for a pattern. The only path by which
/// confidence may decrease.
pub fn reset_pattern(conn: &Connection, pattern: &str) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM merchant_patterns WHERE pattern=?1",
        params![pattern.to_uppercase()],
    )?;
    Ok(n)
}

/// Deterministic prefix extraction: the description up to and including the
/// first token carrying at least three non-digit characters, uppercased;
/// falls back to the first whitespace token. The result is always a prefix
/// of the normalized description, so a learned pattern matches the very
/// description it was learned from.
pub fn extract_pattern(description: &str) -> Option<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return None;
    }
    let qualifies = |token: &str| token.chars().filter(|c| !c.is_ascii_digit()).count() >= 3;
    let mut token_start: Option<usize> = None;
    for (i, ch) in trimmed.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = token_start.take() {
                if qualifies(&trimmed[s..i]) {
                    return Some(trimmed[..i].to_uppercase());
                }
            }
        } else if token_start.is_none() {
            token_start = Some(i);
        }
    }
    if let Some(s) = token_start {
        if qualifies(&trimmed[s..]) {
            return Some(trimmed.to_uppercase());
        }
    }
    trimmed.split_whitespace().next().map(|s| s.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_prefix_through_the_first_meaningful_token() {
        assert_eq!(extract_pattern("REWE Frank Glawe o").unwrap(), "REWE");
        assert_eq!(extract_pattern("DB Vertrieb GmbH").unwrap(), "DB VERTRIEB");
        assert_eq!(extract_pattern("MCDONALDS 01446").unwrap(), "MCDONALDS");
        assert_eq!(extract_pattern("O2 DE").unwrap(), "O2");
        assert!(extract_pattern("   ").is_none());
    }

    #[test]
    fn extracted_pattern_is_a_prefix_of_its_source() {
        for desc in ["DB Vertrieb GmbH", "REWE SAGT DANKE", "O2 DE", "1&1 Telecom GmbH"] {
            let pattern = extract_pattern(desc).unwrap();
            assert!(
                desc.trim().to_uppercase().starts_with(&pattern),
                "'{}' is not a prefix of '{}'",
                pattern,
                desc
            );
        }
    }

    #[test]
    fn classify_prefers_higher_confidence() {
        let c = Classifier {
            patterns: vec![
                MerchantPattern {
                    pattern: "REWE".into(),
                    subcategory: "Supermarket".into(),
                    confidence: 5,
                },
                MerchantPattern {
                    pattern: "REWE".into(),
                    subcategory: "Fast Food".into(),
                    confidence: 2,
                },
            ],
        };
        assert_eq!(
            c.classify("Rewe Frankfurt"),
            Classification::Hit {
                subcategory: "Supermarket".into(),
                confidence: 5
            }
        );
    }

    #[test]
    fn classify_tie_between_subcategories_is_ambiguous() {
        let c = Classifier {
            patterns: vec![
                MerchantPattern {
                    pattern: "UBER".into(),
                    subcategory: "Transportation".into(),
                    confidence: 3,
                },
                MerchantPattern {
                    pattern: "UBER EATS".into(),
                    subcategory: "Fast Food".into(),
                    confidence: 3,
                },
            ],
        };
        assert_eq!(c.classify("UBER EATS BERLIN"), Classification::Ambiguous);
    }

    #[test]
    fn classify_tie_on_same_subcategory_still_hits() {
        let c = Classifier {
            patterns: vec![
                MerchantPattern {
                    pattern: "LIDL".into(),
                    subcategory: "Supermarket".into(),
                    confidence: 2,
                },
                MerchantPattern {
                    pattern: "LIDL FIL".into(),
                    subcategory: "Supermarket".into(),
                    confidence: 2,
                },
            ],
        };
        assert_eq!(
            c.classify("LIDL FIL 442"),
            Classification::Hit {
                subcategory: "Supermarket".into(),
                confidence: 2
            }
        );
    }
}
