// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::classifier::{self, Classification, Classifier};
use billfold::db;
use rusqlite::Connection;

fn conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

#[test]
fn repeated_confirmations_raise_confidence() {
    let conn = conn();
    let mut c = Classifier::load(&conn).unwrap();
    c.learn(&conn, "REWE FRANKFURT HBF", "Supermarket").unwrap();
    c.learn(&conn, "REWE BERLIN MITTE", "Supermarket").unwrap();
    c.learn(&conn, "REWE SAGT DANKE", "Supermarket").unwrap();

    assert_eq!(
        c.classify("REWE FILIALE 1234"),
        Classification::Hit {
            subcategory: "Supermarket".to_string(),
            confidence: 3
        }
    );

    // One row, counter at three, not three rows.
    let (count, confidence): (i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), confidence FROM merchant_patterns WHERE pattern='REWE'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(confidence, 3);
}

#[test]
fn relearning_adds_a_row_instead_of_overwriting() {
    let conn = conn();
    let mut c = Classifier::load(&conn).unwrap();
    c.learn(&conn, "AMAZON MARKETPLACE", "Shopping").unwrap();
    c.learn(&conn, "AMAZON MARKETPLACE", "Shopping").unwrap();
    c.learn(&conn, "AMAZON PRIME VIDEO", "Entertainment").unwrap();

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM merchant_patterns WHERE pattern='AMAZON'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(count, 2);

    // Confidence decides: the established mapping still wins.
    assert_eq!(
        c.classify("AMAZON RETOURE"),
        Classification::Hit {
            subcategory: "Shopping".to_string(),
            confidence: 2
        }
    );
}

#[test]
fn equal_confidence_across_subcategories_is_ambiguous() {
    let conn = conn();
    let mut c = Classifier::load(&conn).unwrap();
    c.learn(&conn, "PAYPAL EBAY", "Shopping").unwrap();
    c.learn(&conn, "PAYPAL STEAM", "Entertainment").unwrap();

    assert_eq!(c.classify("PAYPAL IRGENDWAS"), Classification::Ambiguous);
}

#[test]
fn learned_mapping_matches_its_own_merchant_again() {
    let conn = conn();
    let mut c = Classifier::load(&conn).unwrap();
    // Leading token shorter than three characters; the stored pattern must
    // still be a prefix of the description it came from.
    c.learn(&conn, "DB Vertrieb GmbH", "Train").unwrap();

    let expected = Classification::Hit {
        subcategory: "Train".to_string(),
        confidence: 1,
    };
    assert_eq!(c.classify("DB Vertrieb GmbH"), expected);

    let reloaded = Classifier::load(&conn).unwrap();
    assert_eq!(reloaded.classify("DB VERTRIEB GMBH FAHRKARTE 778"), expected);
}

#[test]
fn unknown_merchant_is_a_no_match() {
    let conn = conn();
    let c = Classifier::load(&conn).unwrap();
    assert_eq!(c.classify("VOELLIG UNBEKANNT"), Classification::NoMatch);
}

#[test]
fn reset_drops_every_mapping_for_a_pattern() {
    let conn = conn();
    let mut c = Classifier::load(&conn).unwrap();
    c.learn(&conn, "PAYPAL EBAY", "Shopping").unwrap();
    c.learn(&conn, "PAYPAL STEAM", "Entertainment").unwrap();

    let removed = classifier::reset_pattern(&conn, "paypal").unwrap();
    assert_eq!(removed, 2);

    let reloaded = Classifier::load(&conn).unwrap();
    assert_eq!(reloaded.classify("PAYPAL EBAY"), Classification::NoMatch);
}
