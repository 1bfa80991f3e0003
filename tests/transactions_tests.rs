// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::cli;
use billfold::commands::transactions;
use billfold::db;
use rusqlite::Connection;
use tempfile::NamedTempFile;

fn base_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn insert_row(conn: &Connection, uuid: &str) {
    conn.execute(
        "INSERT INTO transactions(
            uuid, date, description, original_amount, original_currency, amount_usd
         ) VALUES (?1, '2026-02-03', 'KIOSK', '1', 'EUR', '1')",
        [uuid],
    )
    .unwrap();
}

fn dispatch(conn: &Connection, argv: &[&str]) {
    let m = cli::build_cli().get_matches_from(argv);
    let (_, sub) = m.subcommand().unwrap();
    transactions::handle(conn, sub).unwrap();
}

#[test]
fn list_handles_short_identity_keys() {
    let conn = base_conn();
    // Hand-entered rows may carry keys shorter than the displayed width.
    insert_row(&conn, "abc");
    dispatch(&conn, &["billfold", "tx", "list"]);
    dispatch(&conn, &["billfold", "tx", "list", "--month", "2026-02"]);
}

#[test]
fn export_writes_filtered_csv() {
    let conn = base_conn();
    insert_row(&conn, "abc");
    insert_row(&conn, "def0123456789abcdef");
    conn.execute("UPDATE transactions SET date='2026-03-01' WHERE uuid='abc'", [])
        .unwrap();

    let out = NamedTempFile::new().unwrap();
    let path = out.path().to_str().unwrap().to_string();
    dispatch(
        &conn,
        &["billfold", "tx", "export", "--out", &path, "--month", "2026-02"],
    );

    let body = std::fs::read_to_string(out.path()).unwrap();
    let mut lines = body.lines();
    assert!(lines.next().unwrap().starts_with("uuid,date,description"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("def0123456789abcdef,2026-02-03,KIOSK"));
    assert!(lines.next().is_none());
}
