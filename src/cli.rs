// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

pub fn build_cli() -> Command {
    Command::new("billfold")
        .version(crate_version!())
        .about("Dual-currency statement ledger with budgets, reimbursements, and savings")
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("import")
                .about("Preview and commit bank statement batches")
                .subcommand(
                    json_flags(
                        Command::new("preview")
                            .about("Normalize, classify, and dedup a statement without writing"),
                    )
                    .arg(Arg::new("path").long("path").required(true)),
                )
                .subcommand(
                    Command::new("commit")
                        .about("Commit a statement batch all-or-nothing")
                        .arg(Arg::new("path").long("path").required(true))
                        .arg(
                            Arg::new("corrections")
                                .long("corrections")
                                .help("JSON file of per-line corrections"),
                        )
                        .arg(
                            Arg::new("accept-uncategorized")
                                .long("accept-uncategorized")
                                .action(ArgAction::SetTrue)
                                .help("Commit uncategorized rows under the fallback category"),
                        ),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage category definitions")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("type").long("type").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("subcategory").long("subcategory").required(true)),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("deactivate")
                        .arg(Arg::new("subcategory").long("subcategory").required(true)),
                ),
        )
        .subcommand(
            Command::new("template")
                .about("Manage budget templates")
                .subcommand(
                    Command::new("create").arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(
                    Command::new("add-line")
                        .arg(Arg::new("template").long("template").required(true))
                        .arg(Arg::new("type").long("type").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("subcategory").long("subcategory").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("budget")
                .about("Monthly budgets: instantiate, edit, lock, report")
                .subcommand(
                    Command::new("instantiate")
                        .arg(Arg::new("template").long("template").required(true))
                        .arg(Arg::new("month").long("month").required(true)),
                )
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("month").long("month").required(true))
                        .arg(Arg::new("type").long("type").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("subcategory").long("subcategory").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                )
                .subcommand(
                    Command::new("lock").arg(Arg::new("month").long("month").required(true)),
                )
                .subcommand(
                    json_flags(Command::new("actuals"))
                        .arg(Arg::new("month").long("month").required(true)),
                )
                .subcommand(
                    Command::new("rollover")
                        .about("Compute a month's leftover and optionally route it")
                        .arg(Arg::new("month").long("month").required(true))
                        .arg(
                            Arg::new("to")
                                .long("to")
                                .value_parser(["income", "bucket"])
                                .help("Where the leftover goes; omit to only report"),
                        )
                        .arg(Arg::new("bucket").long("bucket").help("Savings bucket name")),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("List and mutate committed transactions")
                .subcommand(
                    json_flags(Command::new("list"))
                        .arg(Arg::new("month").long("month"))
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("reimbursable")
                                .long("reimbursable")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("recategorize")
                        .arg(Arg::new("uuid").long("uuid").required(true))
                        .arg(Arg::new("subcategory").long("subcategory").required(true))
                        .arg(Arg::new("note").long("note"))
                        .arg(
                            Arg::new("learn")
                                .long("learn")
                                .action(ArgAction::SetTrue)
                                .help("Teach the classifier this mapping"),
                        ),
                )
                .subcommand(
                    Command::new("archive").arg(Arg::new("uuid").long("uuid").required(true)),
                )
                .subcommand(
                    Command::new("export")
                        .about("Write committed transactions to a CSV file")
                        .arg(Arg::new("out").long("out").required(true))
                        .arg(Arg::new("month").long("month")),
                ),
        )
        .subcommand(
            Command::new("savings")
                .about("Savings buckets and movements")
                .subcommand(
                    Command::new("create")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("currency")
                                .long("currency")
                                .value_parser(["EUR", "USD"])
                                .default_value("EUR"),
                        )
                        .arg(Arg::new("goal").long("goal").required(true))
                        .arg(Arg::new("start").long("start").default_value("0"))
                        .arg(Arg::new("target-date").long("target-date")),
                )
                .subcommand(
                    Command::new("credit")
                        .arg(Arg::new("bucket").long("bucket").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("debit")
                        .arg(Arg::new("bucket").long("bucket").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("transfer")
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    json_flags(Command::new("status"))
                        .arg(Arg::new("bucket").long("bucket").required(true)),
                )
                .subcommand(
                    json_flags(Command::new("projection"))
                        .arg(Arg::new("bucket").long("bucket").required(true))
                        .arg(Arg::new("as-of").long("as-of")),
                ),
        )
        .subcommand(
            Command::new("reimburse")
                .about("Monthly reimbursement rollups and settlements")
                .subcommand(
                    Command::new("recompute").arg(Arg::new("month").long("month").required(true)),
                )
                .subcommand(
                    Command::new("settle")
                        .arg(Arg::new("month").long("month").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("date").long("date").required(true)),
                )
                .subcommand(json_flags(Command::new("status"))),
        )
        .subcommand(
            Command::new("rates")
                .about("EUR->USD exchange rate cache")
                .subcommand(
                    Command::new("fetch")
                        .arg(Arg::new("start").long("start").required(true))
                        .arg(Arg::new("end").long("end").required(true)),
                )
                .subcommand(Command::new("show").arg(Arg::new("date").long("date")))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("rate").long("rate").required(true)),
                ),
        )
        .subcommand(
            Command::new("patterns")
                .about("Learned merchant patterns")
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("reset")
                        .arg(Arg::new("pattern").long("pattern").required(true)),
                ),
        )
        .subcommand(
            Command::new("income")
                .about("Recurring income streams")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("owner").long("owner")),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("deactivate").arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Instance settings")
                .subcommand(
                    Command::new("set-cards").arg(
                        Arg::new("cards")
                            .long("cards")
                            .required(true)
                            .help("Comma-separated card names treated as reimbursable"),
                    ),
                )
                .subcommand(Command::new("show")),
        )
}
