// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use ledger_engine_rs::{Account, AccountId, Engine, EntryKind, InMemoryDirectory, LedgerEntry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Ledger Engine - Replay operation CSV files
///
/// Reads ledger operations from a CSV file, replays them through the
/// engine, and outputs the derived balance of every account to stdout.
/// Supports credits, debits, and transfers.
#[derive(Parser, Debug)]
#[command(name = "ledger-engine-rs")]
#[command(about = "An account ledger that replays operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,account,counterparty,amount,note
    /// Example: cargo run -- operations.csv > balances.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let replay = match replay_operations(BufReader::new(file)) {
        Ok(replay) => replay,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_balances(&replay, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, account, counterparty, amount, note`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    account: u64,
    #[serde(deserialize_with = "csv::invalid_option")]
    counterparty: Option<u64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    note: Option<String>,
}

/// A parsed ledger operation ready to hand to the engine.
#[derive(Debug)]
enum Operation {
    Entry {
        owner: AccountId,
        amount: Decimal,
        kind: EntryKind,
        note: Option<String>,
    },
    Transfer {
        sender: AccountId,
        receiver: AccountId,
        amount: Decimal,
        note: Option<String>,
    },
}

impl CsvRecord {
    /// Converts a CSV record to an operation.
    ///
    /// Returns `None` for unknown ops or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        let owner = AccountId(self.account);
        let note = self.note.filter(|n| !n.is_empty());

        match self.op.to_lowercase().as_str() {
            "credit" => Some(Operation::Entry {
                owner,
                amount: self.amount?,
                kind: EntryKind::Credit,
                note,
            }),
            "debit" => Some(Operation::Entry {
                owner,
                amount: self.amount?,
                kind: EntryKind::Debit,
                note,
            }),
            "transfer" => Some(Operation::Transfer {
                sender: owner,
                receiver: AccountId(self.counterparty?),
                amount: self.amount?,
                note,
            }),
            _ => None,
        }
    }
}

/// Engine plus the set of accounts seen during a replay.
pub struct Replay {
    engine: Engine,
    accounts: BTreeSet<AccountId>,
}

impl Replay {
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

/// Replays operations from a CSV reader through a fresh engine.
///
/// Accounts are registered in the directory on first sight, since the CSV
/// carries ids rather than profiles. Parsing streams row by row, so
/// arbitrarily large files need constant memory. Malformed rows and
/// rejected operations (insufficient funds, self-transfers) are skipped;
/// rejections are logged in debug builds only.
///
/// # CSV Format
///
/// Expected columns: `op, account, counterparty, amount, note`
/// - `op`: Operation (credit, debit, transfer)
/// - `account`: Owning account id (sender for transfers)
/// - `counterparty`: Receiving account id (transfers only)
/// - `amount`: Decimal amount
/// - `note`: Optional free text
///
/// # Example
///
/// ```csv
/// op,account,counterparty,amount,note
/// credit,1,,100.00,payroll
/// debit,1,,25.00,
/// transfer,1,2,30.00,rent
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is
/// invalid. Individual operation errors don't stop processing.
pub fn replay_operations<R: Read>(reader: R) -> Result<Replay, csv::Error> {
    let directory = Arc::new(InMemoryDirectory::new());
    let engine = Engine::new(directory.clone());
    let mut accounts = BTreeSet::new();

    let register = |id: AccountId, accounts: &mut BTreeSet<AccountId>| {
        if accounts.insert(id) {
            directory.put(Account {
                id,
                username: format!("acct-{id}"),
                display_name: format!("Account {id}"),
            });
        }
    };

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true) // Allow missing counterparty/note fields
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(op) = record.into_operation() else {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping invalid operation record");
                    continue;
                };

                let outcome = match op {
                    Operation::Entry {
                        owner,
                        amount,
                        kind,
                        note,
                    } => {
                        register(owner, &mut accounts);
                        engine.create_entry(owner, amount, kind, note)
                    }
                    Operation::Transfer {
                        sender,
                        receiver,
                        amount,
                        note,
                    } => {
                        register(sender, &mut accounts);
                        register(receiver, &mut accounts);
                        engine.transfer(sender, receiver, amount, note)
                    }
                };

                if let Err(_e) = outcome {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping rejected operation: {}", _e);
                }
            }
            Err(_e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", _e);
                continue;
            }
        }
    }

    Ok(Replay { engine, accounts })
}

/// Output row: one account and its derived balance.
#[derive(Debug, Serialize)]
struct BalanceRow {
    account: u64,
    balance: Decimal,
}

/// Writes every seen account's balance to a CSV writer.
///
/// # CSV Format
///
/// Columns: `account, balance`, rounded to the ledger's two decimal
/// places, ordered by account id.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_balances<W: Write>(replay: &Replay, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for &account in &replay.accounts {
        let balance = replay
            .engine
            .balance(account)
            .unwrap_or(Decimal::ZERO)
            .round_dp(LedgerEntry::SCALE);
        wtr.serialize(BalanceRow {
            account: account.0,
            balance,
        })?;
    }

    wtr.flush()?;
    Ok(())
}
