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

//! # Ledger Engine
//!
//! This library provides an account ledger: it records monetary movements
//! (credits, debits, and account-to-account transfers) and derives every
//! balance from the history of completed movements. No mutable balance
//! field exists anywhere; the ledger is the single source of truth.
//!
//! ## Core Components
//!
//! - [`Engine`]: Creates, validates, and settles ledger entries
//! - [`LedgerStore`] / [`MemoryStore`]: Durable, queryable entry storage
//! - [`balance_of`]: Derives an account balance from completed history
//! - [`AccountDirectory`]: External collaborator supplying account identity
//! - [`LedgerError`]: Typed errors for every failure mode
//!
//! ## Example
//!
//! ```
//! use ledger_engine_rs::{Engine, EntryKind, EntryStatus, InMemoryDirectory};
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let directory = Arc::new(InMemoryDirectory::new());
//! let alice = directory.register("alice", "Alice");
//! let bob = directory.register("bob", "Bob");
//! let engine = Engine::new(directory);
//!
//! // Credit Alice, then move part of it to Bob.
//! let credit = engine
//!     .create_entry(alice.id, dec!(100.00), EntryKind::Credit, None)
//!     .unwrap();
//! assert_eq!(credit.status, EntryStatus::Completed);
//!
//! engine.transfer(alice.id, bob.id, dec!(40.00), None).unwrap();
//!
//! assert_eq!(engine.balance(alice.id).unwrap(), dec!(60.00));
//! assert_eq!(engine.balance(bob.id).unwrap(), dec!(40.00));
//! ```
//!
//! ## Thread Safety
//!
//! The engine serializes the solvency-check-then-settle critical section
//! per account, so concurrent operations on the same account can never
//! jointly overdraw it, while operations on different accounts proceed in
//! parallel.

pub mod balance;
mod base;
pub mod directory;
mod engine;
pub mod entry;
pub mod error;
pub mod query;
pub mod store;

pub use balance::balance_of;
pub use base::{AccountId, EntryId};
pub use directory::{Account, AccountDirectory, InMemoryDirectory};
pub use engine::{Engine, SettlementOutcome};
pub use entry::{EntryKind, EntryStatus, LedgerEntry, NewEntry};
pub use error::LedgerError;
pub use query::{EntryFilter, Page, PageRequest, Sort, SortField, SortOrder};
pub use store::{LedgerStore, MemoryStore};
