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

//! Balance derivation.
//!
//! A balance is never stored; it is recomputed on demand from the full
//! `Completed` history. The ledger is the single source of truth and the
//! balance is a view over it.
//!
//! A transfer is a single row owned by the sender, so an account's balance
//! has two contributions with different query paths: entries it owns, and
//! completed transfers where it is the counterparty. Both are folded here,
//! in one place, so no caller can take one side and forget the other.

use crate::base::AccountId;
use crate::entry::EntryKind;
use crate::error::LedgerError;
use crate::store::LedgerStore;
use rust_decimal::Decimal;

/// Derives the current balance of an account from its `Completed` entries.
///
/// Owner-side contributions: `Credit` adds, `Debit` subtracts, `Transfer`
/// (account is the sender) subtracts. Receiver-side: every completed
/// transfer naming the account as counterparty adds. An account with no
/// entries has balance zero.
///
/// `Pending` and `Failed` entries never contribute, including entries that
/// are in flight on another thread at the time of the query.
pub fn balance_of(store: &dyn LedgerStore, account: AccountId) -> Result<Decimal, LedgerError> {
    let mut balance = Decimal::ZERO;

    for entry in store.completed_by_owner(account)? {
        match entry.kind {
            EntryKind::Credit => balance += entry.amount,
            EntryKind::Debit | EntryKind::Transfer => balance -= entry.amount,
        }
    }

    for entry in store.completed_transfers_to(account)? {
        balance += entry.amount;
    }

    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryStatus, NewEntry};
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn settled(
        store: &MemoryStore,
        owner: u64,
        counterparty: Option<u64>,
        amount: Decimal,
        kind: EntryKind,
        status: EntryStatus,
    ) {
        let entry = store
            .append(NewEntry {
                owner: AccountId(owner),
                counterparty: counterparty.map(AccountId),
                amount,
                kind,
                note: None,
            })
            .unwrap();
        if status.is_terminal() {
            store.settle(entry.id, status).unwrap();
        }
    }

    #[test]
    fn empty_account_has_zero_balance() {
        let store = MemoryStore::new();
        assert_eq!(balance_of(&store, AccountId(1)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn credits_add_and_debits_subtract() {
        let store = MemoryStore::new();
        settled(&store, 1, None, dec!(500.00), EntryKind::Credit, EntryStatus::Completed);
        settled(&store, 1, None, dec!(200.00), EntryKind::Debit, EntryStatus::Completed);

        assert_eq!(balance_of(&store, AccountId(1)).unwrap(), dec!(300.00));
    }

    #[test]
    fn pending_and_failed_entries_are_invisible() {
        let store = MemoryStore::new();
        settled(&store, 1, None, dec!(100.00), EntryKind::Credit, EntryStatus::Completed);
        settled(&store, 1, None, dec!(40.00), EntryKind::Debit, EntryStatus::Failed);
        settled(&store, 1, None, dec!(25.00), EntryKind::Credit, EntryStatus::Pending);

        assert_eq!(balance_of(&store, AccountId(1)).unwrap(), dec!(100.00));
    }

    #[test]
    fn transfer_subtracts_from_sender_and_adds_to_receiver() {
        let store = MemoryStore::new();
        settled(&store, 1, None, dec!(1000.00), EntryKind::Credit, EntryStatus::Completed);
        settled(&store, 1, Some(2), dec!(400.00), EntryKind::Transfer, EntryStatus::Completed);

        assert_eq!(balance_of(&store, AccountId(1)).unwrap(), dec!(600.00));
        assert_eq!(balance_of(&store, AccountId(2)).unwrap(), dec!(400.00));
    }

    #[test]
    fn failed_transfer_affects_neither_side() {
        let store = MemoryStore::new();
        settled(&store, 1, None, dec!(100.00), EntryKind::Credit, EntryStatus::Completed);
        settled(&store, 1, Some(2), dec!(80.00), EntryKind::Transfer, EntryStatus::Failed);

        assert_eq!(balance_of(&store, AccountId(1)).unwrap(), dec!(100.00));
        assert_eq!(balance_of(&store, AccountId(2)).unwrap(), Decimal::ZERO);
    }
}
