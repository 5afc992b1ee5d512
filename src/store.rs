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

//! Ledger entry storage.
//!
//! [`LedgerStore`] is the persistence seam of the engine: every durable
//! read and write of ledger entries goes through it, and every method
//! returns `Result` so storage failures surface as
//! [`LedgerError::Storage`]. [`MemoryStore`] is the in-process
//! implementation backed by [`DashMap`].
//!
//! The store enforces the append-only rule for settled entries: once an
//! entry reaches a terminal status, a further settlement write is rejected
//! with [`LedgerError::AlreadySettled`].

use crate::base::{AccountId, EntryId};
use crate::entry::{EntryKind, EntryStatus, LedgerEntry, NewEntry};
use crate::error::LedgerError;
use crate::query::{EntryFilter, Page, PageRequest, Sort};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Durable, queryable collection of ledger entries.
///
/// Implementations must be safe for concurrent use; the engine serializes
/// check-then-settle sequences per account but reads may happen from any
/// thread at any time.
pub trait LedgerStore: Send + Sync {
    /// Persists a new entry in `Pending` status, assigning its id and
    /// creation timestamp. Returns the stored entry.
    fn append(&self, entry: NewEntry) -> Result<LedgerEntry, LedgerError>;

    /// Moves an entry out of `Pending` into the given terminal status,
    /// stamping `settled_at`. Returns the settled entry.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EntryNotFound`] if the id is unknown.
    /// - [`LedgerError::AlreadySettled`] if the entry is already terminal.
    fn settle(&self, id: EntryId, status: EntryStatus) -> Result<LedgerEntry, LedgerError>;

    /// Looks up a single entry by id.
    fn entry(&self, id: EntryId) -> Result<Option<LedgerEntry>, LedgerError>;

    /// All `Completed` entries owned by the account, in insertion order.
    fn completed_by_owner(&self, owner: AccountId) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// All `Completed` transfer entries where the account is the
    /// counterparty (receiver side), in insertion order.
    fn completed_transfers_to(
        &self,
        counterparty: AccountId,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Filtered, sorted, paginated listing.
    fn list(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
        sort: Sort,
    ) -> Result<Page<LedgerEntry>, LedgerError>;

    /// Total number of entries, regardless of status.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory, thread-safe ledger store.
///
/// Entries live in a [`DashMap`] keyed by id; ids are allocated from an
/// [`AtomicU64`], so id order doubles as insertion order and no separate
/// sequence structure is needed.
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<EntryId, LedgerEntry>,
    next_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Snapshot of matching entries, sorted by id.
    fn collect(&self, filter: &EntryFilter) -> Vec<LedgerEntry> {
        let mut matched: Vec<LedgerEntry> = self
            .entries
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matched.sort_by_key(|entry| entry.id);
        matched
    }
}

impl LedgerStore for MemoryStore {
    fn append(&self, entry: NewEntry) -> Result<LedgerEntry, LedgerError> {
        debug_assert_eq!(
            entry.counterparty.is_some(),
            entry.kind == EntryKind::Transfer,
            "counterparty must be set iff the entry is a transfer"
        );

        let id = EntryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let stored = LedgerEntry {
            id,
            owner: entry.owner,
            counterparty: entry.counterparty,
            amount: entry.amount,
            kind: entry.kind,
            status: EntryStatus::Pending,
            note: entry.note,
            created_at: Utc::now(),
            settled_at: None,
        };
        self.entries.insert(id, stored.clone());
        Ok(stored)
    }

    fn settle(&self, id: EntryId, status: EntryStatus) -> Result<LedgerEntry, LedgerError> {
        debug_assert!(status.is_terminal(), "settlement target must be terminal");

        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(LedgerError::EntryNotFound(id))?;
        if entry.status.is_terminal() {
            return Err(LedgerError::AlreadySettled);
        }
        entry.status = status;
        entry.settled_at = Some(Utc::now());
        Ok(entry.clone())
    }

    fn entry(&self, id: EntryId) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.entries.get(&id).map(|entry| entry.clone()))
    }

    fn completed_by_owner(&self, owner: AccountId) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.collect(&EntryFilter {
            owner: Some(owner),
            status: Some(EntryStatus::Completed),
            ..EntryFilter::default()
        }))
    }

    fn completed_transfers_to(
        &self,
        counterparty: AccountId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut matched: Vec<LedgerEntry> = self
            .entries
            .iter()
            .filter(|entry| {
                entry.kind == EntryKind::Transfer
                    && entry.status == EntryStatus::Completed
                    && entry.counterparty == Some(counterparty)
            })
            .map(|entry| entry.value().clone())
            .collect();
        matched.sort_by_key(|entry| entry.id);
        Ok(matched)
    }

    fn list(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
        sort: Sort,
    ) -> Result<Page<LedgerEntry>, LedgerError> {
        let mut matched = self.collect(filter);
        sort.apply(&mut matched);

        let total = matched.len();
        let items = if page.size == 0 {
            Vec::new()
        } else {
            matched
                .into_iter()
                .skip(page.number.saturating_mul(page.size))
                .take(page.size)
                .collect()
        };

        Ok(Page {
            items,
            number: page.number,
            size: page.size,
            total,
        })
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SortField, SortOrder};
    use rust_decimal_macros::dec;

    fn credit(owner: u64, amount: rust_decimal::Decimal) -> NewEntry {
        NewEntry {
            owner: AccountId(owner),
            counterparty: None,
            amount,
            kind: EntryKind::Credit,
            note: None,
        }
    }

    fn transfer(owner: u64, counterparty: u64, amount: rust_decimal::Decimal) -> NewEntry {
        NewEntry {
            owner: AccountId(owner),
            counterparty: Some(AccountId(counterparty)),
            amount,
            kind: EntryKind::Transfer,
            note: None,
        }
    }

    #[test]
    fn append_assigns_monotonic_ids_and_pending_status() {
        let store = MemoryStore::new();
        let first = store.append(credit(1, dec!(10.00))).unwrap();
        let second = store.append(credit(1, dec!(20.00))).unwrap();

        assert!(first.id < second.id);
        assert_eq!(first.status, EntryStatus::Pending);
        assert!(first.settled_at.is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn settle_stamps_settled_at_exactly_once() {
        let store = MemoryStore::new();
        let entry = store.append(credit(1, dec!(10.00))).unwrap();

        let settled = store.settle(entry.id, EntryStatus::Completed).unwrap();
        assert_eq!(settled.status, EntryStatus::Completed);
        assert!(settled.settled_at.is_some());

        // Terminal entries are append-only.
        let again = store.settle(entry.id, EntryStatus::Failed);
        assert_eq!(again, Err(LedgerError::AlreadySettled));

        let stored = store.entry(entry.id).unwrap().unwrap();
        assert_eq!(stored.status, EntryStatus::Completed);
    }

    #[test]
    fn settle_unknown_entry_returns_not_found() {
        let store = MemoryStore::new();
        let result = store.settle(EntryId(99), EntryStatus::Completed);
        assert_eq!(result, Err(LedgerError::EntryNotFound(EntryId(99))));
    }

    #[test]
    fn completed_by_owner_ignores_pending_and_other_owners() {
        let store = MemoryStore::new();
        let completed = store.append(credit(1, dec!(10.00))).unwrap();
        store.settle(completed.id, EntryStatus::Completed).unwrap();
        store.append(credit(1, dec!(20.00))).unwrap(); // stays pending
        let other = store.append(credit(2, dec!(30.00))).unwrap();
        store.settle(other.id, EntryStatus::Completed).unwrap();

        let entries = store.completed_by_owner(AccountId(1)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, completed.id);
    }

    #[test]
    fn completed_transfers_to_matches_counterparty_only() {
        let store = MemoryStore::new();
        let incoming = store.append(transfer(1, 2, dec!(10.00))).unwrap();
        store.settle(incoming.id, EntryStatus::Completed).unwrap();
        let failed = store.append(transfer(3, 2, dec!(15.00))).unwrap();
        store.settle(failed.id, EntryStatus::Failed).unwrap();
        let elsewhere = store.append(transfer(2, 3, dec!(20.00))).unwrap();
        store.settle(elsewhere.id, EntryStatus::Completed).unwrap();

        let entries = store.completed_transfers_to(AccountId(2)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, incoming.id);
    }

    #[test]
    fn list_paginates_and_reports_total() {
        let store = MemoryStore::new();
        for i in 1..=5u32 {
            let entry = store
                .append(credit(1, rust_decimal::Decimal::from(i)))
                .unwrap();
            store.settle(entry.id, EntryStatus::Completed).unwrap();
        }

        let page = store
            .list(
                &EntryFilter::default(),
                PageRequest::new(1, 2),
                Sort::by(SortField::Id, SortOrder::Asc),
            )
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, EntryId(3));
        assert_eq!(page.items[1].id, EntryId(4));
    }

    #[test]
    fn list_sorts_by_amount_descending() {
        let store = MemoryStore::new();
        store.append(credit(1, dec!(5.00))).unwrap();
        store.append(credit(1, dec!(50.00))).unwrap();
        store.append(credit(1, dec!(0.50))).unwrap();

        let page = store
            .list(
                &EntryFilter::default(),
                PageRequest::default(),
                Sort::by(SortField::Amount, SortOrder::Desc),
            )
            .unwrap();
        let amounts: Vec<_> = page.items.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![dec!(50.00), dec!(5.00), dec!(0.50)]);
    }

    #[test]
    fn list_with_zero_page_size_returns_total_only() {
        let store = MemoryStore::new();
        store.append(credit(1, dec!(1.00))).unwrap();

        let page = store
            .list(&EntryFilter::default(), PageRequest::new(0, 0), Sort::default())
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
    }
}
