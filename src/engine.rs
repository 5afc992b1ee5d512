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

//! Transaction engine.
//!
//! The [`Engine`] creates, validates, and settles ledger entries. Every
//! entry is written in `Pending` status and settled synchronously in the
//! same call, ending `Completed` or `Failed`; no caller ever observes a
//! `Pending` entry as the outcome of an operation.
//!
//! # Concurrency
//!
//! The solvency check and the settlement write form a critical section:
//! two debits that are individually affordable but not jointly affordable
//! must not both pass. The engine serializes this section per account with
//! an arena of locks ([`DashMap`] from account id to a mutex, created on
//! first use, never removed), so operations on different accounts still
//! run in parallel. A transfer holds only the sender's lock; the receiver
//! side is append-only `Completed` data and needs no protection.

use crate::balance::balance_of;
use crate::base::{AccountId, EntryId};
use crate::directory::AccountDirectory;
use crate::entry::{EntryKind, EntryStatus, LedgerEntry, NewEntry};
use crate::error::LedgerError;
use crate::query::{EntryFilter, Page, PageRequest, Sort};
use crate::store::{LedgerStore, MemoryStore};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Outcome of the settlement step, modeled as a value rather than as
/// control flow across the status-write boundary.
///
/// A storage failure during settlement is *not* an outcome; it surfaces as
/// `Err(LedgerError::Storage)` from the settlement call.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// Solvency check passed; the entry is durably `Completed`.
    Completed(LedgerEntry),
    /// Solvency check failed; the entry is durably `Failed` and the
    /// reason is surfaced to the caller.
    Failed(LedgerError),
}

/// Ledger transaction engine.
///
/// # Invariants
///
/// - An entry's amount is positive and normalized to two decimal places.
/// - A transfer is exactly one row, owned by the sender.
/// - Terminal statuses are never revisited; the store rejects a second
///   settlement write.
/// - Balances are derived from `Completed` history only, never cached.
pub struct Engine {
    store: Arc<dyn LedgerStore>,
    directory: Arc<dyn AccountDirectory>,
    /// Per-account settlement locks, created on first use.
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl Engine {
    /// Creates an engine over an in-memory store.
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), directory)
    }

    /// Creates an engine over a caller-provided store.
    pub fn with_store(store: Arc<dyn LedgerStore>, directory: Arc<dyn AccountDirectory>) -> Self {
        Self {
            store,
            directory,
            locks: DashMap::new(),
        }
    }

    /// Records a single-party credit or debit and settles it.
    ///
    /// Debits are pre-checked against the derived balance before anything
    /// is written, and re-checked at settlement time under the account
    /// lock.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidKind`] - `Transfer` passed; use [`Engine::transfer`].
    /// - [`LedgerError::InvalidAmount`] - amount is zero or negative.
    /// - [`LedgerError::AccountNotFound`] - owner is unknown to the directory.
    /// - [`LedgerError::InsufficientFunds`] - debit exceeds the balance. At
    ///   the pre-check nothing is written; at settlement a `Failed` entry
    ///   remains as an audit record.
    /// - [`LedgerError::Storage`] - the store failed; a best-effort
    ///   `Failed` mark is attempted before the error propagates.
    pub fn create_entry(
        &self,
        owner: AccountId,
        amount: Decimal,
        kind: EntryKind,
        note: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        if kind == EntryKind::Transfer {
            return Err(LedgerError::InvalidKind);
        }
        let amount = LedgerEntry::normalize(amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if !self.directory.contains(owner) {
            return Err(LedgerError::AccountNotFound(owner));
        }

        let lock = self.account_lock(owner);
        let _guard = lock.lock();

        // Pre-check: an uncoverable debit writes nothing.
        if kind == EntryKind::Debit {
            let available = balance_of(self.store.as_ref(), owner)?;
            if available < amount {
                return Err(LedgerError::InsufficientFunds);
            }
        }

        let pending = self.store.append(NewEntry {
            owner,
            counterparty: None,
            amount,
            kind,
            note,
        })?;
        self.finish(pending)
    }

    /// Moves funds between two accounts as a single transfer entry.
    ///
    /// The entry is owned by the sender with the receiver as counterparty;
    /// the receiver's gain exists only through balance derivation.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SelfTransfer`] - sender and receiver are the same.
    /// - [`LedgerError::InvalidTransferAmount`] - amount is zero or negative.
    /// - [`LedgerError::AccountNotFound`] - either account is unknown.
    /// - [`LedgerError::InsufficientFunds`] - sender cannot cover the amount.
    /// - [`LedgerError::Storage`] - the store failed during settlement.
    pub fn transfer(
        &self,
        sender: AccountId,
        receiver: AccountId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        if sender == receiver {
            return Err(LedgerError::SelfTransfer);
        }
        let amount = LedgerEntry::normalize(amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidTransferAmount);
        }
        if !self.directory.contains(sender) {
            return Err(LedgerError::AccountNotFound(sender));
        }
        if !self.directory.contains(receiver) {
            return Err(LedgerError::AccountNotFound(receiver));
        }

        let lock = self.account_lock(sender);
        let _guard = lock.lock();

        let available = balance_of(self.store.as_ref(), sender)?;
        if available < amount {
            return Err(LedgerError::InsufficientFunds);
        }

        let pending = self.store.append(NewEntry {
            owner: sender,
            counterparty: Some(receiver),
            amount,
            kind: EntryKind::Transfer,
            note,
        })?;
        self.finish(pending)
    }

    /// Derived balance of an account over its `Completed` history.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - account is unknown.
    /// - [`LedgerError::Storage`] - the store failed.
    pub fn balance(&self, account: AccountId) -> Result<Decimal, LedgerError> {
        if !self.directory.contains(account) {
            return Err(LedgerError::AccountNotFound(account));
        }
        balance_of(self.store.as_ref(), account)
    }

    /// Filtered, sorted, paginated listing of ledger entries.
    pub fn list_entries(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
        sort: Sort,
    ) -> Result<Page<LedgerEntry>, LedgerError> {
        self.store.list(filter, page, sort)
    }

    /// Looks up a single entry by id.
    pub fn entry(&self, id: EntryId) -> Result<Option<LedgerEntry>, LedgerError> {
        self.store.entry(id)
    }

    fn account_lock(&self, account: AccountId) -> Arc<Mutex<()>> {
        self.locks.entry(account).or_default().clone()
    }

    /// Runs settlement and maps the outcome to the caller-facing result.
    ///
    /// Must be called with the owner's lock held.
    fn finish(&self, pending: LedgerEntry) -> Result<LedgerEntry, LedgerError> {
        match self.settle(&pending) {
            Ok(SettlementOutcome::Completed(entry)) => Ok(entry),
            Ok(SettlementOutcome::Failed(reason)) => Err(reason),
            Err(storage) => {
                // Best-effort terminal mark. If this write also fails the
                // entry's observable status is undefined and needs manual
                // reconciliation.
                let _ = self.store.settle(pending.id, EntryStatus::Failed);
                Err(storage)
            }
        }
    }

    /// Settlement step: re-derives the balance for fund-moving kinds and
    /// writes the terminal status.
    fn settle(&self, pending: &LedgerEntry) -> Result<SettlementOutcome, LedgerError> {
        if matches!(pending.kind, EntryKind::Debit | EntryKind::Transfer) {
            // The pending entry itself is invisible to the derivation, so
            // this re-check sees the same completed set the pre-check did,
            // plus anything settled since.
            let available = balance_of(self.store.as_ref(), pending.owner)?;
            if available < pending.amount {
                self.store.settle(pending.id, EntryStatus::Failed)?;
                return Ok(SettlementOutcome::Failed(LedgerError::InsufficientFunds));
            }
        }

        let completed = self.store.settle(pending.id, EntryStatus::Completed)?;
        Ok(SettlementOutcome::Completed(completed))
    }
}
