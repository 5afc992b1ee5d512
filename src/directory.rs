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

//! Account directory.
//!
//! The directory is an external collaborator: it answers existence and
//! identity questions about accounts and owns no financial state. Profile
//! fields are irrelevant to ledger correctness and never consulted by the
//! engine beyond existence checks.

use crate::base::AccountId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// An account identity as known to the directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub display_name: String,
}

/// Source of account existence and identity.
pub trait AccountDirectory: Send + Sync {
    fn get(&self, id: AccountId) -> Option<Account>;

    fn contains(&self, id: AccountId) -> bool {
        self.get(id).is_some()
    }
}

/// Thread-safe in-memory directory, used by tests and the CLI.
#[derive(Debug)]
pub struct InMemoryDirectory {
    accounts: DashMap<AccountId, Account>,
    next_id: AtomicU64,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new account under a freshly allocated id.
    pub fn register(&self, username: &str, display_name: &str) -> Account {
        let id = AccountId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let account = Account {
            id,
            username: username.to_owned(),
            display_name: display_name.to_owned(),
        };
        self.accounts.insert(id, account.clone());
        account
    }

    /// Inserts an account with a caller-chosen id, replacing any existing
    /// entry. Used when replaying external data that already carries ids.
    pub fn put(&self, account: Account) {
        self.accounts.insert(account.id, account);
    }
}

impl AccountDirectory for InMemoryDirectory {
    fn get(&self, id: AccountId) -> Option<Account> {
        self.accounts.get(&id).map(|account| account.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_allocates_distinct_ids() {
        let directory = InMemoryDirectory::new();
        let alice = directory.register("alice", "Alice");
        let bob = directory.register("bob", "Bob");

        assert_ne!(alice.id, bob.id);
        assert!(directory.contains(alice.id));
        assert_eq!(directory.get(bob.id).unwrap().username, "bob");
    }

    #[test]
    fn unknown_account_is_absent() {
        let directory = InMemoryDirectory::new();
        assert!(!directory.contains(AccountId(99)));
        assert!(directory.get(AccountId(99)).is_none());
    }

    #[test]
    fn put_uses_the_given_id() {
        let directory = InMemoryDirectory::new();
        directory.put(Account {
            id: AccountId(7),
            username: "acct-7".into(),
            display_name: "Account 7".into(),
        });
        assert!(directory.contains(AccountId(7)));
    }
}
