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

//! Query types for listing ledger entries.
//!
//! Filtering, pagination, and sorting are read-only projections over the
//! store; they carry no ledger invariant beyond correct filtering.

use crate::base::AccountId;
use crate::entry::{EntryKind, EntryStatus, LedgerEntry};
use chrono::{DateTime, Utc};

/// Conjunctive filter over ledger entries. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Match entries owned by this account.
    pub owner: Option<AccountId>,
    pub kind: Option<EntryKind>,
    pub status: Option<EntryStatus>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if self.owner.is_some_and(|owner| entry.owner != owner) {
            return false;
        }
        if self.kind.is_some_and(|kind| entry.kind != kind) {
            return false;
        }
        if self.status.is_some_and(|status| entry.status != status) {
            return false;
        }
        if self.from.is_some_and(|from| entry.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| entry.created_at > to) {
            return false;
        }
        true
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub number: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(number: usize, size: usize) -> Self {
        Self { number, size }
    }
}

impl Default for PageRequest {
    /// First page of 50 entries.
    fn default() -> Self {
        Self { number: 0, size: 50 }
    }
}

/// Field a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Amount,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort specification. Ties are broken by entry id so listing order is
/// deterministic even when timestamps collide.
#[derive(Debug, Clone, Copy)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    pub fn by(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Sorts a materialized result set in place.
    pub fn apply(&self, entries: &mut [LedgerEntry]) {
        entries.sort_by(|a, b| {
            let ordering = match self.field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Amount => a.amount.cmp(&b.amount),
                SortField::Id => a.id.cmp(&b.id),
            };
            let ordering = ordering.then(a.id.cmp(&b.id));
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
}

impl Default for Sort {
    /// Oldest first.
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            order: SortOrder::Asc,
        }
    }
}

/// One page of a listing, with the total match count before paging.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub size: usize,
    /// Total entries matching the filter, across all pages.
    pub total: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(self.size)
    }
}
