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

//! Ledger entry types.
//!
//! Entries follow a state machine:
//! - [`Pending`] → [`Completed`] (solvency check passes at settlement)
//! - [`Pending`] → [`Failed`] (solvency check fails, or settlement errors)
//!
//! Both `Completed` and `Failed` are terminal; a settled entry is never
//! mutated again.
//!
//! [`Pending`]: EntryStatus::Pending
//! [`Completed`]: EntryStatus::Completed
//! [`Failed`]: EntryStatus::Failed

use crate::base::{AccountId, EntryId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The kind of monetary movement an entry records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryKind {
    /// Funds added to the owning account.
    Credit,
    /// Funds removed from the owning account.
    Debit,
    /// Funds moved from the owning account to the counterparty.
    Transfer,
}

/// Lifecycle status of a ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryStatus {
    /// Created but not yet settled. Transient: settlement runs
    /// synchronously with creation, so callers never observe it.
    Pending,
    /// Settled successfully. Contributes to derived balances.
    Completed,
    /// Settlement rejected or errored. Kept as an audit record; never
    /// contributes to a balance.
    Failed,
}

impl EntryStatus {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Failed)
    }
}

/// A single monetary movement, immutable once settled.
///
/// For `Transfer` entries the owner is the sender and `counterparty` the
/// receiver; the receiver's gain is derived by the balance calculator, not
/// recorded as a second row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: EntryId,
    /// The account whose ledger this entry primarily belongs to.
    pub owner: AccountId,
    /// Receiving account; `Some` if and only if `kind == Transfer`.
    pub counterparty: Option<AccountId>,
    /// Positive, normalized to [`LedgerEntry::SCALE`] decimal places.
    pub amount: Decimal,
    pub kind: EntryKind,
    pub status: EntryStatus,
    /// Free text, no semantic effect.
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Stamped exactly once, when the entry leaves `Pending`.
    pub settled_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// Fixed fractional scale for monetary amounts.
    pub const SCALE: u32 = 2;

    /// Normalizes an amount to the ledger's fixed scale.
    ///
    /// Uses `Decimal`'s default banker's rounding. An amount that rounds
    /// to zero is invalid and rejected by the engine's validation.
    pub fn normalize(amount: Decimal) -> Decimal {
        amount.round_dp(Self::SCALE)
    }
}

/// A not-yet-persisted entry, handed to the store for id assignment.
///
/// The store stamps `id` and `created_at` and records the entry in
/// `Pending` status.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub owner: AccountId,
    pub counterparty: Option<AccountId>,
    pub amount: Decimal,
    pub kind: EntryKind,
    pub note: Option<String>,
}
