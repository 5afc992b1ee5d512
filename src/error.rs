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

//! Error types for ledger operations.

use crate::base::{AccountId, EntryId};
use thiserror::Error;

/// Ledger operation errors.
///
/// Validation errors (`InvalidAmount`, `InvalidKind`, `SelfTransfer`,
/// `InvalidTransferAmount`, `AccountNotFound`) are detected before any
/// entry is written and have no side effect. `InsufficientFunds` raised at
/// settlement time leaves an auditable `Failed` entry in the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Single-party entry requested with the transfer kind
    #[error("transfers must use the transfer operation")]
    InvalidKind,

    /// Referenced account does not exist in the directory
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    /// Referenced ledger entry does not exist
    #[error("ledger entry {0} not found")]
    EntryNotFound(EntryId),

    /// Debit or transfer would exceed the derived balance
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Transfer where sender and receiver are the same account
    #[error("cannot transfer to the same account")]
    SelfTransfer,

    /// Transfer amount is zero or negative
    #[error("transfer amount must be positive")]
    InvalidTransferAmount,

    /// Settlement attempted on an entry already in a terminal status
    #[error("entry already settled")]
    AlreadySettled,

    /// Storage layer failure
    #[error("storage failure: {0}")]
    Storage(String),
}
