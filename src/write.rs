//! Write operations.
//!
//! Single-item writes come in a plain form and an `_out` form that decodes the
//! returned image. Batch writes and [`transact::Transact`] commit as one atomic group
//! of at most 25 members.

/// Write options and return-value policy.
pub mod common;

/// Single and batch delete.
pub mod delete_item;

/// Single and batch put.
pub mod put_item;

/// Atomic write groups.
pub mod transact;

/// Single and batch update.
pub mod update_item;
