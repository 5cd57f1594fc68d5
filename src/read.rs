//! Read operations.
//!
//! - [`Service::get`](crate::Service::get) reads one item by primary key
//! - [`Service::get_batch`](crate::Service::get_batch) reads up to 500 items by primary key
//! - [`Service::query`](crate::Service::query) reads a partition page by page

/// Batch read by primary keys.
pub mod batch_get_item;

/// Read options and the pagination accumulator.
pub mod common;

/// Single-item read.
pub mod get_item;

/// Partition queries.
pub mod query;
