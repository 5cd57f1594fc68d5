#![deny(missing_docs)]

//! # DynamoDB Service
//!
//! Typed data access over one DynamoDB table keyed by `PK` and `SK`.
//!
//! ## Overview
//!
//! A [`Service`] owns a [`backend::Backend`], a [`codec::Codec`] and a table name, and
//! exposes:
//! - single-item reads and writes, each write with an `_out` form returning an image
//! - batch reads of up to 500 keys and atomic batch writes of up to 25 items
//! - heterogeneous atomic write groups ([`write::transact::Transact`])
//! - partition queries that gather pages up to a soft cap, or only count matches
//!
//! Conditions, filters, projections and updates are structured values compiled by
//! [`common::expression::ExpressionBuilder`]; placeholders are generated, never written
//! by hand. Backend failures are translated into [`Error`].
//!
//! ## Quick Example
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_service::{
//!     Service,
//!     common::{condition, key::PrimaryKey, update::UpdateExpressionMap},
//!     read::common::GetOptions,
//!     write::common::{PutOptions, UpdateOptions},
//! };
//! use serde::{Deserialize, Serialize};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Default, Deserialize, Serialize)]
//! #[serde(default)]
//! struct Record {
//!     #[serde(rename = "PK")]
//!     pk: String,
//!     #[serde(rename = "SK")]
//!     sk: String,
//!     #[serde(rename = "TestV")]
//!     value: String,
//! }
//!
//! # async fn example(client: Client) -> Result<(), dynamodb_service::Error> {
//! let service = Service::new(client, "test");
//! let token = CancellationToken::new();
//! let key = PrimaryKey::new("Test#id1", "Test");
//! let record = Record {
//!     pk: "Test#id1".to_string(),
//!     sk: "Test".to_string(),
//!     value: "v1".to_string(),
//! };
//! service.put_if_not_exist(&token, &record, PutOptions::default()).await?;
//! let updated: Record = service
//!     .update_out(
//!         &token,
//!         &key,
//!         UpdateExpressionMap::set("TestV", "v2"),
//!         UpdateOptions::default().condition(condition::item_exists()),
//!     )
//!     .await?;
//! let stored: Record = service.get(&token, &key, GetOptions::default()).await?;
//! assert_eq!(stored.value, updated.value);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Keys, clauses, the expression builder and the base record shape
//! - [`mod@read`] - Get, GetBatch and Query
//! - [`mod@write`] - Put, Update, Delete, their batch forms and Transact
//!
//! ## Features
//!
//! - `tracing` - spans around every operation and per-page events during pagination

/// Storage seam and its implementation for the SDK client.
pub mod backend;

/// Record codec.
pub mod codec;

/// Keys, clauses, and the expression builder.
pub mod common;

/// Error taxonomy.
pub mod error;

/// Read operations.
pub mod read;

/// The service facade.
pub mod service;

/// Write operations.
pub mod write;

pub use error::{Error, Result};
pub use service::Service;
