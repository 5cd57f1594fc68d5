//! The [`Service`] facade.
//!
//! Operation entry points live next to the operation they implement, in
//! [`mod@crate::read`] and [`mod@crate::write`].

use crate::backend::Backend;
use crate::codec::{Codec, DynamoCodec};
use crate::error::{Error, Result};

use aws_sdk_dynamodb::Client;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Typed access to one table keyed by `PK` and `SK`.
///
/// The handle is never mutated after construction and can be shared between tasks.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_service::{Service, common::key::PrimaryKey, read::common::GetOptions};
/// use serde_json::Value;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(client: Client) -> Result<(), dynamodb_service::Error> {
/// let service = Service::new(client, "users");
/// let token = CancellationToken::new();
/// let record: Value = service
///     .get(&token, &PrimaryKey::new("User#1", "Profile"), GetOptions::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Service<B = Client, C = DynamoCodec> {
    backend: B,
    codec: C,
    table_name: String,
}

impl<B: Backend> Service<B> {
    /// A service over `table_name` using the default codec.
    pub fn new(backend: B, table_name: impl Into<String>) -> Self {
        Self::with_codec(backend, DynamoCodec, table_name)
    }
}

impl<B: Backend, C: Codec> Service<B, C> {
    /// A service over `table_name` using `codec` for records.
    pub fn with_codec(backend: B, codec: C, table_name: impl Into<String>) -> Self {
        Self {
            backend,
            codec,
            table_name: table_name.into(),
        }
    }

    /// The table every operation targets.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The backend handle.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The record codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Run one backend call unless `token` fires first.
    pub(crate) async fn dispatch<F, T>(&self, token: &CancellationToken, call: F) -> Result<T>
    where
        F: Future<Output = Result<T, aws_sdk_dynamodb::Error>>,
    {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            output = call => output.map_err(Error::from),
        }
    }
}
