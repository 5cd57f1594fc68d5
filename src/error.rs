//! Error taxonomy for service operations.
//!
//! Every public operation returns [`Result`]. Local validation failures are raised before
//! any request leaves the process; backend failures are translated exactly once, at the
//! [`From<aws_sdk_dynamodb::Error>`] boundary, into either a domain kind or a verbatim
//! [`Error::Backend`] passthrough.

use aws_sdk_dynamodb::{error, types};
use thiserror::Error;

/// Reason code reported per member when a transact write group is cancelled by a
/// failed precondition.
const CONDITIONAL_CHECK_FAILED_CODE: &str = "ConditionalCheckFailed";

/// Errors returned by [`Service`](crate::service::Service) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied size or shape violates a hard limit.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A single-item read found no matching item.
    #[error("item not found")]
    ItemNotFound,

    /// A precondition attached to a write was not satisfied at commit time.
    #[error("conditional check failed")]
    ConditionalCheckFailed,

    /// A batch read reported unprocessed keys; the whole batch must be retried.
    #[error("batch get returned unprocessed keys")]
    BatchIncomplete,

    /// The compiled clause set was rejected by the expression grammar.
    #[error("invalid expression: {0}")]
    Expression(String),

    /// The return-value policy conflicts with the entry point it was passed to.
    #[error("invalid return value policy: {0}")]
    ReturnValuePolicy(String),

    /// A record could not be converted to or from an attribute map.
    #[error(transparent)]
    Codec(#[from] serde_dynamo::Error),

    /// A request could not be assembled from its parts.
    #[error(transparent)]
    Build(#[from] error::BuildError),

    /// The caller's cancellation token fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Any other backend failure, passed through unchanged.
    #[error(transparent)]
    Backend(aws_sdk_dynamodb::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Returns `true` for the domain kinds raised before any network dispatch.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::Expression(_) | Self::ReturnValuePolicy(_)
        )
    }
}

fn is_conditional_check_failed(error: &aws_sdk_dynamodb::Error) -> bool {
    match error {
        aws_sdk_dynamodb::Error::ConditionalCheckFailedException(_) => true,
        aws_sdk_dynamodb::Error::TransactionCanceledException(cancelled) => cancelled
            .cancellation_reasons()
            .iter()
            .any(is_conditional_check_reason),
        _ => false,
    }
}

fn is_conditional_check_reason(reason: &types::CancellationReason) -> bool {
    reason.code() == Some(CONDITIONAL_CHECK_FAILED_CODE)
}

impl From<aws_sdk_dynamodb::Error> for Error {
    fn from(error: aws_sdk_dynamodb::Error) -> Self {
        if is_conditional_check_failed(&error) {
            Self::ConditionalCheckFailed
        } else {
            Self::Backend(error)
        }
    }
}
