use crate::backend::Backend;
use crate::codec::Codec;
use crate::common::{self, condition};
use crate::error::{Error, Result};
use crate::read;
use crate::service::Service;

use aws_sdk_dynamodb::{operation, types};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Result of a query: decoded items, or only their number in count mode.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutput<T> {
    /// Matching items, in the requested order.
    Items(Vec<T>),
    /// Number of matching items.
    Count(i64),
}

impl<T> QueryOutput<T> {
    /// Number of matches.
    pub fn count(&self) -> i64 {
        match self {
            Self::Items(items) => i64::try_from(items.len()).unwrap_or(i64::MAX),
            Self::Count(count) => *count,
        }
    }

    /// The decoded items; empty in count mode.
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Items(items) => items,
            Self::Count(_) => Vec::new(),
        }
    }
}

fn query_input(
    table_name: &str,
    key_conditions: condition::KeyConditions,
    options: read::common::QueryOptions,
) -> Result<operation::query::QueryInput> {
    if key_conditions.is_empty() {
        return Err(Error::InvalidInput(
            "query needs a key condition".to_string(),
        ));
    }
    let (select, scan_index_forward, builder) = match options.select {
        read::common::SelectMode::Asc => (None, Some(true), options.builder),
        read::common::SelectMode::Desc => (None, Some(false), options.builder),
        read::common::SelectMode::Count => (
            Some(types::Select::Count),
            None,
            options.builder.without_projection(),
        ),
    };
    let expression = builder.with_key_conditions(key_conditions).build()?;
    let input = operation::query::QueryInput::builder()
        .table_name(table_name)
        .set_index_name(options.index_name)
        .set_select(select)
        .set_limit(options.page_size)
        .set_consistent_read(options.consistent_read)
        .set_scan_index_forward(scan_index_forward)
        .set_key_condition_expression(expression.key_condition)
        .set_filter_expression(expression.filter)
        .set_projection_expression(expression.projection)
        .set_expression_attribute_names(expression.names)
        .set_expression_attribute_values(expression.values)
        .build()?;
    Ok(input)
}

impl<B: Backend, C: Codec> Service<B, C> {
    /// Query one partition of the table or of a secondary index.
    ///
    /// Pages are read one after another until the partition is exhausted or more than
    /// [`common::MAX_READ_NUM`] items have been gathered; the page that crosses the cap
    /// is kept. In [`SelectMode::Count`](read::common::SelectMode::Count) every page is
    /// read and only the total is returned.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_service.query",
            skip(self, token, key_conditions, options),
            fields(select = ?options.select),
            err
        )
    )]
    pub async fn query<T: DeserializeOwned>(
        &self,
        token: &CancellationToken,
        key_conditions: condition::KeyConditions,
        options: read::common::QueryOptions,
    ) -> Result<QueryOutput<T>> {
        let count_only = options.select == read::common::SelectMode::Count;
        let mut input = query_input(self.table_name(), key_conditions, options)?;
        let max_items = if count_only {
            usize::MAX
        } else {
            common::MAX_READ_NUM
        };
        let mut reader = read::common::PaginatedReader::new(max_items);
        loop {
            let output = self
                .dispatch(token, self.backend().query(input.clone()))
                .await?;
            let flow = reader.push(output.items.unwrap_or_default(), output.count);
            #[cfg(feature = "tracing")]
            tracing::debug!(page = reader.pages(), count = output.count, "query page");
            match output.last_evaluated_key {
                Some(last_evaluated_key)
                    if !last_evaluated_key.is_empty() && flow.is_continue() =>
                {
                    input.exclusive_start_key = Some(last_evaluated_key);
                }
                _ => break,
            }
        }
        if count_only {
            return Ok(QueryOutput::Count(reader.count()));
        }
        let items = self.codec().decode_list(reader.into_items())?;
        Ok(QueryOutput::Items(items))
    }

    /// Number of items matching `key_conditions` and the options' filter.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_service.query_count",
            skip(self, token, key_conditions, options),
            err
        )
    )]
    pub async fn query_count(
        &self,
        token: &CancellationToken,
        key_conditions: condition::KeyConditions,
        options: read::common::QueryOptions,
    ) -> Result<i64> {
        let options = options.select(read::common::SelectMode::Count);
        let output = self
            .query::<serde::de::IgnoredAny>(token, key_conditions, options)
            .await?;
        Ok(output.count())
    }
}
