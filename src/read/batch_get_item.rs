use crate::backend::Backend;
use crate::codec::Codec;
use crate::common::{self, key};
use crate::error::{Error, Result};
use crate::read;
use crate::service::Service;

use aws_sdk_dynamodb::{operation::batch_get_item::BatchGetItemInput, types};
use serde::de::DeserializeOwned;
use std::collections;
use tokio_util::sync::CancellationToken;

/// Keys per backend request.
const MAX_KEYS_PER_REQUEST: usize = 100;

fn validate_keys(keys: &[key::PrimaryKey]) -> Result<()> {
    if keys.is_empty() || keys.len() > common::MAX_READ_NUM {
        return Err(Error::InvalidInput(format!(
            "batch get takes 1 to {} keys, got {}",
            common::MAX_READ_NUM,
            keys.len()
        )));
    }
    Ok(())
}

/// One request per chunk of at most [`MAX_KEYS_PER_REQUEST`] keys.
fn batch_get_item_inputs(
    table_name: &str,
    keys: &[key::PrimaryKey],
    options: read::common::GetOptions,
) -> Result<Vec<BatchGetItemInput>> {
    validate_keys(keys)?;
    let expression = options.builder.build()?;
    let mut inputs = Vec::with_capacity(keys.len().div_ceil(MAX_KEYS_PER_REQUEST));
    for chunk in keys.chunks(MAX_KEYS_PER_REQUEST) {
        let keys_and_attributes = types::KeysAndAttributes::builder()
            .set_keys(Some(chunk.iter().map(common::Item::from).collect()))
            .set_consistent_read(options.consistent_read)
            .set_projection_expression(expression.projection.clone())
            .set_expression_attribute_names(expression.names.clone())
            .build()?;
        let input = BatchGetItemInput::builder()
            .set_request_items(Some(collections::HashMap::from([(
                table_name.to_string(),
                keys_and_attributes,
            )])))
            .build()?;
        inputs.push(input);
    }
    Ok(inputs)
}

impl<B: Backend, C: Codec> Service<B, C> {
    /// Read the items stored under `keys`, in backend order.
    ///
    /// Missing keys are skipped. Fails with [`Error::BatchIncomplete`] as soon as the
    /// backend leaves any key unprocessed.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_service.get_batch",
            skip(self, token, keys, options),
            fields(keys = keys.len()),
            err
        )
    )]
    pub async fn get_batch<T: DeserializeOwned>(
        &self,
        token: &CancellationToken,
        keys: &[key::PrimaryKey],
        options: read::common::GetOptions,
    ) -> Result<Vec<T>> {
        let inputs = batch_get_item_inputs(self.table_name(), keys, options)?;
        let mut reader = read::common::PaginatedReader::new(common::MAX_READ_NUM);
        for input in inputs {
            let output = self
                .dispatch(token, self.backend().batch_get_item(input))
                .await?;
            let unprocessed = output
                .unprocessed_keys
                .as_ref()
                .is_some_and(|unprocessed| {
                    unprocessed
                        .values()
                        .any(|keys_and_attributes| !keys_and_attributes.keys().is_empty())
                });
            if unprocessed {
                return Err(Error::BatchIncomplete);
            }
            let items = output
                .responses
                .and_then(|mut responses| responses.remove(self.table_name()))
                .unwrap_or_default();
            let count = i32::try_from(items.len()).unwrap_or(i32::MAX);
            if reader.push(items, count).is_break() {
                break;
            }
        }
        self.codec().decode_list(reader.into_items())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::common::selection;
    use rstest::rstest;

    fn keys(size: usize) -> Vec<key::PrimaryKey> {
        (0..size)
            .map(|index| key::PrimaryKey::new(format!("Test#id{index}"), "Test"))
            .collect()
    }

    #[rstest]
    #[case::single(1, vec![1])]
    #[case::one_request(100, vec![100])]
    #[case::chunked(250, vec![100, 100, 50])]
    #[case::max(500, vec![100, 100, 100, 100, 100])]
    fn test_batch_get_item_inputs(#[case] size: usize, #[case] expected: Vec<usize>) {
        let options = read::common::GetOptions::default()
            .projection(selection::SelectionMap::attributes(["TestV"]))
            .consistent(true);
        let inputs = batch_get_item_inputs("a", &keys(size), options).unwrap();
        let actual: Vec<_> = inputs
            .iter()
            .map(|input| {
                let keys_and_attributes = input.request_items().unwrap().get("a").unwrap();
                assert_eq!(keys_and_attributes.consistent_read(), Some(true));
                assert_eq!(keys_and_attributes.projection_expression(), Some("#TestV"));
                keys_and_attributes.keys().len()
            })
            .collect();
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::empty(0)]
    #[case::over_max(common::MAX_READ_NUM + 1)]
    fn test_batch_get_item_inputs_rejected(#[case] size: usize) {
        let actual = batch_get_item_inputs("a", &keys(size), Default::default());
        assert!(matches!(actual, Err(Error::InvalidInput(_))));
    }
}
