use crate::backend::Backend;
use crate::codec::Codec;
use crate::common::key;
use crate::error::Result;
use crate::service::Service;
use crate::write;

use aws_sdk_dynamodb::{operation::delete_item::DeleteItemInput, types};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

fn delete_item_input(
    table_name: &str,
    key: &key::PrimaryKey,
    options: write::common::DeleteOptions,
    return_values: types::ReturnValue,
) -> Result<DeleteItemInput> {
    let expression = options.builder.build()?;
    let input = DeleteItemInput::builder()
        .table_name(table_name)
        .set_key(Some(key.into()))
        .set_condition_expression(expression.condition)
        .set_expression_attribute_names(expression.names)
        .set_expression_attribute_values(expression.values)
        .return_values(return_values)
        .build()?;
    Ok(input)
}

impl<B: Backend, C: Codec> Service<B, C> {
    /// Delete the item under `key`; deleting a missing item succeeds.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_service.delete", skip(self, token, options), err)
    )]
    pub async fn delete(
        &self,
        token: &CancellationToken,
        key: &key::PrimaryKey,
        options: write::common::DeleteOptions,
    ) -> Result<()> {
        let input = delete_item_input(self.table_name(), key, options, types::ReturnValue::None)?;
        self.dispatch(token, self.backend().delete_item(input))
            .await?;
        Ok(())
    }

    /// Delete the item under `key`, returning it; `None` when there was none.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_service.delete_out", skip(self, token, options), err)
    )]
    pub async fn delete_out<T: DeserializeOwned>(
        &self,
        token: &CancellationToken,
        key: &key::PrimaryKey,
        options: write::common::DeleteOptions,
    ) -> Result<Option<T>> {
        let input = delete_item_input(self.table_name(), key, options, types::ReturnValue::AllOld)?;
        let output = self
            .dispatch(token, self.backend().delete_item(input))
            .await?;
        output
            .attributes
            .filter(|attributes| !attributes.is_empty())
            .map(|attributes| self.codec().decode(attributes))
            .transpose()
    }

    /// Delete every item under `keys` in one atomic group; the options' precondition
    /// applies to each.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_service.delete_batch",
            skip(self, token, keys, options),
            fields(keys = keys.len()),
            err
        )
    )]
    pub async fn delete_batch(
        &self,
        token: &CancellationToken,
        keys: &[key::PrimaryKey],
        options: write::common::DeleteOptions,
    ) -> Result<()> {
        let transact = keys.iter().fold(
            write::transact::Transact::<()>::new(),
            |transact, key| {
                transact.delete(write::transact::TransactDelete {
                    key: key.clone(),
                    builder: options.builder.clone(),
                })
            },
        );
        self.transact(token, transact).await
    }
}
