use crate::backend::Backend;
use crate::codec::Codec;
use crate::common::{key, update};
use crate::error::Result;
use crate::service::Service;
use crate::write;

use aws_sdk_dynamodb::{operation::update_item::UpdateItemInput, types};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

fn update_item_input<U: Serialize>(
    table_name: &str,
    key: &key::PrimaryKey,
    update: update::UpdateExpressionMap<U>,
    options: write::common::UpdateOptions,
    return_values: types::ReturnValue,
) -> Result<UpdateItemInput> {
    let expression = options.builder.with_update(update).build()?;
    let update_expression = write::common::require_update(expression.update)?;
    let input = UpdateItemInput::builder()
        .table_name(table_name)
        .set_key(Some(key.into()))
        .update_expression(update_expression)
        .set_condition_expression(expression.condition)
        .set_expression_attribute_names(expression.names)
        .set_expression_attribute_values(expression.values)
        .return_values(return_values)
        .build()?;
    Ok(input)
}

impl<B: Backend, C: Codec> Service<B, C> {
    /// Apply `update` to the item under `key`.
    ///
    /// Fails with [`Error::ReturnValuePolicy`](crate::Error::ReturnValuePolicy) when the
    /// options ask for a returned image; use [`Self::update_out`] for that.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_service.update",
            skip(self, token, update, options),
            err
        )
    )]
    pub async fn update<U: Serialize>(
        &self,
        token: &CancellationToken,
        key: &key::PrimaryKey,
        update: update::UpdateExpressionMap<U>,
        options: write::common::UpdateOptions,
    ) -> Result<()> {
        let return_values = options.silent_return_value()?;
        let input = update_item_input(self.table_name(), key, update, options, return_values)?;
        self.dispatch(token, self.backend().update_item(input))
            .await?;
        Ok(())
    }

    /// Apply `update` to the item under `key` and decode the returned image.
    ///
    /// Returns the updated attributes unless the options select another image; an
    /// explicit [`types::ReturnValue::None`] fails with
    /// [`Error::ReturnValuePolicy`](crate::Error::ReturnValuePolicy).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_service.update_out",
            skip(self, token, update, options),
            err
        )
    )]
    pub async fn update_out<U: Serialize, T: DeserializeOwned>(
        &self,
        token: &CancellationToken,
        key: &key::PrimaryKey,
        update: update::UpdateExpressionMap<U>,
        options: write::common::UpdateOptions,
    ) -> Result<T> {
        let return_values = options.output_return_value()?;
        let input = update_item_input(self.table_name(), key, update, options, return_values)?;
        let output = self
            .dispatch(token, self.backend().update_item(input))
            .await?;
        self.codec().decode(output.attributes.unwrap_or_default())
    }

    /// Apply the same `update` to every item under `keys` in one atomic group.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_service.update_batch",
            skip(self, token, keys, update, options),
            fields(keys = keys.len()),
            err
        )
    )]
    pub async fn update_batch<U: Serialize>(
        &self,
        token: &CancellationToken,
        keys: &[key::PrimaryKey],
        update: update::UpdateExpressionMap<U>,
        options: write::common::UpdateOptions,
    ) -> Result<()> {
        options.silent_return_value()?;
        let builder = options.builder.with_update(update);
        let transact = keys.iter().fold(
            write::transact::Transact::<()>::new(),
            |transact, key| {
                transact.update(write::transact::TransactUpdate {
                    key: key.clone(),
                    builder: builder.clone(),
                })
            },
        );
        self.transact(token, transact).await
    }
}
