use crate::backend::Backend;
use crate::codec::Codec;
use crate::common::key;
use crate::error::{Error, Result};
use crate::read;
use crate::service::Service;

use aws_sdk_dynamodb::operation::get_item::GetItemInput;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

fn get_item_input(
    table_name: &str,
    key: &key::PrimaryKey,
    options: read::common::GetOptions,
) -> Result<GetItemInput> {
    let expression = options.builder.build()?;
    let input = GetItemInput::builder()
        .table_name(table_name)
        .set_key(Some(key.into()))
        .set_consistent_read(options.consistent_read)
        .set_projection_expression(expression.projection)
        .set_expression_attribute_names(expression.names)
        .build()?;
    Ok(input)
}

impl<B: Backend, C: Codec> Service<B, C> {
    /// Read the item stored under `key`.
    ///
    /// Fails with [`Error::ItemNotFound`] when there is none.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_service.get", skip(self, token, options), err)
    )]
    pub async fn get<T: DeserializeOwned>(
        &self,
        token: &CancellationToken,
        key: &key::PrimaryKey,
        options: read::common::GetOptions,
    ) -> Result<T> {
        let input = get_item_input(self.table_name(), key, options)?;
        let output = self
            .dispatch(token, self.backend().get_item(input))
            .await?;
        let item = output.item.ok_or(Error::ItemNotFound)?;
        self.codec().decode(item)
    }
}
