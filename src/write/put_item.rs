use crate::backend::Backend;
use crate::codec::Codec;
use crate::common::{self, condition};
use crate::error::Result;
use crate::service::Service;
use crate::write;

use aws_sdk_dynamodb::{operation::put_item::PutItemInput, types};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

fn put_item_input(
    table_name: &str,
    item: common::Item,
    options: write::common::PutOptions,
    return_values: types::ReturnValue,
) -> Result<PutItemInput> {
    let expression = options.builder.build()?;
    let input = PutItemInput::builder()
        .table_name(table_name)
        .set_item(Some(item))
        .set_condition_expression(expression.condition)
        .set_expression_attribute_names(expression.names)
        .set_expression_attribute_values(expression.values)
        .return_values(return_values)
        .build()?;
    Ok(input)
}

impl<B: Backend, C: Codec> Service<B, C> {
    /// Create or replace the item described by `record`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_service.put", skip_all, err)
    )]
    pub async fn put<R: Serialize>(
        &self,
        token: &CancellationToken,
        record: &R,
        options: write::common::PutOptions,
    ) -> Result<()> {
        let item = self.codec().encode(record)?;
        let input = put_item_input(self.table_name(), item, options, types::ReturnValue::None)?;
        self.dispatch(token, self.backend().put_item(input)).await?;
        Ok(())
    }

    /// Create or replace the item described by `record`, returning the replaced item.
    ///
    /// `None` when no item existed under the key.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_service.put_out", skip_all, err)
    )]
    pub async fn put_out<R: Serialize, T: DeserializeOwned>(
        &self,
        token: &CancellationToken,
        record: &R,
        options: write::common::PutOptions,
    ) -> Result<Option<T>> {
        let item = self.codec().encode(record)?;
        let input = put_item_input(self.table_name(), item, options, types::ReturnValue::AllOld)?;
        let output = self.dispatch(token, self.backend().put_item(input)).await?;
        output
            .attributes
            .filter(|attributes| !attributes.is_empty())
            .map(|attributes| self.codec().decode(attributes))
            .transpose()
    }

    /// Create the item described by `record`; fails with
    /// [`Error::ConditionalCheckFailed`](crate::Error::ConditionalCheckFailed) if its key
    /// is taken.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_service.put_if_not_exist", skip_all, err)
    )]
    pub async fn put_if_not_exist<R: Serialize>(
        &self,
        token: &CancellationToken,
        record: &R,
        options: write::common::PutOptions,
    ) -> Result<()> {
        let options = options.condition(condition::item_not_exists());
        self.put(token, record, options).await
    }

    /// Write every record in one atomic group; the options' precondition applies to each.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_service.put_batch",
            skip_all,
            fields(records = records.len()),
            err
        )
    )]
    pub async fn put_batch<R: Serialize>(
        &self,
        token: &CancellationToken,
        records: &[R],
        options: write::common::PutOptions,
    ) -> Result<()> {
        let transact = records.iter().fold(write::transact::Transact::new(), |transact, record| {
            transact.put(write::transact::TransactPut {
                record,
                builder: options.builder.clone(),
            })
        });
        self.transact(token, transact).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aws_sdk_dynamodb::types::AttributeValue;
    use rstest::rstest;

    fn item() -> common::Item {
        common::Item::from([
            ("PK".to_string(), AttributeValue::S("Test#id1".to_string())),
            ("SK".to_string(), AttributeValue::S("Test".to_string())),
        ])
    }

    #[rstest]
    #[case::plain(
        write::common::PutOptions::default(),
        types::ReturnValue::None,
        None
    )]
    #[case::if_not_exist(
        write::common::PutOptions::default().condition(condition::item_not_exists()),
        types::ReturnValue::None,
        Some("attribute_not_exists(#PK)")
    )]
    #[case::out(
        write::common::PutOptions::default(),
        types::ReturnValue::AllOld,
        None
    )]
    fn test_put_item_input(
        #[case] options: write::common::PutOptions,
        #[case] return_values: types::ReturnValue,
        #[case] condition_expression: Option<&str>,
    ) {
        let actual = put_item_input("a", item(), options, return_values.clone()).unwrap();
        assert_eq!(actual.table_name(), Some("a"));
        assert_eq!(actual.item(), Some(&item()));
        assert_eq!(actual.return_values(), Some(&return_values));
        assert_eq!(actual.condition_expression(), condition_expression);
        assert_eq!(actual.expression_attribute_values(), None);
    }
}
