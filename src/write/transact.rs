use crate::backend::Backend;
use crate::codec::Codec;
use crate::common::{self, condition, expression, key, update};
use crate::error::{Error, Result};
use crate::service::Service;

use aws_sdk_dynamodb::{operation::transact_write_items::TransactWriteItemsInput, types};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Update of one item inside a write group.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactUpdate {
    /// Item to update.
    pub key: key::PrimaryKey,
    /// Update actions plus an optional precondition.
    pub(crate) builder: expression::ExpressionBuilder,
}

impl TransactUpdate {
    /// Apply `update` to the item under `key`.
    pub fn new<U: Serialize>(
        key: key::PrimaryKey,
        update: update::UpdateExpressionMap<U>,
    ) -> Self {
        Self {
            key,
            builder: expression::ExpressionBuilder::new().with_update(update),
        }
    }

    /// AND a precondition onto this member.
    pub fn condition<T: Serialize>(mut self, condition: condition::ConditionMap<T>) -> Self {
        self.builder = self.builder.with_condition(condition);
        self
    }
}

/// Put of one record inside a write group.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactPut<R> {
    /// Record to write.
    pub record: R,
    /// Optional precondition.
    pub(crate) builder: expression::ExpressionBuilder,
}

impl<R> TransactPut<R> {
    /// Write `record`.
    pub fn new(record: R) -> Self {
        Self {
            record,
            builder: expression::ExpressionBuilder::new(),
        }
    }

    /// AND a precondition onto this member.
    pub fn condition<T: Serialize>(mut self, condition: condition::ConditionMap<T>) -> Self {
        self.builder = self.builder.with_condition(condition);
        self
    }
}

/// Delete of one item inside a write group.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactDelete {
    /// Item to delete.
    pub key: key::PrimaryKey,
    /// Optional precondition.
    pub(crate) builder: expression::ExpressionBuilder,
}

impl TransactDelete {
    /// Delete the item under `key`.
    pub fn new(key: key::PrimaryKey) -> Self {
        Self {
            key,
            builder: expression::ExpressionBuilder::new(),
        }
    }

    /// AND a precondition onto this member.
    pub fn condition<T: Serialize>(mut self, condition: condition::ConditionMap<T>) -> Self {
        self.builder = self.builder.with_condition(condition);
        self
    }
}

/// Precondition on an item the group does not write.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactConditionCheck {
    /// Item to check.
    pub key: key::PrimaryKey,
    /// The precondition; required.
    pub(crate) builder: expression::ExpressionBuilder,
}

impl TransactConditionCheck {
    /// Require `condition` to hold on the item under `key`.
    pub fn new<T: Serialize>(
        key: key::PrimaryKey,
        condition: condition::ConditionMap<T>,
    ) -> Self {
        Self {
            key,
            builder: expression::ExpressionBuilder::new().with_condition(condition),
        }
    }
}

/// A group of writes committed atomically: all apply, or none does.
///
/// Members are submitted updates first, then puts, deletes and condition checks, each
/// in insertion order. The group holds between 1 and [`common::MAX_WRITE_NUM`] members.
///
/// ```rust
/// use dynamodb_service::common::{condition, key::PrimaryKey, update::UpdateExpressionMap};
/// use dynamodb_service::write::transact::{Transact, TransactDelete, TransactUpdate};
/// use serde_json::{Value, json};
///
/// let transact: Transact<Value> = Transact::new()
///     .update(TransactUpdate::new(
///         PrimaryKey::new("Test#id1", "Test"),
///         UpdateExpressionMap::set("TestV", "v2"),
///     ))
///     .put(json!({"PK": "Test#id2", "SK": "Test"}).into())
///     .delete(
///         TransactDelete::new(PrimaryKey::new("Test#id3", "Test"))
///             .condition(condition::item_exists()),
///     );
/// assert_eq!(transact.len(), 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Transact<R> {
    /// Updates, submitted first.
    pub updates: Vec<TransactUpdate>,
    /// Puts, submitted after the updates.
    pub puts: Vec<TransactPut<R>>,
    /// Deletes, submitted after the puts.
    pub deletes: Vec<TransactDelete>,
    /// Condition checks, submitted last.
    pub condition_checks: Vec<TransactConditionCheck>,
    /// Idempotency token of the request.
    pub client_request_token: Option<String>,
}

impl<R> Default for Transact<R> {
    fn default() -> Self {
        Self {
            updates: Vec::new(),
            puts: Vec::new(),
            deletes: Vec::new(),
            condition_checks: Vec::new(),
            client_request_token: None,
        }
    }
}

impl<R> From<R> for TransactPut<R> {
    fn from(record: R) -> Self {
        Self::new(record)
    }
}

impl<R> Transact<R> {
    /// An empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an update.
    pub fn update(mut self, update: TransactUpdate) -> Self {
        self.updates.push(update);
        self
    }

    /// Add a put.
    pub fn put(mut self, put: TransactPut<R>) -> Self {
        self.puts.push(put);
        self
    }

    /// Add a delete.
    pub fn delete(mut self, delete: TransactDelete) -> Self {
        self.deletes.push(delete);
        self
    }

    /// Add a condition check.
    pub fn condition_check(mut self, condition_check: TransactConditionCheck) -> Self {
        self.condition_checks.push(condition_check);
        self
    }

    /// Set the idempotency token; the last call wins.
    pub fn client_request_token(mut self, client_request_token: impl Into<String>) -> Self {
        self.client_request_token = Some(client_request_token.into());
        self
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.updates.len() + self.puts.len() + self.deletes.len() + self.condition_checks.len()
    }

    /// Whether the group has no member.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn update_item(table_name: &str, update: TransactUpdate) -> Result<types::TransactWriteItem> {
    let expression = update.builder.build()?;
    let update_expression = crate::write::common::require_update(expression.update)?;
    let update = types::Update::builder()
        .table_name(table_name)
        .set_key(Some(update.key.into()))
        .update_expression(update_expression)
        .set_condition_expression(expression.condition)
        .set_expression_attribute_names(expression.names)
        .set_expression_attribute_values(expression.values)
        .build()?;
    Ok(types::TransactWriteItem::builder().update(update).build())
}

fn put_item<R: Serialize, C: Codec>(
    table_name: &str,
    codec: &C,
    put: TransactPut<R>,
) -> Result<types::TransactWriteItem> {
    let expression = put.builder.build()?;
    let put = types::Put::builder()
        .table_name(table_name)
        .set_item(Some(codec.encode(&put.record)?))
        .set_condition_expression(expression.condition)
        .set_expression_attribute_names(expression.names)
        .set_expression_attribute_values(expression.values)
        .build()?;
    Ok(types::TransactWriteItem::builder().put(put).build())
}

fn delete_item(table_name: &str, delete: TransactDelete) -> Result<types::TransactWriteItem> {
    let expression = delete.builder.build()?;
    let delete = types::Delete::builder()
        .table_name(table_name)
        .set_key(Some(delete.key.into()))
        .set_condition_expression(expression.condition)
        .set_expression_attribute_names(expression.names)
        .set_expression_attribute_values(expression.values)
        .build()?;
    Ok(types::TransactWriteItem::builder().delete(delete).build())
}

fn condition_check_item(
    table_name: &str,
    condition_check: TransactConditionCheck,
) -> Result<types::TransactWriteItem> {
    let expression = condition_check.builder.build()?;
    let condition_expression = expression
        .condition
        .ok_or_else(|| Error::Expression("condition check needs a condition".to_string()))?;
    let condition_check = types::ConditionCheck::builder()
        .table_name(table_name)
        .set_key(Some(condition_check.key.into()))
        .condition_expression(condition_expression)
        .set_expression_attribute_names(expression.names)
        .set_expression_attribute_values(expression.values)
        .build()?;
    Ok(types::TransactWriteItem::builder()
        .condition_check(condition_check)
        .build())
}

/// Assemble the request of a write group.
///
/// Every member is compiled before anything is returned, so one failing member fails
/// the whole group.
pub(crate) fn transact_write_items_input<R: Serialize, C: Codec>(
    table_name: &str,
    codec: &C,
    transact: Transact<R>,
) -> Result<TransactWriteItemsInput> {
    let size = transact.len();
    if size == 0 || size > common::MAX_WRITE_NUM {
        return Err(Error::InvalidInput(format!(
            "a write group takes 1 to {} members, got {size}",
            common::MAX_WRITE_NUM
        )));
    }
    let mut transact_items = Vec::with_capacity(size);
    for update in transact.updates {
        transact_items.push(update_item(table_name, update)?);
    }
    for put in transact.puts {
        transact_items.push(put_item(table_name, codec, put)?);
    }
    for delete in transact.deletes {
        transact_items.push(delete_item(table_name, delete)?);
    }
    for condition_check in transact.condition_checks {
        transact_items.push(condition_check_item(table_name, condition_check)?);
    }
    let input = TransactWriteItemsInput::builder()
        .set_transact_items(Some(transact_items))
        .set_client_request_token(transact.client_request_token)
        .build()?;
    Ok(input)
}

impl<B: Backend, C: Codec> Service<B, C> {
    /// Commit a write group atomically.
    ///
    /// A precondition failing on any member fails the group with
    /// [`Error::ConditionalCheckFailed`] and no member takes effect.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_service.transact",
            skip(self, token, transact),
            fields(members = transact.len()),
            err
        )
    )]
    pub async fn transact<R: Serialize>(
        &self,
        token: &CancellationToken,
        transact: Transact<R>,
    ) -> Result<()> {
        let input = transact_write_items_input(self.table_name(), self.codec(), transact)?;
        self.dispatch(token, self.backend().transact_write_items(input))
            .await?;
        Ok(())
    }
}
