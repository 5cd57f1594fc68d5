use crate::common::{condition, expression};
use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use serde::Serialize;

/// Options of a put or delete.
///
/// ```rust
/// use dynamodb_service::{common::condition, write::common::WriteOptions};
///
/// let options = WriteOptions::default().condition(condition::item_exists());
/// ```
///
/// Only the precondition can be set; projections and updates have no way in:
///
/// ```compile_fail
/// use dynamodb_service::{common::selection, write::common::WriteOptions};
///
/// let mut options = WriteOptions::default();
/// options.builder = options
///     .builder
///     .with_projection(selection::SelectionMap::attributes(["TestV"]));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteOptions {
    /// Clauses compiled into the request; only the condition is used.
    pub(crate) builder: expression::ExpressionBuilder,
}

/// Options of a put.
pub type PutOptions = WriteOptions;

/// Options of a delete.
pub type DeleteOptions = WriteOptions;

impl WriteOptions {
    /// AND a precondition onto the write.
    pub fn condition<T: Serialize>(mut self, condition: condition::ConditionMap<T>) -> Self {
        self.builder = self.builder.with_condition(condition);
        self
    }
}

/// Options of an update.
///
/// ```rust
/// use aws_sdk_dynamodb::types::ReturnValue;
/// use dynamodb_service::{common::condition, write::common::UpdateOptions};
///
/// let options = UpdateOptions::default()
///     .condition(condition::item_exists())
///     .return_value(ReturnValue::AllNew);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateOptions {
    /// Clauses compiled into the request; the condition and update are used.
    pub(crate) builder: expression::ExpressionBuilder,
    /// Image returned by the update; the last call wins.
    pub return_value: Option<types::ReturnValue>,
}

impl UpdateOptions {
    /// AND a precondition onto the update.
    pub fn condition<T: Serialize>(mut self, condition: condition::ConditionMap<T>) -> Self {
        self.builder = self.builder.with_condition(condition);
        self
    }

    /// Select the returned image.
    pub fn return_value(mut self, return_value: types::ReturnValue) -> Self {
        self.return_value = Some(return_value);
        self
    }

    /// Return value of an update that decodes nothing.
    pub(crate) fn silent_return_value(&self) -> Result<types::ReturnValue> {
        match &self.return_value {
            None | Some(types::ReturnValue::None) => Ok(types::ReturnValue::None),
            Some(other) => Err(Error::ReturnValuePolicy(format!(
                "`{}` needs an update that returns its output",
                other.as_str()
            ))),
        }
    }

    /// Return value of an update that decodes the returned image.
    pub(crate) fn output_return_value(&self) -> Result<types::ReturnValue> {
        match &self.return_value {
            None => Ok(types::ReturnValue::UpdatedNew),
            Some(types::ReturnValue::None) => Err(Error::ReturnValuePolicy(
                "an update returning its output cannot return nothing".to_string(),
            )),
            Some(other) => Ok(other.clone()),
        }
    }
}

/// The compiled update clause, which updates cannot go without.
pub(crate) fn require_update(update: Option<String>) -> Result<String> {
    update.ok_or_else(|| Error::Expression("update clause is required".to_string()))
}
