use crate::common::{self, key};
use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::{collections, ops};

/// Logical operator for combining conditions.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - all conditions must be true.
    And,
    /// Logical OR - at least one condition must be true.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Condition types for expressions.
///
/// ```rust
/// use dynamodb_service::common::condition;
///
/// let eq = condition::Condition::Equals("value".to_string());
/// let gt = condition::Condition::GreaterThan(100);
/// let null: condition::Condition<String> = condition::Condition::Null;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition<T> {
    /// Checks if an attribute begins with a specified prefix (string types only).
    BeginsWith(String),
    /// Checks if an attribute value is between two values (inclusive).
    Between(T, T),
    /// Checks if an attribute contains a specified value.
    Contains(T),
    /// Checks if an attribute value equals a specified value.
    Equals(T),
    /// Checks if an attribute value is greater than a specified value.
    GreaterThan(T),
    /// Checks if an attribute value is greater than or equal to a specified value.
    GreaterThanOrEqual(T),
    /// Checks if an attribute value is in a list of specified values.
    In(Vec<T>),
    /// Checks if an attribute value is less than a specified value.
    LessThan(T),
    /// Checks if an attribute value is less than or equal to a specified value.
    LessThanOrEqual(T),
    /// Checks if an attribute does not contain a specified value.
    NotContains(T),
    /// Checks if an attribute value does not equal a specified value.
    NotEqual(T),
    /// Checks if an attribute exists (is not null).
    NotNull,
    /// Checks if an attribute does not exist (is null).
    Null,
}

impl<T: Serialize> Condition<T> {
    fn lower(self) -> serde_dynamo::Result<Condition<types::AttributeValue>> {
        let condition = match self {
            Self::BeginsWith(prefix) => Condition::BeginsWith(prefix),
            Self::Between(low, high) => {
                Condition::Between(to_attribute_value(low)?, to_attribute_value(high)?)
            }
            Self::Contains(value) => Condition::Contains(to_attribute_value(value)?),
            Self::Equals(value) => Condition::Equals(to_attribute_value(value)?),
            Self::GreaterThan(value) => Condition::GreaterThan(to_attribute_value(value)?),
            Self::GreaterThanOrEqual(value) => {
                Condition::GreaterThanOrEqual(to_attribute_value(value)?)
            }
            Self::In(values) => Condition::In(
                values
                    .into_iter()
                    .map(to_attribute_value)
                    .collect::<serde_dynamo::Result<_>>()?,
            ),
            Self::LessThan(value) => Condition::LessThan(to_attribute_value(value)?),
            Self::LessThanOrEqual(value) => Condition::LessThanOrEqual(to_attribute_value(value)?),
            Self::NotContains(value) => Condition::NotContains(to_attribute_value(value)?),
            Self::NotEqual(value) => Condition::NotEqual(to_attribute_value(value)?),
            Self::NotNull => Condition::NotNull,
            Self::Null => Condition::Null,
        };
        Ok(condition)
    }
}

impl<T> Condition<T> {
    /// Whether the operator is allowed in a key condition.
    fn is_key_operator(&self) -> bool {
        matches!(
            self,
            Self::BeginsWith(_)
                | Self::Between(..)
                | Self::Equals(_)
                | Self::GreaterThan(_)
                | Self::GreaterThanOrEqual(_)
                | Self::LessThan(_)
                | Self::LessThanOrEqual(_)
        )
    }
}

struct ValueBinder<'a> {
    key: &'a str,
    placeholders: &'a mut common::Placeholders,
    values: common::Item,
}

impl ValueBinder<'_> {
    fn bind(&mut self, tag: &str, value: types::AttributeValue) -> String {
        let placeholder = format!(":{}_{tag}{}", self.key, self.placeholders.next_index());
        self.values.insert(placeholder.clone(), value);
        placeholder
    }
}

impl Condition<types::AttributeValue> {
    fn get_expression(
        self,
        key: &str,
        key_placeholder: &str,
        placeholders: &mut common::Placeholders,
    ) -> Result<(String, common::Item)> {
        let mut binder = ValueBinder {
            key,
            placeholders,
            values: collections::HashMap::new(),
        };
        let expression = match self {
            Self::Equals(value) => format!("{key_placeholder} = {}", binder.bind("eq", value)),
            Self::GreaterThan(value) => format!("{key_placeholder} > {}", binder.bind("gt", value)),
            Self::GreaterThanOrEqual(value) => {
                format!("{key_placeholder} >= {}", binder.bind("gte", value))
            }
            Self::LessThan(value) => format!("{key_placeholder} < {}", binder.bind("lt", value)),
            Self::LessThanOrEqual(value) => {
                format!("{key_placeholder} <= {}", binder.bind("lte", value))
            }
            Self::NotEqual(value) => format!("{key_placeholder} <> {}", binder.bind("ne", value)),
            Self::BeginsWith(prefix) => {
                let placeholder = binder.bind("begins_with", types::AttributeValue::S(prefix));
                format!("begins_with({key_placeholder}, {placeholder})")
            }
            Self::Between(value1, value2) => {
                let placeholder_1 = binder.bind("between", value1);
                let placeholder_2 = binder.bind("between", value2);
                format!("{key_placeholder} BETWEEN {placeholder_1} AND {placeholder_2}")
            }
            Self::Contains(value) => {
                format!("contains({key_placeholder}, {})", binder.bind("contains", value))
            }
            Self::NotContains(value) => format!(
                "NOT contains({key_placeholder}, {})",
                binder.bind("not_contains", value)
            ),
            Self::In(values) => {
                if values.is_empty() {
                    return Err(Error::Expression(format!(
                        "IN on `{key}` needs at least one value"
                    )));
                }
                let placeholders = values
                    .into_iter()
                    .map(|value| binder.bind("in", value))
                    .collect::<Vec<_>>();
                format!("{key_placeholder} IN ({})", placeholders.join(", "))
            }
            Self::NotNull => format!("attribute_exists({key_placeholder})"),
            Self::Null => format!("attribute_not_exists({key_placeholder})"),
        };
        Ok((expression, binder.values))
    }
}

/// Condition applied to an attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition<T> {
    /// The condition to apply to the attribute.
    pub condition: Condition<T>,
    /// The name of the attribute to apply the condition to.
    pub name: String,
}

impl<T: Serialize> KeyCondition<T> {
    fn lower(self) -> Result<KeyCondition<types::AttributeValue>> {
        let condition = self.condition.lower().map_err(|error| {
            Error::Expression(format!(
                "value for `{}` cannot be serialized: {error}",
                self.name
            ))
        })?;
        Ok(KeyCondition {
            condition,
            name: self.name,
        })
    }
}

impl KeyCondition<types::AttributeValue> {
    fn get_expression_operation(
        self,
        keys: &[String],
        placeholders: &mut common::Placeholders,
    ) -> Result<common::ExpressionInput> {
        let (placeholder, new_keys) = placeholders.path(keys, &self.name)?;
        let key_placeholder = new_keys.join(".");
        let identifier = common::sanitize(&self.name)?;
        let (expression, expression_attribute_values) =
            self.condition
                .get_expression(&identifier, &key_placeholder, placeholders)?;
        let expression_attribute_names = collections::HashMap::from([(placeholder, self.name)]);
        Ok(common::ExpressionInput {
            expression,
            expression_attribute_names,
            expression_attribute_values,
        })
    }
}

/// Map of conditions with logical operators.
///
/// ```rust
/// use dynamodb_service::common::condition;
///
/// let map = condition::ConditionMap::Leaves(
///     condition::LogicalOperator::And,
///     vec![
///         condition::KeyCondition {
///             name: "status".to_string(),
///             condition: condition::Condition::Equals("active".to_string()),
///         },
///     ],
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionMap<T> {
    /// Leaf conditions - flat list of conditions combined with the logical operator.
    Leaves(LogicalOperator, Vec<KeyCondition<T>>),
    /// Node conditions - nested conditions for hierarchical attribute paths.
    Node(LogicalOperator, IndexMap<String, ConditionMap<T>>),
}

impl<T> ConditionMap<T> {
    /// A single condition on a top-level attribute.
    pub fn attribute(name: impl Into<String>, condition: Condition<T>) -> Self {
        Self::Leaves(
            LogicalOperator::And,
            vec![KeyCondition {
                condition,
                name: name.into(),
            }],
        )
    }
}

impl<T: Serialize> ConditionMap<T> {
    pub(crate) fn lower(self) -> Result<ConditionMap<types::AttributeValue>> {
        let map = match self {
            Self::Leaves(operator, leaves) => ConditionMap::Leaves(
                operator,
                leaves
                    .into_iter()
                    .map(KeyCondition::lower)
                    .collect::<Result<_>>()?,
            ),
            Self::Node(operator, map) => ConditionMap::Node(
                operator,
                map.into_iter()
                    .map(|(key, value)| Ok((key, value.lower()?)))
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(map)
    }
}

impl<T: Serialize> TryFrom<ConditionMap<T>> for common::ExpressionInput {
    type Error = Error;

    fn try_from(condition_map: ConditionMap<T>) -> Result<Self> {
        condition_map
            .lower()?
            .render(&mut common::Placeholders::default())
    }
}

impl ConditionMap<types::AttributeValue> {
    pub(crate) fn render(
        self,
        placeholders: &mut common::Placeholders,
    ) -> Result<common::ExpressionInput> {
        self.get_expression_operation_recursive(&[], placeholders, false)
    }

    fn is_composite(&self, is_nested: bool) -> bool {
        match self {
            Self::Leaves(_, leaves) => is_nested && leaves.len() > 1,
            Self::Node(_, map) => {
                let has_multiple_keys = map.len() > 1;
                let child_is_nested = is_nested || has_multiple_keys;
                for value in map.values() {
                    if value.is_composite(child_is_nested) {
                        // the child will be wrapped individually
                        return false;
                    }
                }
                is_nested && has_multiple_keys
            }
        }
    }

    fn get_expression_operation_recursive(
        self,
        keys: &[String],
        placeholders: &mut common::Placeholders,
        mut is_nested: bool,
    ) -> Result<common::ExpressionInput> {
        let mut operations = Vec::new();
        let is_composite = self.is_composite(is_nested);
        let operator = match self {
            Self::Leaves(operator, key_conditions) => {
                for key_condition in key_conditions {
                    let operation = key_condition.get_expression_operation(keys, placeholders)?;
                    operations.push(operation);
                }
                operator
            }
            Self::Node(operator, map) => {
                operations.reserve(map.len());
                is_nested = is_nested || map.len() > 1;
                for (key, value) in map {
                    let (placeholder, new_keys) = placeholders.path(keys, &key)?;
                    let mut condition_operation = value.get_expression_operation_recursive(
                        &new_keys,
                        placeholders,
                        is_nested,
                    )?;
                    common::insert_name(
                        &mut condition_operation.expression_attribute_names,
                        placeholder,
                        key,
                    )?;
                    operations.push(condition_operation);
                }
                operator
            }
        };
        let mut operation = common::ExpressionInput::merge(&operator, operations)?;
        if is_composite {
            operation.expression = format!("({})", operation.expression);
        }
        Ok(operation)
    }
}

/// Precondition satisfied only when no item with the written key exists yet.
pub fn item_not_exists() -> ConditionMap<String> {
    ConditionMap::attribute(key::PARTITION_KEY, Condition::Null)
}

/// Precondition satisfied only when an item with the written key already exists.
pub fn item_exists() -> ConditionMap<String> {
    ConditionMap::attribute(key::SORT_KEY, Condition::NotNull)
}

/// Key condition of a query: an equality on the partition key plus an optional
/// sort key condition.
///
/// ```rust
/// use dynamodb_service::common::condition;
///
/// let key_conditions = condition::KeyConditions::partition("Test#id1")
///     .sort(condition::Condition::<String>::BeginsWith("Test".to_string()));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyConditions {
    conditions: Vec<KeyCondition<types::AttributeValue>>,
    error: Option<String>,
}

impl KeyConditions {
    /// Match the table partition key attribute ([`key::PARTITION_KEY`]).
    pub fn partition<T: Serialize>(value: T) -> Self {
        Self::default().and(key::PARTITION_KEY, Condition::Equals(value))
    }

    /// Add a condition on the table sort key attribute ([`key::SORT_KEY`]).
    pub fn sort<T: Serialize>(self, condition: Condition<T>) -> Self {
        self.and(key::SORT_KEY, condition)
    }

    /// Add a condition on an arbitrary key attribute, e.g. the keys of a secondary index.
    pub fn and<T: Serialize>(mut self, name: impl Into<String>, condition: Condition<T>) -> Self {
        let name = name.into();
        if self.error.is_some() {
            return self;
        }
        if !condition.is_key_operator() {
            self.error = Some(format!(
                "key condition on `{name}` must be =, <, <=, >, >=, BETWEEN or begins_with"
            ));
            return self;
        }
        match (KeyCondition { condition, name }).lower() {
            Ok(key_condition) => self.conditions.push(key_condition),
            Err(error) => self.error = Some(error.to_string()),
        }
        self
    }

    /// Whether no condition has been added.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.error.is_none()
    }

    pub(crate) fn extend(&mut self, other: Self) {
        if self.error.is_none() {
            self.error = other.error;
        }
        self.conditions.extend(other.conditions);
    }

    pub(crate) fn render(
        self,
        placeholders: &mut common::Placeholders,
    ) -> Result<Option<common::ExpressionInput>> {
        if let Some(error) = self.error {
            return Err(Error::Expression(error));
        }
        if self.conditions.is_empty() {
            return Ok(None);
        }
        let mut operations = Vec::with_capacity(self.conditions.len());
        for condition in self.conditions {
            operations.push(condition.get_expression_operation(&[], placeholders)?);
        }
        let operation = common::ExpressionInput::merge(&LogicalOperator::And, operations)?;
        Ok(Some(operation))
    }
}
