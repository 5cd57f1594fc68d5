use crate::common::{self, condition, selection, update};
use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use std::collections;

/// Accumulates clauses and compiles them into one backend-ready [`Expression`].
///
/// Clauses of the same kind combine: conditions and filters are AND-joined,
/// projections are concatenated, update actions are grouped by keyword. Serialization
/// failures are recorded when a clause is added and reported by [`Self::build`].
///
/// ```rust
/// use dynamodb_service::common::{condition, expression, update};
///
/// let expression = expression::ExpressionBuilder::new()
///     .with_condition(condition::item_exists())
///     .with_update(update::UpdateExpressionMap::set("TestV", "v2"))
///     .build()
///     .unwrap();
/// assert_eq!(expression.condition.as_deref(), Some("attribute_exists(#SK)"));
/// assert_eq!(expression.update.as_deref(), Some("SET #TestV = :set0"));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionBuilder {
    key_conditions: condition::KeyConditions,
    filters: Vec<condition::ConditionMap<types::AttributeValue>>,
    conditions: Vec<condition::ConditionMap<types::AttributeValue>>,
    projections: Vec<selection::SelectionMap>,
    updates: Vec<update::UpdateExpressionMap<types::AttributeValue>>,
    error: Option<String>,
}

/// Compiled clauses plus the placeholder tables they share.
///
/// Clauses that were never added are `None`, and so are empty placeholder tables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expression {
    /// Key condition of a query.
    pub key_condition: Option<String>,
    /// Filter applied to query results.
    pub filter: Option<String>,
    /// Projection of returned attributes.
    pub projection: Option<String>,
    /// Update actions.
    pub update: Option<String>,
    /// Precondition of a write.
    pub condition: Option<String>,
    /// `#placeholder -> attribute name`.
    pub names: Option<collections::HashMap<String, String>>,
    /// `:placeholder -> value`.
    pub values: Option<common::Item>,
}

impl ExpressionBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_error(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error.to_string());
        }
    }

    /// Add key conditions; only meaningful for queries.
    pub fn with_key_conditions(mut self, key_conditions: condition::KeyConditions) -> Self {
        self.key_conditions.extend(key_conditions);
        self
    }

    /// AND a filter onto the result filter.
    pub fn with_filter<T: Serialize>(mut self, filter: condition::ConditionMap<T>) -> Self {
        match filter.lower() {
            Ok(filter) => self.filters.push(filter),
            Err(error) => self.record_error(error),
        }
        self
    }

    /// AND a precondition onto the write condition.
    pub fn with_condition<T: Serialize>(mut self, condition: condition::ConditionMap<T>) -> Self {
        match condition.lower() {
            Ok(condition) => self.conditions.push(condition),
            Err(error) => self.record_error(error),
        }
        self
    }

    /// Add attributes to the projection; repeated paths are kept once.
    pub fn with_projection(mut self, projection: selection::SelectionMap) -> Self {
        self.projections.push(projection);
        self
    }

    /// Add update actions.
    pub fn with_update<T: Serialize>(mut self, update: update::UpdateExpressionMap<T>) -> Self {
        match update.lower() {
            Ok(update) => self.updates.push(update),
            Err(error) => self.record_error(error),
        }
        self
    }

    /// Fold every clause of `other` into this builder.
    pub fn merge(mut self, other: Self) -> Self {
        self.key_conditions.extend(other.key_conditions);
        self.filters.extend(other.filters);
        self.conditions.extend(other.conditions);
        self.projections.extend(other.projections);
        self.updates.extend(other.updates);
        if let Some(error) = other.error {
            self.record_error(Error::Expression(error));
        }
        self
    }

    pub(crate) fn without_projection(mut self) -> Self {
        self.projections.clear();
        self
    }

    /// Whether an update clause has been added.
    pub fn has_update(&self) -> bool {
        !self.updates.is_empty()
    }

    /// Compile the accumulated clauses.
    ///
    /// Value placeholders are numbered by one counter shared across every clause, and
    /// every distinct attribute name gets its own name placeholder, so distinct clauses
    /// never bind the same placeholder.
    pub fn build(&self) -> Result<Expression> {
        let builder = self.clone();
        if let Some(error) = builder.error {
            return Err(Error::Expression(error));
        }
        let mut placeholders = common::Placeholders::default();
        let mut merged = common::ExpressionInput::default();
        let mut take = |operation: Option<common::ExpressionInput>| -> Result<Option<String>> {
            match operation {
                Some(operation) => {
                    merged.extend_placeholders(
                        operation.expression_attribute_names,
                        operation.expression_attribute_values,
                    )?;
                    Ok(Some(operation.expression).filter(|expression| !expression.is_empty()))
                }
                None => Ok(None),
            }
        };
        let key_condition = take(builder.key_conditions.render(&mut placeholders)?)?;
        let filter = take(render_conjunction(builder.filters, &mut placeholders)?)?;
        let condition = take(render_conjunction(builder.conditions, &mut placeholders)?)?;
        let update = take(update::render(builder.updates, &mut placeholders)?)?;
        let projection = take(render_projection(builder.projections, &mut placeholders)?)?;
        Ok(Expression {
            key_condition,
            filter,
            projection,
            update,
            condition,
            names: Some(merged.expression_attribute_names).filter(|names| !names.is_empty()),
            values: Some(merged.expression_attribute_values).filter(|values| !values.is_empty()),
        })
    }
}

fn render_conjunction(
    clauses: Vec<condition::ConditionMap<types::AttributeValue>>,
    placeholders: &mut common::Placeholders,
) -> Result<Option<common::ExpressionInput>> {
    let wrap = clauses.len() > 1;
    let mut operations = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let mut operation = clause.render(placeholders)?;
        if operation.expression.is_empty() {
            continue;
        }
        if wrap {
            operation.expression = format!("({})", operation.expression);
        }
        operations.push(operation);
    }
    if operations.is_empty() {
        return Ok(None);
    }
    common::ExpressionInput::merge(&condition::LogicalOperator::And, operations).map(Some)
}

fn render_projection(
    projections: Vec<selection::SelectionMap>,
    placeholders: &mut common::Placeholders,
) -> Result<Option<common::ExpressionInput>> {
    let mut paths = Vec::new();
    for projection in projections {
        paths.extend(projection.paths(placeholders)?);
    }
    if paths.is_empty() {
        return Ok(None);
    }
    selection::merge_paths(paths).map(Some)
}
