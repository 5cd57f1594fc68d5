use crate::common::{self, selection};
use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::collections;

/// Separator for attribute path components.
const PATH_SEPARATOR: &str = ".";

fn lower_value<T: Serialize>(name: &str, value: T) -> Result<types::AttributeValue> {
    to_attribute_value(value).map_err(|error| {
        Error::Expression(format!("value for `{name}` cannot be serialized: {error}"))
    })
}

/// Map for ADD and DELETE operations.
#[derive(Clone, Debug, PartialEq)]
pub enum AddOrDeleteInputsMap<T> {
    /// Leaf operations - flat list of (attribute_name, value) pairs.
    Leaves(Vec<(String, T)>),
    /// Node operations - nested operations for hierarchical attribute paths.
    Node(IndexMap<String, AddOrDeleteInputsMap<T>>),
}

impl<T: Serialize> AddOrDeleteInputsMap<T> {
    fn lower(self) -> Result<AddOrDeleteInputsMap<types::AttributeValue>> {
        let map = match self {
            Self::Leaves(leaves) => AddOrDeleteInputsMap::Leaves(
                leaves
                    .into_iter()
                    .map(|(key, value)| {
                        let value = lower_value(&key, value)?;
                        Ok((key, value))
                    })
                    .collect::<Result<_>>()?,
            ),
            Self::Node(map) => AddOrDeleteInputsMap::Node(
                map.into_iter()
                    .map(|(key, value)| Ok((key, value.lower()?)))
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(map)
    }
}

impl AddOrDeleteInputsMap<types::AttributeValue> {
    fn collect_entries(
        self,
        keys: &[String],
        tag: &str,
        placeholders: &mut common::Placeholders,
        entries: &mut Vec<common::ExpressionInput>,
    ) -> Result<()> {
        match self {
            Self::Leaves(leaves) => {
                for (key, value) in leaves {
                    let (placeholder, new_keys) = placeholders.path(keys, &key)?;
                    let path = new_keys.join(PATH_SEPARATOR);
                    let value_placeholder = format!(":{tag}{}", placeholders.next_index());
                    entries.push(common::ExpressionInput {
                        expression: format!("{path} {value_placeholder}"),
                        expression_attribute_names: collections::HashMap::from([(
                            placeholder,
                            key,
                        )]),
                        expression_attribute_values: collections::HashMap::from([(
                            value_placeholder,
                            value,
                        )]),
                    });
                }
            }
            Self::Node(map) => {
                for (key, value) in map {
                    let (placeholder, new_keys) = placeholders.path(keys, &key)?;
                    let start = entries.len();
                    value.collect_entries(&new_keys, tag, placeholders, entries)?;
                    for entry in &mut entries[start..] {
                        common::insert_name(
                            &mut entry.expression_attribute_names,
                            placeholder.clone(),
                            key.clone(),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// SET operation for updating attributes.
///
/// ```rust
/// use dynamodb_service::common::update;
///
/// let assign = update::SetInput::Assign("value".to_string());
/// let increment = update::SetInput::Increment(10);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum SetInput<T> {
    /// Assign a new value to the attribute (replaces existing value).
    Assign(T),
    /// Increment a numeric attribute by the specified value.
    Increment(T),
    /// Decrement a numeric attribute by the specified value.
    Decrement(T),
    /// Append values to the end of a list attribute.
    ListAppend(T),
    /// Prepend values to the beginning of a list attribute.
    ListPrepend(T),
    /// Assign a value only if the attribute doesn't exist.
    IfNotExists(T),
}

impl<T> SetInput<T> {
    fn map<U>(self, f: impl FnOnce(T) -> Result<U>) -> Result<SetInput<U>> {
        let input = match self {
            Self::Assign(value) => SetInput::Assign(f(value)?),
            Self::Increment(value) => SetInput::Increment(f(value)?),
            Self::Decrement(value) => SetInput::Decrement(f(value)?),
            Self::ListAppend(value) => SetInput::ListAppend(f(value)?),
            Self::ListPrepend(value) => SetInput::ListPrepend(f(value)?),
            Self::IfNotExists(value) => SetInput::IfNotExists(f(value)?),
        };
        Ok(input)
    }

    fn get_set_expression(self, path: &str, value_placeholder: &str) -> (T, String) {
        match self {
            SetInput::Assign(value) => (value, format!("{path} = {value_placeholder}")),
            SetInput::Increment(value) => {
                (value, format!("{path} = {path} + {value_placeholder}"))
            }
            SetInput::Decrement(value) => {
                (value, format!("{path} = {path} - {value_placeholder}"))
            }
            SetInput::ListAppend(value) => (
                value,
                format!("{path} = list_append({path}, {value_placeholder})"),
            ),
            SetInput::ListPrepend(value) => (
                value,
                format!("{path} = list_append({value_placeholder}, {path})"),
            ),
            SetInput::IfNotExists(value) => (
                value,
                format!("{path} = if_not_exists({path}, {value_placeholder})"),
            ),
        }
    }
}

/// Map for SET operations.
#[derive(Clone, Debug, PartialEq)]
pub enum SetInputsMap<T> {
    /// Leaf operations - flat list of (attribute_name, set_operation) pairs.
    Leaves(Vec<(String, SetInput<T>)>),
    /// Node operations - nested operations for hierarchical attribute paths.
    Node(IndexMap<String, SetInputsMap<T>>),
}

impl<T: Serialize> SetInputsMap<T> {
    fn lower(self) -> Result<SetInputsMap<types::AttributeValue>> {
        let map = match self {
            Self::Leaves(leaves) => SetInputsMap::Leaves(
                leaves
                    .into_iter()
                    .map(|(key, input)| {
                        let input = input.map(|value| lower_value(&key, value))?;
                        Ok((key, input))
                    })
                    .collect::<Result<_>>()?,
            ),
            Self::Node(map) => SetInputsMap::Node(
                map.into_iter()
                    .map(|(key, value)| Ok((key, value.lower()?)))
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(map)
    }
}

impl SetInputsMap<types::AttributeValue> {
    fn collect_entries(
        self,
        keys: &[String],
        placeholders: &mut common::Placeholders,
        entries: &mut Vec<common::ExpressionInput>,
    ) -> Result<()> {
        match self {
            Self::Leaves(leaves) => {
                for (key, set_operation) in leaves {
                    let (placeholder, new_keys) = placeholders.path(keys, &key)?;
                    let path = new_keys.join(PATH_SEPARATOR);
                    let value_placeholder = format!(":set{}", placeholders.next_index());
                    let (value, expression) =
                        set_operation.get_set_expression(&path, &value_placeholder);
                    entries.push(common::ExpressionInput {
                        expression,
                        expression_attribute_names: collections::HashMap::from([(
                            placeholder,
                            key,
                        )]),
                        expression_attribute_values: collections::HashMap::from([(
                            value_placeholder,
                            value,
                        )]),
                    });
                }
            }
            Self::Node(map) => {
                for (key, value) in map {
                    let (placeholder, new_keys) = placeholders.path(keys, &key)?;
                    let start = entries.len();
                    value.collect_entries(&new_keys, placeholders, entries)?;
                    for entry in &mut entries[start..] {
                        common::insert_name(
                            &mut entry.expression_attribute_names,
                            placeholder.clone(),
                            key.clone(),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Update expression map.
///
/// ```rust
/// use dynamodb_service::common::update;
///
/// let expr = update::UpdateExpressionMap::Set(update::SetInputsMap::Leaves(vec![(
///     "TestV".to_string(),
///     update::SetInput::Assign("v2".to_string()),
/// )]));
/// let same = update::UpdateExpressionMap::set("TestV", "v2".to_string());
/// assert_eq!(expr, same);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateExpressionMap<T> {
    /// ADD operations - add values to numbers or sets.
    Add(AddOrDeleteInputsMap<T>),
    /// DELETE operations - delete values from sets.
    Delete(AddOrDeleteInputsMap<T>),
    /// REMOVE operations - remove attributes from items.
    Remove(selection::SelectionMap),
    /// SET operations - set or modify attribute values.
    Set(SetInputsMap<T>),
    /// Combined operations - multiple operation types in a single update expression.
    Combined(Vec<UpdateExpressionMap<T>>),
}

impl<T> UpdateExpressionMap<T> {
    /// Assign `value` to the top-level attribute `name`.
    pub fn set(name: impl Into<String>, value: T) -> Self {
        Self::Set(SetInputsMap::Leaves(vec![(
            name.into(),
            SetInput::Assign(value),
        )]))
    }

    /// Remove the named top-level attributes.
    pub fn remove<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Remove(selection::SelectionMap::attributes(names))
    }
}

impl<T: Serialize> UpdateExpressionMap<T> {
    pub(crate) fn lower(self) -> Result<UpdateExpressionMap<types::AttributeValue>> {
        let map = match self {
            Self::Add(map) => UpdateExpressionMap::Add(map.lower()?),
            Self::Delete(map) => UpdateExpressionMap::Delete(map.lower()?),
            Self::Remove(selection) => UpdateExpressionMap::Remove(selection),
            Self::Set(map) => UpdateExpressionMap::Set(map.lower()?),
            Self::Combined(maps) => UpdateExpressionMap::Combined(
                maps.into_iter()
                    .map(UpdateExpressionMap::lower)
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(map)
    }
}

/// Entries of one update expression, grouped by action keyword.
#[derive(Debug, Default)]
struct UpdateSections {
    set: Vec<common::ExpressionInput>,
    remove: Vec<common::ExpressionInput>,
    add: Vec<common::ExpressionInput>,
    delete: Vec<common::ExpressionInput>,
}

impl UpdateExpressionMap<types::AttributeValue> {
    fn collect_sections(
        self,
        sections: &mut UpdateSections,
        placeholders: &mut common::Placeholders,
    ) -> Result<()> {
        match self {
            Self::Add(map) => map.collect_entries(&[], "add", placeholders, &mut sections.add),
            Self::Delete(map) => {
                map.collect_entries(&[], "delete", placeholders, &mut sections.delete)
            }
            Self::Remove(selection) => {
                sections.remove.extend(selection.paths(placeholders)?);
                Ok(())
            }
            Self::Set(map) => map.collect_entries(&[], placeholders, &mut sections.set),
            Self::Combined(maps) => {
                for map in maps {
                    map.collect_sections(sections, placeholders)?;
                }
                Ok(())
            }
        }
    }
}

/// Render update maps into one expression holding at most one section per action.
pub(crate) fn render(
    updates: Vec<UpdateExpressionMap<types::AttributeValue>>,
    placeholders: &mut common::Placeholders,
) -> Result<Option<common::ExpressionInput>> {
    let mut sections = UpdateSections::default();
    for update in updates {
        update.collect_sections(&mut sections, placeholders)?;
    }
    let mut rendered = Vec::with_capacity(4);
    for (keyword, entries) in [
        ("SET", sections.set),
        ("REMOVE", sections.remove),
        ("ADD", sections.add),
        ("DELETE", sections.delete),
    ] {
        if entries.is_empty() {
            continue;
        }
        let mut section = common::ExpressionInput::merge(", ", entries)?;
        section.expression = format!("{keyword} {}", section.expression);
        rendered.push(section);
    }
    if rendered.is_empty() {
        return Ok(None);
    }
    common::ExpressionInput::merge(" ", rendered).map(Some)
}

impl<T: Serialize> TryFrom<UpdateExpressionMap<T>> for common::ExpressionInput {
    type Error = Error;

    fn try_from(update_expression_map: UpdateExpressionMap<T>) -> Result<Self> {
        let lowered = update_expression_map.lower()?;
        render(vec![lowered], &mut common::Placeholders::default())?
            .ok_or_else(|| Error::Expression("update expression is empty".to_string()))
    }
}
