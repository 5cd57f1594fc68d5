//! Common building blocks shared by read and write operations.
//!
//! This module provides the primary key, the clause types that describe conditions,
//! projections and updates, the [`expression::ExpressionBuilder`] that compiles them,
//! and the recommended [`schema::BaseSchema`] record shape.

/// Condition clauses for preconditions, filters and key conditions.
pub mod condition;

/// Builder that compiles clauses into a backend-ready expression.
pub mod expression;

/// The fixed two-attribute primary key.
pub mod key;

/// Recommended embeddable record shape.
pub mod schema;

/// Attribute selection for projection expressions.
pub mod selection;

/// Update clauses (SET, REMOVE, ADD, DELETE).
pub mod update;

use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use std::collections;

/// One record, as a mapping from attribute name to tagged value.
pub type Item = collections::HashMap<String, types::AttributeValue>;

/// Maximum number of items a batch read accepts, and the soft cap of a paged query.
pub const MAX_READ_NUM: usize = 500;

/// Maximum number of writes in one atomic write group.
pub const MAX_WRITE_NUM: usize = 25;

/// Render an attribute name as a placeholder identifier.
///
/// Characters outside `[A-Za-z0-9_]` become `_`.
pub(crate) fn sanitize(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::Expression(
            "attribute names must not be empty".to_string(),
        ));
    }
    let identifier = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    Ok(identifier)
}

/// Placeholder allocation shared by every clause of one compilation.
///
/// Each distinct attribute name is bound to exactly one `#placeholder`. A name whose
/// sanitized form is already bound to a different name gets a numeric suffix. Value
/// placeholders draw their index from one running counter.
#[derive(Debug, Default)]
pub(crate) struct Placeholders {
    index: usize,
    by_name: collections::HashMap<String, String>,
    taken: collections::HashSet<String>,
}

impl Placeholders {
    /// The next value placeholder index.
    pub(crate) fn next_index(&mut self) -> usize {
        let index = self.index;
        self.index += 1;
        index
    }

    /// The name placeholder bound to `name`, allocating one on first use.
    pub(crate) fn name(&mut self, name: &str) -> Result<String> {
        if let Some(placeholder) = self.by_name.get(name) {
            return Ok(placeholder.clone());
        }
        let base = format!("#{}", sanitize(name)?);
        let mut placeholder = base.clone();
        let mut suffix = 0;
        while self.taken.contains(&placeholder) {
            suffix += 1;
            placeholder = format!("{base}_{suffix}");
        }
        self.taken.insert(placeholder.clone());
        self.by_name.insert(name.to_string(), placeholder.clone());
        Ok(placeholder)
    }

    /// Extend the document path `keys` with the placeholder of `name`.
    pub(crate) fn path(&mut self, keys: &[String], name: &str) -> Result<(String, Vec<String>)> {
        let placeholder = self.name(name)?;
        let mut new_keys = Vec::with_capacity(keys.len() + 1);
        new_keys.extend_from_slice(keys);
        new_keys.push(placeholder.clone());
        Ok((placeholder, new_keys))
    }
}

fn get_expression(left: String, operator: &str, right: String) -> String {
    if left.is_empty() {
        right
    } else if right.is_empty() {
        left
    } else {
        format!("{left}{operator}{right}")
    }
}

/// Insert `placeholder -> name`, rejecting a placeholder already bound to another name.
pub(crate) fn insert_name(
    names: &mut collections::HashMap<String, String>,
    placeholder: String,
    name: String,
) -> Result<()> {
    match names.get(&placeholder) {
        Some(existing) if *existing != name => Err(Error::Expression(format!(
            "attribute names `{existing}` and `{name}` both map to placeholder `{placeholder}`"
        ))),
        Some(_) => Ok(()),
        None => {
            names.insert(placeholder, name);
            Ok(())
        }
    }
}

/// A rendered clause together with the placeholders it references.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionInput {
    pub(crate) expression: String,
    pub(crate) expression_attribute_names: collections::HashMap<String, String>,
    pub(crate) expression_attribute_values: Item,
}

impl ExpressionInput {
    pub(crate) fn merge(operator: &str, items: Vec<Self>) -> Result<Self> {
        let mut operation = Self::default();
        for item in items {
            operation.extend_placeholders(
                item.expression_attribute_names,
                item.expression_attribute_values,
            )?;
            operation.expression = get_expression(operation.expression, operator, item.expression);
        }
        Ok(operation)
    }

    pub(crate) fn extend_placeholders(
        &mut self,
        names: collections::HashMap<String, String>,
        values: Item,
    ) -> Result<()> {
        for (placeholder, name) in names {
            insert_name(&mut self.expression_attribute_names, placeholder, name)?;
        }
        self.expression_attribute_values.extend(values);
        Ok(())
    }
}
