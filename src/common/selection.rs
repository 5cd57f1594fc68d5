use crate::common;
use crate::error::{Error, Result};

use indexmap::IndexMap;
use std::collections;

/// Map for selecting attributes in projection expressions.
///
/// ```rust
/// use dynamodb_service::common::selection;
///
/// let selection = selection::SelectionMap::Leaves(vec![
///     "PK".to_string(),
///     "TestV".to_string(),
/// ]);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectionMap {
    /// Leaf selection - a flat list of attribute names to select.
    Leaves(Vec<String>),
    /// Node selection - nested selection for hierarchical attribute paths.
    Node(IndexMap<String, SelectionMap>),
}

impl SelectionMap {
    /// Select top-level attributes by name.
    pub fn attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Leaves(names.into_iter().map(Into::into).collect())
    }

    /// One rendered document path per selected attribute, in declaration order.
    pub(crate) fn paths(
        self,
        placeholders: &mut common::Placeholders,
    ) -> Result<Vec<common::ExpressionInput>> {
        let mut paths = Vec::new();
        self.collect_paths(&[], placeholders, &mut paths)?;
        Ok(paths)
    }

    fn collect_paths(
        self,
        keys: &[String],
        placeholders: &mut common::Placeholders,
        paths: &mut Vec<common::ExpressionInput>,
    ) -> Result<()> {
        match self {
            Self::Leaves(leaves) => {
                for leaf in leaves {
                    let (placeholder, new_keys) = placeholders.path(keys, &leaf)?;
                    paths.push(common::ExpressionInput {
                        expression: new_keys.join("."),
                        expression_attribute_names: collections::HashMap::from([(
                            placeholder,
                            leaf,
                        )]),
                        ..Default::default()
                    });
                }
            }
            Self::Node(map) => {
                for (key, value) in map {
                    let (placeholder, new_keys) = placeholders.path(keys, &key)?;
                    let start = paths.len();
                    value.collect_paths(&new_keys, placeholders, paths)?;
                    for path in &mut paths[start..] {
                        common::insert_name(
                            &mut path.expression_attribute_names,
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

/// Merge projection paths into one comma-separated clause, keeping the first
/// occurrence of each path.
pub(crate) fn merge_paths(paths: Vec<common::ExpressionInput>) -> Result<common::ExpressionInput> {
    let mut merged = common::ExpressionInput::default();
    let mut seen = collections::HashSet::new();
    for path in paths {
        merged.extend_placeholders(
            path.expression_attribute_names,
            path.expression_attribute_values,
        )?;
        if seen.insert(path.expression.clone()) {
            merged.expression = common::get_expression(merged.expression, ", ", path.expression);
        }
    }
    Ok(merged)
}

impl TryFrom<SelectionMap> for common::ExpressionInput {
    type Error = Error;

    fn try_from(selection_map: SelectionMap) -> Result<Self> {
        merge_paths(selection_map.paths(&mut common::Placeholders::default())?)
    }
}
